//! In-memory conversion cache.

pub mod store;

pub use store::MemoryConversionCache;
