//! # connector-cache
//!
//! Conversion cache implementations for the host connectors. Supports two
//! modes:
//!
//! - **memory**: In-process cache using [moka](https://crates.io/crates/moka)
//! - **null**: Never stores anything, for hosts whose object ids are not
//!   stable enough to key a cache by
//!
//! The provider is selected at runtime based on configuration.

#[cfg(feature = "memory")]
pub mod memory;
pub mod null;
pub mod provider;

pub use null::NullConversionCache;
pub use provider::CacheManager;
