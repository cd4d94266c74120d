//! Core type definitions used across the connector workspace.

pub mod id;
pub mod layer;
pub mod transform;

pub use id::*;
pub use layer::LayerPath;
pub use transform::Transform;
