//! Capability traits defined in `connector-core` and implemented by the
//! cache crate and by each host integration.

pub mod cache;
pub mod converter;
pub mod host;

pub use cache::ConversionCache;
pub use converter::ObjectConverter;
pub use host::{HostObject, HostObjectSource, InstanceGeometry};
