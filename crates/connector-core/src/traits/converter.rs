//! Host object converter trait.

use async_trait::async_trait;

use crate::error::ConversionError;
use crate::graph::DataObject;

/// Converts one host-native object into one graph object.
///
/// Implementations hold the per-host geometry routines. They must be
/// idempotent for the same input. The pipeline tags the returned object
/// with the host id, so converters need not.
#[async_trait]
pub trait ObjectConverter<H: Sync>: Send + Sync {
    /// Convert a single host object.
    async fn convert(&self, object: &H) -> Result<DataObject, ConversionError>;

    /// Whether `convert` may run concurrently for different objects.
    ///
    /// Most host object models forbid concurrent access, so this defaults
    /// to `false` and the builder converts strictly one object at a time.
    fn is_reentrant(&self) -> bool {
        false
    }
}
