//! Conversion cache that never stores anything.

use std::collections::HashMap;

use async_trait::async_trait;

use connector_core::graph::ObjectReference;
use connector_core::traits::cache::ConversionCache;
use connector_core::types::{ApplicationId, ProjectId};

/// A cache that always misses.
///
/// Used by connectors whose object ids are volatile between sends, so the
/// builder can keep calling the cache uniformly.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullConversionCache;

#[async_trait]
impl ConversionCache for NullConversionCache {
    async fn store(&self, _project_id: &ProjectId, _entries: HashMap<ApplicationId, ObjectReference>) {}

    async fn try_get(
        &self,
        _project_id: &ProjectId,
        _application_id: &ApplicationId,
    ) -> Option<ObjectReference> {
        None
    }

    async fn evict(&self, _application_ids: &[ApplicationId]) {}

    async fn clear(&self) {}

    fn entry_count(&self) -> u64 {
        0
    }
}
