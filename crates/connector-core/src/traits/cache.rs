//! Conversion cache trait.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::graph::ObjectReference;
use crate::types::{ApplicationId, ProjectId};

/// Content-addressable store of previous conversion results.
///
/// Keyed by `(ProjectId, ApplicationId)`. The cache holds no versioning
/// information: an entry is valid only while the source object and the
/// conversion settings are unchanged, and callers enforce that by evicting.
/// Every operation is total; a miss is not an error.
///
/// A connector holds one cache per open host document.
#[async_trait]
pub trait ConversionCache: Send + Sync + std::fmt::Debug + 'static {
    /// Insert or overwrite references for a project. Last write wins.
    async fn store(&self, project_id: &ProjectId, entries: HashMap<ApplicationId, ObjectReference>);

    /// The cached reference for an object, if any.
    async fn try_get(
        &self,
        project_id: &ProjectId,
        application_id: &ApplicationId,
    ) -> Option<ObjectReference>;

    /// Remove entries for the given ids across all projects.
    async fn evict(&self, application_ids: &[ApplicationId]);

    /// Remove every entry.
    async fn clear(&self);

    /// Approximate number of entries held.
    fn entry_count(&self) -> u64;
}
