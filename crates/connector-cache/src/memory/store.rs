//! In-memory conversion cache implementation using the moka crate.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;

use connector_core::config::cache::MemoryCacheConfig;
use connector_core::graph::ObjectReference;
use connector_core::traits::cache::ConversionCache;
use connector_core::types::{ApplicationId, ProjectId};

/// Composite cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    project_id: ProjectId,
    application_id: ApplicationId,
}

impl CacheKey {
    fn new(project_id: &ProjectId, application_id: &ApplicationId) -> Self {
        Self {
            project_id: project_id.clone(),
            application_id: application_id.clone(),
        }
    }
}

/// In-memory conversion cache using moka.
///
/// Capacity-bounded; an entry pushed out by capacity is simply a miss on
/// the next send and gets reconverted.
#[derive(Debug, Clone)]
pub struct MemoryConversionCache {
    /// The underlying moka cache.
    cache: Cache<CacheKey, ObjectReference>,
}

impl MemoryConversionCache {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let mut builder =
            Cache::<CacheKey, ObjectReference>::builder().max_capacity(config.max_capacity);
        if let Some(seconds) = config.time_to_idle_seconds {
            builder = builder.time_to_idle(Duration::from_secs(seconds));
        }

        Self {
            cache: builder.build(),
        }
    }

    /// Apply pending housekeeping so `entry_count` is exact.
    pub async fn sync(&self) {
        self.cache.run_pending_tasks().await;
    }
}

impl Default for MemoryConversionCache {
    fn default() -> Self {
        Self::new(&MemoryCacheConfig::default())
    }
}

#[async_trait]
impl ConversionCache for MemoryConversionCache {
    async fn store(&self, project_id: &ProjectId, entries: HashMap<ApplicationId, ObjectReference>) {
        let count = entries.len();
        for (application_id, reference) in entries {
            self.cache
                .insert(CacheKey::new(project_id, &application_id), reference)
                .await;
        }
        debug!(%project_id, count, "Stored object references");
    }

    async fn try_get(
        &self,
        project_id: &ProjectId,
        application_id: &ApplicationId,
    ) -> Option<ObjectReference> {
        self.cache
            .get(&CacheKey::new(project_id, application_id))
            .await
    }

    async fn evict(&self, application_ids: &[ApplicationId]) {
        if application_ids.is_empty() {
            return;
        }
        let targets: HashSet<&ApplicationId> = application_ids.iter().collect();

        // Moka can't look up by partial key, so collect matches first.
        let keys_to_remove: Vec<CacheKey> = self
            .cache
            .iter()
            .filter(|(key, _)| targets.contains(&key.application_id))
            .map(|(key, _)| CacheKey::clone(&key))
            .collect();

        let count = keys_to_remove.len();
        for key in keys_to_remove {
            self.cache.invalidate(&key).await;
        }

        debug!(requested = application_ids.len(), count, "Evicted object references");
    }

    async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        debug!("Cleared conversion cache");
    }

    fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}
