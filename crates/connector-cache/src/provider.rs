//! Cache manager that dispatches to the configured provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use connector_core::config::cache::CacheConfig;
use connector_core::error::AppError;
use connector_core::graph::ObjectReference;
use connector_core::result::AppResult;
use connector_core::traits::cache::ConversionCache;
use connector_core::types::{ApplicationId, ProjectId};

/// Cache manager that wraps the configured conversion cache.
///
/// The provider is selected at construction time based on configuration.
/// One manager is created per open host document.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// The inner cache provider.
    inner: Arc<dyn ConversionCache>,
}

impl CacheManager {
    /// Create a new cache manager from configuration.
    pub fn new(config: &CacheConfig) -> AppResult<Self> {
        let inner: Arc<dyn ConversionCache> = match config.provider.as_str() {
            #[cfg(feature = "memory")]
            "memory" => {
                info!(
                    max_capacity = config.memory.max_capacity,
                    "Initializing in-memory conversion cache"
                );
                Arc::new(crate::memory::MemoryConversionCache::new(&config.memory))
            }
            "null" => {
                info!("Conversion cache disabled; every object will be converted");
                Arc::new(crate::null::NullConversionCache)
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown cache provider: '{other}'. Supported: memory, null"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a cache manager from an existing provider (for testing).
    pub fn from_provider(provider: Arc<dyn ConversionCache>) -> Self {
        Self { inner: provider }
    }

    /// Get a reference to the inner provider.
    pub fn provider(&self) -> &dyn ConversionCache {
        self.inner.as_ref()
    }
}

#[async_trait]
impl ConversionCache for CacheManager {
    async fn store(&self, project_id: &ProjectId, entries: HashMap<ApplicationId, ObjectReference>) {
        self.inner.store(project_id, entries).await
    }

    async fn try_get(
        &self,
        project_id: &ProjectId,
        application_id: &ApplicationId,
    ) -> Option<ObjectReference> {
        self.inner.try_get(project_id, application_id).await
    }

    async fn evict(&self, application_ids: &[ApplicationId]) {
        self.inner.evict(application_ids).await
    }

    async fn clear(&self) {
        self.inner.clear().await
    }

    fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}
