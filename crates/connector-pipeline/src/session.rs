//! Document session.
//!
//! Owns everything scoped to one open host document: the conversion cache,
//! the invalidation memo, the builder and its metrics. Dropping or closing
//! the session tears the cache down with it.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};
use validator::Validate;

use connector_cache::CacheManager;
use connector_core::AppResult;
use connector_core::config::{CacheConfig, PipelineConfig};
use connector_core::traits::{ConversionCache, HostObject, HostObjectSource, ObjectConverter};
use connector_core::types::{ApplicationId, UnitOfWorkId};

use crate::builder::RootObjectBuilder;
use crate::error::BuildError;
use crate::invalidation::CacheInvalidationPolicy;
use crate::metrics::{BuildMetrics, MetricsSnapshot};
use crate::models::{BuildOutcome, BuildRequest, ProgressReporter};

/// Send orchestration for one open host document.
pub struct DocumentSession<S, C> {
    source: Arc<S>,
    builder: RootObjectBuilder<S, C>,
    cache: Arc<dyn ConversionCache>,
    policy: CacheInvalidationPolicy,
    metrics: Arc<BuildMetrics>,
}

impl<S, C> DocumentSession<S, C>
where
    S: HostObjectSource,
    C: ObjectConverter<S::Handle>,
{
    /// Open a session, creating the document's cache from configuration.
    pub fn new(
        source: Arc<S>,
        converter: Arc<C>,
        cache_config: &CacheConfig,
        pipeline: PipelineConfig,
    ) -> AppResult<Self> {
        pipeline.validate()?;
        let cache: Arc<dyn ConversionCache> = Arc::new(CacheManager::new(cache_config)?);
        Ok(Self::with_cache(source, converter, cache, pipeline))
    }

    /// Open a session around an existing cache.
    pub fn with_cache(
        source: Arc<S>,
        converter: Arc<C>,
        cache: Arc<dyn ConversionCache>,
        pipeline: PipelineConfig,
    ) -> Self {
        let metrics = Arc::new(BuildMetrics::new());
        let builder = RootObjectBuilder::new(source.clone(), converter, cache.clone(), pipeline)
            .with_metrics(metrics.clone());

        Self {
            source,
            builder,
            policy: CacheInvalidationPolicy::new(cache.clone()),
            cache,
            metrics,
        }
    }

    /// Send the host's current selection.
    ///
    /// Tracked settings are compared with the previous send of the same unit
    /// of work first; any change evicts the selection so it is reconverted.
    #[instrument(
        skip_all,
        fields(project_id = %request.project_id, unit_of_work_id = %request.unit_of_work_id)
    )]
    pub async fn send(
        &self,
        request: &BuildRequest,
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<BuildOutcome, BuildError> {
        request.validate()?;
        if cancel.is_cancelled() {
            info!("Send cancelled before enumeration");
            return Ok(BuildOutcome::Cancelled {
                results: Vec::new(),
            });
        }

        let selection = self.source.enumerate_selection()?;
        let ids: Vec<ApplicationId> = selection.iter().map(HostObject::application_id).collect();

        let changed = self.policy.apply(request, &ids).await;
        if !changed.is_empty() {
            info!(
                settings = ?changed,
                evicted = ids.len(),
                "Conversion settings changed since last send"
            );
            self.metrics.record_invalidated(ids.len() as u64);
        }

        self.builder
            .build(request, &selection, cancel, progress)
            .await
    }

    /// Drop every cached conversion for this document.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("Conversion cache cleared");
    }

    /// Forget the settings recorded for a removed model card.
    pub fn forget_unit_of_work(&self, unit_of_work_id: &UnitOfWorkId) {
        self.policy.forget(unit_of_work_id);
    }

    /// Current metrics.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// The document's cache handle.
    pub fn cache(&self) -> &Arc<dyn ConversionCache> {
        &self.cache
    }

    /// The builder used for sends.
    pub fn builder(&self) -> &RootObjectBuilder<S, C> {
        &self.builder
    }

    /// Close the document: clear the cache and the settings memo.
    pub async fn close(self) {
        self.cache.clear().await;
        self.policy.clear();
        info!(
            builds = self.metrics.snapshot().builds_started,
            "Document session closed"
        );
    }
}
