//! Root object builder.
//!
//! Runs one send: unpacks the selection into atomic objects, instance
//! placements and proxy tables, converts every object (reusing cached
//! references where possible), places the results into a collection tree
//! mirroring the host layers, and attaches the proxy tables to the root.
//!
//! A failing object becomes an error result and the build carries on.
//! Cancellation is checked before each object starts; a cancelled build
//! returns its partial results and writes nothing to the cache.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::{FutureExt, StreamExt, stream};
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use connector_core::config::PipelineConfig;
use connector_core::error::ConversionError;
use connector_core::graph::{GraphNode, InstanceProxy, ObjectReference};
use connector_core::traits::{ConversionCache, HostObject, HostObjectSource, ObjectConverter};
use connector_core::types::ApplicationId;

use crate::dedup::{InstanceDeduplicator, UnpackedSelection};
use crate::error::BuildError;
use crate::metrics::BuildMetrics;
use crate::models::{
    BuildOutcome, BuildProgress, BuildRequest, BuildState, ConversionResult, ProgressReporter,
    RootObjectBuild,
};
use crate::proxies::ProxyAggregator;
use crate::tree::CollectionTree;

/// `result_type` of a freshly converted object.
pub const RESULT_TYPE_OBJECT: &str = "DataObject";
/// `result_type` of an object reused from the cache.
pub const RESULT_TYPE_REFERENCE: &str = "ObjectReference";
/// `result_type` of an instance placement.
pub const RESULT_TYPE_INSTANCE: &str = "InstanceProxy";

/// What happened to one object during the converting phase.
enum ObjectOutcome {
    Placed {
        node: GraphNode,
        result: ConversionResult,
        new_reference: Option<ObjectReference>,
    },
    Failed(ConversionResult),
    Skipped,
}

/// Assembles root collections from host selections.
pub struct RootObjectBuilder<S, C> {
    source: Arc<S>,
    converter: Arc<C>,
    cache: Arc<dyn ConversionCache>,
    config: PipelineConfig,
    metrics: Arc<BuildMetrics>,
}

impl<S, C> RootObjectBuilder<S, C>
where
    S: HostObjectSource,
    C: ObjectConverter<S::Handle>,
{
    /// Create a builder around a host, its converter and a document cache.
    pub fn new(
        source: Arc<S>,
        converter: Arc<C>,
        cache: Arc<dyn ConversionCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            converter,
            cache,
            config,
            metrics: Arc::new(BuildMetrics::new()),
        }
    }

    /// Share a metrics collector with the caller.
    pub fn with_metrics(mut self, metrics: Arc<BuildMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Metrics collected by this builder.
    pub fn metrics(&self) -> &Arc<BuildMetrics> {
        &self.metrics
    }

    /// Pipeline settings in effect.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Conversions allowed in flight at once.
    fn effective_concurrency(&self) -> usize {
        if self.converter.is_reentrant() {
            self.config.concurrency.max(1)
        } else {
            1
        }
    }

    /// Build a root collection from `selection`.
    ///
    /// Returns [`BuildError::EmptySelection`] for an empty selection and
    /// [`BuildError::TotalFailure`] when no object converted. Per-object
    /// failures are reported in the results, never thrown.
    #[instrument(
        skip_all,
        fields(
            project_id = %request.project_id,
            unit_of_work_id = %request.unit_of_work_id,
            objects = selection.len(),
            build_id
        )
    )]
    pub async fn build(
        &self,
        request: &BuildRequest,
        selection: &[S::Handle],
        cancel: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<BuildOutcome, BuildError> {
        request.validate()?;
        if selection.is_empty() {
            return Err(BuildError::EmptySelection);
        }

        let build_id = Uuid::now_v7();
        tracing::Span::current().record("build_id", build_id.to_string());

        let started_at = Utc::now();
        let timer = Instant::now();
        let total = selection.len();
        self.metrics.record_started();

        // Phase 1: unpack instances and collect proxies
        progress.report(BuildProgress {
            state: BuildState::Unpacking,
            current: 0,
            total,
        });
        let UnpackedSelection {
            atomic_objects,
            instance_proxies,
            definition_proxies,
        } = InstanceDeduplicator::unpack_selection(selection);
        let mut aggregator = self.collect_proxies(selection);
        aggregator.add_instance_definitions(definition_proxies);

        // Phase 2: convert atomic objects, place instances, in input order
        let concurrency = self.effective_concurrency();
        debug!(
            concurrency,
            atomic = atomic_objects.len(),
            instances = instance_proxies.len(),
            "Converting selection"
        );

        // Yields one outcome per atomic object, in the order they appear in
        // the selection.
        let mut conversions = stream::iter(atomic_objects)
            .map(|handle| self.convert_object(request, handle, cancel))
            .buffered(concurrency);

        let mut tree = CollectionTree::new(&self.config.root_name);
        let mut results = Vec::with_capacity(total);
        let mut placed_ids = HashSet::with_capacity(total);
        let mut new_references = HashMap::new();
        let mut cache_hits = 0;
        let mut cancelled = false;

        for handle in selection {
            let outcome = if handle.instance_geometry().is_some() {
                self.place_instance(handle, &instance_proxies, cancel)
            } else {
                match conversions.next().await {
                    Some(outcome) => outcome,
                    None => break,
                }
            };

            match outcome {
                ObjectOutcome::Skipped => {
                    cancelled = true;
                    break;
                }
                ObjectOutcome::Placed {
                    node,
                    result,
                    new_reference,
                } => {
                    let application_id = handle.application_id();
                    if matches!(result, ConversionResult::Success { from_cache: true, .. }) {
                        cache_hits += 1;
                    }
                    if let Some(reference) = new_reference {
                        new_references.insert(application_id.clone(), reference);
                    }
                    tree.insert(&self.source.layer_of(handle), node);
                    placed_ids.insert(application_id);
                    results.push(result);
                }
                ObjectOutcome::Failed(result) => results.push(result),
            }

            progress.report(BuildProgress {
                state: BuildState::Converting,
                current: results.len(),
                total,
            });
        }
        drop(conversions);

        if cancelled {
            info!(processed = results.len(), total, "Build cancelled");
            self.metrics.record_cancelled();
            progress.report(BuildProgress {
                state: BuildState::Cancelled,
                current: results.len(),
                total,
            });
            return Ok(BuildOutcome::Cancelled { results });
        }

        if placed_ids.is_empty() {
            warn!(failed = results.len(), "Every object failed to convert");
            self.metrics.record_failed();
            progress.report(BuildProgress {
                state: BuildState::Failed,
                current: results.len(),
                total,
            });
            return Err(BuildError::TotalFailure {
                failed: results.len(),
                results,
            });
        }

        // Phase 3: attach proxies and write the cache
        progress.report(BuildProgress {
            state: BuildState::Finalizing,
            current: results.len(),
            total,
        });

        if self.config.prune_orphan_proxies {
            aggregator.retain_objects(&placed_ids);
        }

        debug!(collections = tree.collection_count(), "Materializing collection tree");
        let mut root = tree.into_root();
        for (key, table) in aggregator.into_tables() {
            root.attach_proxies(key, table);
        }

        if !new_references.is_empty() {
            debug!(entries = new_references.len(), "Populating conversion cache");
            self.cache.store(&request.project_id, new_references).await;
        }

        let build = RootObjectBuild {
            build_id,
            root,
            results,
            cache_hits,
            started_at,
            finished_at: Utc::now(),
        };

        self.metrics.record_completed(timer.elapsed());
        info!(
            succeeded = build.success_count(),
            failed = build.error_count(),
            cache_hits,
            duration_ms = timer.elapsed().as_millis() as u64,
            "Build completed"
        );
        progress.report(BuildProgress {
            state: BuildState::Completed,
            current: total,
            total,
        });

        Ok(BuildOutcome::Completed(build))
    }

    /// Gather groups, materials, colors, property sets and connector-specific
    /// proxies for every selected object.
    fn collect_proxies(&self, selection: &[S::Handle]) -> ProxyAggregator {
        let mut aggregator = ProxyAggregator::new();

        for handle in selection {
            let application_id = handle.application_id();

            for group in self.source.groups_of(handle) {
                aggregator.add_group(&application_id, group);
            }
            if let Some(material) = self.source.render_material_of(handle) {
                aggregator.add_render_material(&application_id, material);
            }
            if let Some(color) = self.source.color_of(handle) {
                aggregator.add_color(&application_id, color);
            }
            for property_set in self.source.property_sets_of(handle) {
                aggregator.add_property_set(&application_id, property_set);
            }
            for (key, value) in self.source.custom_proxies_of(handle) {
                aggregator.add_custom(&key, &application_id, value);
            }
        }

        aggregator
    }

    /// Place an instance through the proxy produced while unpacking.
    fn place_instance(
        &self,
        handle: &S::Handle,
        instance_proxies: &IndexMap<ApplicationId, InstanceProxy>,
        cancel: &CancellationToken,
    ) -> ObjectOutcome {
        if cancel.is_cancelled() {
            return ObjectOutcome::Skipped;
        }

        let application_id = handle.application_id();
        let source_type = handle.source_type().to_string();

        let Some(proxy) = instance_proxies.get(&application_id) else {
            warn!(%application_id, "Instance has no placement; skipping");
            self.metrics.record_object_failed();
            return ObjectOutcome::Failed(ConversionResult::Error {
                application_id,
                source_type,
                error: ConversionError::failed("instance placement missing"),
            });
        };

        self.metrics.record_instance();
        ObjectOutcome::Placed {
            result: ConversionResult::Success {
                application_id,
                source_type,
                result_id: proxy.definition_id.to_string(),
                result_type: RESULT_TYPE_INSTANCE.to_string(),
                from_cache: false,
            },
            node: GraphNode::Instance(proxy.clone()),
            new_reference: None,
        }
    }

    /// Produce the node for one atomic object: a cached reference or a
    /// fresh conversion.
    async fn convert_object(
        &self,
        request: &BuildRequest,
        handle: &S::Handle,
        cancel: &CancellationToken,
    ) -> ObjectOutcome {
        if cancel.is_cancelled() {
            return ObjectOutcome::Skipped;
        }

        let application_id = handle.application_id();
        let source_type = handle.source_type().to_string();

        if let Some(reference) = self
            .cache
            .try_get(&request.project_id, &application_id)
            .await
        {
            debug!(%application_id, referenced_id = %reference.referenced_id, "Cache hit");
            self.metrics.record_cache_hit();
            return ObjectOutcome::Placed {
                result: ConversionResult::Success {
                    application_id,
                    source_type,
                    result_id: reference.referenced_id.clone(),
                    result_type: RESULT_TYPE_REFERENCE.to_string(),
                    from_cache: true,
                },
                node: GraphNode::Reference(reference),
                new_reference: None,
            };
        }
        self.metrics.record_cache_miss();

        let converted = AssertUnwindSafe(self.converter.convert(handle))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(ConversionError::failed(panic_message(panic.as_ref()))));

        match converted {
            Ok(object) => {
                let object = object.with_application_id(application_id.clone());
                let reference = object.to_reference();
                self.metrics.record_converted();
                ObjectOutcome::Placed {
                    result: ConversionResult::Success {
                        application_id,
                        source_type,
                        result_id: reference.referenced_id.clone(),
                        result_type: RESULT_TYPE_OBJECT.to_string(),
                        from_cache: false,
                    },
                    node: GraphNode::Object(object),
                    new_reference: Some(reference),
                }
            }
            Err(error) => {
                warn!(%application_id, %source_type, %error, "Object failed to convert");
                self.metrics.record_object_failed();
                ObjectOutcome::Failed(ConversionResult::Error {
                    application_id,
                    source_type,
                    error,
                })
            }
        }
    }
}

/// Best-effort text of a converter panic.
fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("converter panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("converter panicked: {message}")
    } else {
        "converter panicked".to_string()
    }
}
