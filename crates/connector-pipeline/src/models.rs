//! Domain models: build requests, per-object results, outcomes, progress.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use connector_core::error::ConversionError;
use connector_core::graph::Collection;
use connector_core::types::{ApplicationId, ProjectId, SettingId, UnitOfWorkId};

use crate::error::BuildError;

// ---------------------------------------------------------------------------
// BuildRequest
// ---------------------------------------------------------------------------

/// Inputs to one send, besides the selection itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    /// Project the send targets; half of the cache key.
    pub project_id: ProjectId,
    /// Model card the send belongs to; settings are tracked per card.
    pub unit_of_work_id: UnitOfWorkId,
    /// Settings that affect conversion output, by id.
    #[serde(default)]
    pub settings: BTreeMap<SettingId, serde_json::Value>,
}

impl BuildRequest {
    /// Create a request with no settings.
    pub fn new(project_id: impl Into<ProjectId>, unit_of_work_id: impl Into<UnitOfWorkId>) -> Self {
        Self {
            project_id: project_id.into(),
            unit_of_work_id: unit_of_work_id.into(),
            settings: BTreeMap::new(),
        }
    }

    /// Add or replace a setting.
    pub fn with_setting(
        mut self,
        setting_id: impl Into<SettingId>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.settings.insert(setting_id.into(), value.into());
        self
    }

    /// Check the request contract: ids must be present and no setting may be null.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.project_id.is_empty() {
            return Err(BuildError::invalid_request("project id is empty"));
        }
        if self.unit_of_work_id.is_empty() {
            return Err(BuildError::invalid_request("unit of work id is empty"));
        }
        if let Some((id, _)) = self.settings.iter().find(|(_, v)| v.is_null()) {
            return Err(BuildError::invalid_request(format!(
                "setting '{id}' has no value"
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ConversionResult
// ---------------------------------------------------------------------------

/// Outcome of converting one host object. Created once per object per
/// build and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ConversionResult {
    /// The object is in the tree.
    #[serde(rename_all = "camelCase")]
    Success {
        /// Host id of the object.
        application_id: ApplicationId,
        /// Host type name.
        source_type: String,
        /// Id of the node placed in the tree: a content id, a cached
        /// reference id, or an instance definition id.
        result_id: String,
        /// Kind of node placed in the tree.
        result_type: String,
        /// Whether the node was reused from the conversion cache.
        from_cache: bool,
    },
    /// The object failed and is absent from the tree.
    #[serde(rename_all = "camelCase")]
    Error {
        /// Host id of the object.
        application_id: ApplicationId,
        /// Host type name.
        source_type: String,
        /// Why conversion failed.
        error: ConversionError,
    },
}

impl ConversionResult {
    /// Host id of the object.
    pub fn application_id(&self) -> &ApplicationId {
        match self {
            Self::Success { application_id, .. } | Self::Error { application_id, .. } => {
                application_id
            }
        }
    }

    /// Host type name of the object.
    pub fn source_type(&self) -> &str {
        match self {
            Self::Success { source_type, .. } | Self::Error { source_type, .. } => source_type,
        }
    }

    /// Whether this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

// ---------------------------------------------------------------------------
// Build state, progress
// ---------------------------------------------------------------------------

/// Phase of a build operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildState {
    /// Not started.
    Idle,
    /// Separating instances and collecting proxies.
    Unpacking,
    /// Converting objects one by one.
    Converting,
    /// Attaching proxies and writing the cache.
    Finalizing,
    /// Finished with at least one success.
    Completed,
    /// Stopped by the caller.
    Cancelled,
    /// Nothing could be converted.
    Failed,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Unpacking => "unpacking",
            Self::Converting => "converting",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Count-based progress report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProgress {
    /// Current phase.
    pub state: BuildState,
    /// Objects processed so far.
    pub current: usize,
    /// Objects in the selection.
    pub total: usize,
}

impl BuildProgress {
    /// Completed fraction in `0.0..=1.0`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.current as f64 / self.total as f64
    }
}

/// Receives progress updates while a build runs.
pub trait ProgressReporter: Send + Sync {
    /// Called after every object and on phase changes.
    fn report(&self, progress: BuildProgress);
}

impl ProgressReporter for () {
    fn report(&self, _progress: BuildProgress) {}
}

impl<F> ProgressReporter for F
where
    F: Fn(BuildProgress) + Send + Sync,
{
    fn report(&self, progress: BuildProgress) {
        self(progress)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// A completed build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootObjectBuild {
    /// Build identifier (UUID v7).
    pub build_id: Uuid,
    /// Root collection with proxy tables attached.
    pub root: Collection,
    /// One result per selected object, in selection order.
    pub results: Vec<ConversionResult>,
    /// Objects reused from the cache.
    pub cache_hits: usize,
    /// When the build started.
    pub started_at: DateTime<Utc>,
    /// When the build finished.
    pub finished_at: DateTime<Utc>,
}

impl RootObjectBuild {
    /// Number of successful results.
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Number of failed results.
    pub fn error_count(&self) -> usize {
        self.results.len() - self.success_count()
    }
}

/// Terminal outcome of a build that did not fail outright.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    /// The build ran to completion.
    Completed(RootObjectBuild),
    /// The caller cancelled; results cover the objects processed before
    /// the cancellation was observed. Nothing was written to the cache.
    Cancelled {
        /// Partial results.
        results: Vec<ConversionResult>,
    },
}

impl BuildOutcome {
    /// Whether the build was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Per-object results, complete or partial.
    pub fn results(&self) -> &[ConversionResult] {
        match self {
            Self::Completed(build) => &build.results,
            Self::Cancelled { results } => results,
        }
    }

    /// The completed build, if any.
    pub fn into_completed(self) -> Option<RootObjectBuild> {
        match self {
            Self::Completed(build) => Some(build),
            Self::Cancelled { .. } => None,
        }
    }
}
