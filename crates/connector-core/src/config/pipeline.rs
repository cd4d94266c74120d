//! Build pipeline configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Settings that shape how a send is assembled.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum conversions in flight during one build.
    ///
    /// Values above 1 only take effect when the host converter reports
    /// itself as reentrant; most host object models are single-threaded.
    #[validate(range(min = 1, max = 16))]
    pub concurrency: usize,

    /// Name given to the root collection of every build.
    #[validate(length(min = 1, max = 256))]
    pub root_name: String,

    /// Drop proxy references to objects that did not make it into the tree.
    pub prune_orphan_proxies: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 1,
            root_name: "Root".to_string(),
            prune_orphan_proxies: true,
        }
    }
}
