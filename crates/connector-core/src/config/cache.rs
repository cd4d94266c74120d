//! Conversion cache configuration.

use serde::{Deserialize, Serialize};

/// Top-level cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache provider type: `"memory"` or `"null"`.
    ///
    /// `"null"` is for hosts whose object ids are volatile and therefore
    /// cannot be trusted as cache keys.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// In-memory cache configuration.
    #[serde(default)]
    pub memory: MemoryCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            memory: MemoryCacheConfig::default(),
        }
    }
}

/// In-memory cache backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Maximum number of object references held per document.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Drop entries not read for this many seconds. `None` keeps them for
    /// the lifetime of the document.
    #[serde(default)]
    pub time_to_idle_seconds: Option<u64>,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
            time_to_idle_seconds: None,
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_max_capacity() -> u64 {
    1_000_000
}
