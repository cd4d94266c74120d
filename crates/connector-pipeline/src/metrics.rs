//! Build metrics.
//!
//! Counts builds, per-object outcomes, and cache effectiveness for one
//! document session. Counters are atomics; build durations are kept in a
//! bounded sample window for percentile reporting.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Maximum number of build duration samples kept in memory.
const MAX_DURATION_SAMPLES: usize = 1000;

/// Build metrics collector, shared between a session and its builder.
#[derive(Debug)]
pub struct BuildMetrics {
    /// Builds started.
    pub builds_started: AtomicU64,
    /// Builds that produced a root.
    pub builds_completed: AtomicU64,
    /// Builds stopped by the caller.
    pub builds_cancelled: AtomicU64,
    /// Builds where nothing converted.
    pub builds_failed: AtomicU64,
    /// Objects run through the converter successfully.
    pub objects_converted: AtomicU64,
    /// Objects that produced an error result.
    pub objects_failed: AtomicU64,
    /// Objects reused from the conversion cache.
    pub cache_hits: AtomicU64,
    /// Objects looked up and not found in the cache.
    pub cache_misses: AtomicU64,
    /// Instance placements emitted.
    pub instances_placed: AtomicU64,
    /// Cache entries evicted after a setting change.
    pub entries_invalidated: AtomicU64,
    duration_samples: Mutex<Vec<Duration>>,
}

impl BuildMetrics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self {
            builds_started: AtomicU64::new(0),
            builds_completed: AtomicU64::new(0),
            builds_cancelled: AtomicU64::new(0),
            builds_failed: AtomicU64::new(0),
            objects_converted: AtomicU64::new(0),
            objects_failed: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            instances_placed: AtomicU64::new(0),
            entries_invalidated: AtomicU64::new(0),
            duration_samples: Mutex::new(Vec::with_capacity(MAX_DURATION_SAMPLES)),
        }
    }

    pub(crate) fn record_started(&self) {
        self.builds_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self, duration: Duration) {
        self.builds_completed.fetch_add(1, Ordering::Relaxed);
        self.add_duration_sample(duration);
    }

    pub(crate) fn record_cancelled(&self) {
        self.builds_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.builds_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_converted(&self) {
        self.objects_converted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_object_failed(&self) {
        self.objects_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_instance(&self) {
        self.instances_placed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_invalidated(&self, entries: u64) {
        self.entries_invalidated.fetch_add(entries, Ordering::Relaxed);
    }

    fn add_duration_sample(&self, duration: Duration) {
        if let Ok(mut samples) = self.duration_samples.lock() {
            if samples.len() >= MAX_DURATION_SAMPLES {
                samples.remove(0);
            }
            samples.push(duration);
        }
    }

    /// Point-in-time copy of every counter.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let durations = self
            .duration_samples
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default();

        let (p50, p95) = Self::calculate_percentiles(&durations);
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);

        MetricsSnapshot {
            builds_started: self.builds_started.load(Ordering::Relaxed),
            builds_completed: self.builds_completed.load(Ordering::Relaxed),
            builds_cancelled: self.builds_cancelled.load(Ordering::Relaxed),
            builds_failed: self.builds_failed.load(Ordering::Relaxed),
            objects_converted: self.objects_converted.load(Ordering::Relaxed),
            objects_failed: self.objects_failed.load(Ordering::Relaxed),
            cache_hits: hits,
            cache_misses: misses,
            cache_hit_ratio: if hits + misses == 0 {
                0.0
            } else {
                hits as f64 / (hits + misses) as f64
            },
            instances_placed: self.instances_placed.load(Ordering::Relaxed),
            entries_invalidated: self.entries_invalidated.load(Ordering::Relaxed),
            build_duration_p50: p50,
            build_duration_p95: p95,
            sample_count: durations.len() as u64,
        }
    }

    fn calculate_percentiles(durations: &[Duration]) -> (Option<Duration>, Option<Duration>) {
        if durations.is_empty() {
            return (None, None);
        }

        let mut sorted = durations.to_vec();
        sorted.sort();
        let len = sorted.len();

        (
            sorted.get(len * 50 / 100).copied(),
            sorted.get(len * 95 / 100).copied(),
        )
    }
}

impl Default for BuildMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time snapshot of build metrics.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MetricsSnapshot {
    /// Builds started.
    pub builds_started: u64,
    /// Builds that produced a root.
    pub builds_completed: u64,
    /// Builds stopped by the caller.
    pub builds_cancelled: u64,
    /// Builds where nothing converted.
    pub builds_failed: u64,
    /// Objects converted.
    pub objects_converted: u64,
    /// Objects that failed.
    pub objects_failed: u64,
    /// Cache hits.
    pub cache_hits: u64,
    /// Cache misses.
    pub cache_misses: u64,
    /// Hits over lookups, `0.0` before any lookup.
    pub cache_hit_ratio: f64,
    /// Instance placements emitted.
    pub instances_placed: u64,
    /// Cache entries evicted by setting changes.
    pub entries_invalidated: u64,
    /// P50 build duration.
    #[serde(
        serialize_with = "serialize_opt_duration",
        deserialize_with = "deserialize_opt_duration"
    )]
    pub build_duration_p50: Option<Duration>,
    /// P95 build duration.
    #[serde(
        serialize_with = "serialize_opt_duration",
        deserialize_with = "deserialize_opt_duration"
    )]
    pub build_duration_p95: Option<Duration>,
    /// Number of duration samples collected.
    pub sample_count: u64,
}

/// Serialize an optional Duration as milliseconds.
fn serialize_opt_duration<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match duration {
        Some(d) => serializer.serialize_some(&d.as_millis()),
        None => serializer.serialize_none(),
    }
}

/// Deserialize an optional Duration from milliseconds.
fn deserialize_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let millis: Option<u128> = serde::Deserialize::deserialize(deserializer)?;
    Ok(millis.map(|ms| Duration::from_millis(ms as u64)))
}
