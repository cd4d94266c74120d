//! Setting-driven cache invalidation.
//!
//! The conversion cache knows nothing about conversion settings. This
//! policy remembers, per unit of work, the last value each tracked setting
//! was sent with; when a value changes, the unit's current selection is
//! evicted so it is reconverted under the new setting.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info};

use connector_core::traits::ConversionCache;
use connector_core::types::{ApplicationId, SettingId, UnitOfWorkId};

use crate::models::BuildRequest;

/// Keyed memo of setting values from the previous send of each unit of work.
#[derive(Debug)]
pub struct CacheInvalidationPolicy {
    cache: Arc<dyn ConversionCache>,
    memo: DashMap<(UnitOfWorkId, SettingId), Value>,
}

impl CacheInvalidationPolicy {
    /// Create a policy that evicts from `cache`.
    pub fn new(cache: Arc<dyn ConversionCache>) -> Self {
        Self {
            cache,
            memo: DashMap::new(),
        }
    }

    /// Compare `current` with the value recorded for this unit of work.
    ///
    /// On a change, evicts `selection` from the cache before recording the
    /// new value. The first value seen for a setting is recorded without
    /// evicting and reports no change.
    pub async fn has_setting_changed(
        &self,
        unit_of_work_id: &UnitOfWorkId,
        setting_id: &SettingId,
        current: &Value,
        selection: &[ApplicationId],
    ) -> bool {
        let key = (unit_of_work_id.clone(), setting_id.clone());

        // Guard released before awaiting the eviction.
        let previous = self.memo.get(&key).map(|entry| entry.value().clone());

        let changed = match previous {
            Some(previous) if previous != *current => {
                info!(
                    %unit_of_work_id,
                    %setting_id,
                    %previous,
                    %current,
                    evicted = selection.len(),
                    "Setting changed; evicting selection from conversion cache"
                );
                self.cache.evict(selection).await;
                true
            }
            Some(_) => false,
            None => {
                debug!(%unit_of_work_id, %setting_id, "Recording first value for setting");
                false
            }
        };

        self.memo.insert(key, current.clone());
        changed
    }

    /// Evaluate every setting of `request` against `selection`. Returns the
    /// ids of the settings that changed.
    ///
    /// A setting recorded for the unit of work but missing from `request`
    /// counts as changed: the selection is evicted and the setting is
    /// forgotten, so it is treated as new if it comes back.
    pub async fn apply(&self, request: &BuildRequest, selection: &[ApplicationId]) -> Vec<SettingId> {
        let unit_of_work_id = &request.unit_of_work_id;
        let mut changed = Vec::new();
        for (setting_id, value) in &request.settings {
            if self
                .has_setting_changed(unit_of_work_id, setting_id, value, selection)
                .await
            {
                changed.push(setting_id.clone());
            }
        }

        let dropped: Vec<SettingId> = self
            .memo
            .iter()
            .filter(|entry| {
                let (unit, setting_id) = entry.key();
                unit == unit_of_work_id && !request.settings.contains_key(setting_id)
            })
            .map(|entry| entry.key().1.clone())
            .collect();

        if !dropped.is_empty() {
            info!(
                %unit_of_work_id,
                settings = ?dropped,
                evicted = selection.len(),
                "Settings no longer sent; evicting selection from conversion cache"
            );
            self.cache.evict(selection).await;
            for setting_id in &dropped {
                self.memo.remove(&(unit_of_work_id.clone(), setting_id.clone()));
            }
            changed.extend(dropped);
        }

        changed
    }

    /// Drop everything recorded for a unit of work (the model card was removed).
    pub fn forget(&self, unit_of_work_id: &UnitOfWorkId) {
        self.memo.retain(|(unit, _), _| unit != unit_of_work_id);
    }

    /// Drop every recorded value.
    pub fn clear(&self) {
        self.memo.clear();
    }

    /// Number of recorded `(unit of work, setting)` pairs.
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    /// Whether nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}
