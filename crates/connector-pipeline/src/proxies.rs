//! Proxy aggregation.
//!
//! Collects the side-tables produced while unpacking a selection. Identical
//! values are shared: a material used by fifty objects is one proxy listing
//! fifty ids. Tables are rebuilt from scratch on every build.

use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use connector_core::graph::{
    Color, ColorProxy, CustomProxy, CustomValue, GroupInfo, GroupProxy, InstanceDefinitionProxy,
    PropertySet, PropertySetProxy, ProxyValue, RenderMaterial, RenderMaterialProxy, keys,
};
use connector_core::types::{ApplicationId, DefinitionId};

/// Builds the proxy tables attached to a root collection.
#[derive(Debug, Default)]
pub struct ProxyAggregator {
    instance_definitions: IndexMap<DefinitionId, InstanceDefinitionProxy>,
    groups: IndexMap<ApplicationId, GroupProxy>,
    render_materials: IndexMap<ApplicationId, RenderMaterialProxy>,
    colors: IndexMap<u32, ColorProxy>,
    property_sets: IndexMap<String, PropertySetProxy>,
    custom: IndexMap<String, IndexMap<CustomValue, CustomProxy>>,
}

impl ProxyAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take over the definitions produced by instance unpacking.
    pub fn add_instance_definitions(
        &mut self,
        definitions: impl IntoIterator<Item = (DefinitionId, InstanceDefinitionProxy)>,
    ) {
        self.instance_definitions.extend(definitions);
    }

    /// Record that `object` belongs to `group`.
    pub fn add_group(&mut self, object: &ApplicationId, group: GroupInfo) {
        self.groups
            .entry(group.application_id.clone())
            .or_insert_with(|| GroupProxy::new(group))
            .add_object(object.clone());
    }

    /// Record that `object` uses `material`. Materials are shared by id;
    /// the first definition seen for an id wins.
    pub fn add_render_material(&mut self, object: &ApplicationId, material: RenderMaterial) {
        self.render_materials
            .entry(material.application_id.clone())
            .or_insert_with(|| RenderMaterialProxy::new(material))
            .add_object(object.clone());
    }

    /// Record that `object` is displayed in `color`. Colors are shared by value.
    pub fn add_color(&mut self, object: &ApplicationId, color: Color) {
        self.colors
            .entry(color.argb)
            .or_insert_with(|| ColorProxy::new(color))
            .add_object(object.clone());
    }

    /// Record that `object` carries `property_set`. Sets are shared by name.
    pub fn add_property_set(&mut self, object: &ApplicationId, property_set: PropertySet) {
        self.property_sets
            .entry(property_set.name.clone())
            .or_insert_with(|| PropertySetProxy::new(property_set))
            .add_object(object.clone());
    }

    /// Record a connector-specific value stored under `key` on the root.
    pub fn add_custom(&mut self, key: &str, object: &ApplicationId, value: CustomValue) {
        self.custom
            .entry(key.to_string())
            .or_default()
            .entry(value.clone())
            .or_insert_with(|| CustomProxy::new(value))
            .add_object(object.clone());
    }

    /// Drop references to objects not in `present`, then drop proxies left
    /// with no objects. Returns the number of references removed.
    pub fn retain_objects(&mut self, present: &HashSet<ApplicationId>) -> usize {
        fn prune<K, T>(
            table: &mut IndexMap<K, connector_core::graph::ProxyCollection<T>>,
            present: &HashSet<ApplicationId>,
        ) -> usize {
            let mut removed = 0;
            for proxy in table.values_mut() {
                let before = proxy.objects.len();
                proxy.objects.retain(|id| present.contains(id));
                removed += before - proxy.objects.len();
            }
            table.retain(|_, proxy| !proxy.objects.is_empty());
            removed
        }

        let mut removed = prune(&mut self.instance_definitions, present)
            + prune(&mut self.groups, present)
            + prune(&mut self.render_materials, present)
            + prune(&mut self.colors, present)
            + prune(&mut self.property_sets, present);
        for table in self.custom.values_mut() {
            removed += prune(table, present);
        }
        self.custom.retain(|_, table| !table.is_empty());

        if removed > 0 {
            debug!(removed, "Pruned proxy references to objects absent from the tree");
        }
        removed
    }

    /// Whether nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.instance_definitions.is_empty()
            && self.groups.is_empty()
            && self.render_materials.is_empty()
            && self.colors.is_empty()
            && self.property_sets.is_empty()
            && self.custom.is_empty()
    }

    /// Produce the tables keyed by their well-known names.
    ///
    /// The four standard tables are always present (possibly empty) so a
    /// receiver can tell "no materials" from "sender predates materials".
    /// Property sets and connector-specific tables appear only when used.
    pub fn into_tables(self) -> BTreeMap<String, Vec<ProxyValue>> {
        let mut tables = BTreeMap::new();

        tables.insert(
            keys::INSTANCE_DEFINITION_PROXIES.to_string(),
            self.instance_definitions
                .into_values()
                .map(ProxyValue::InstanceDefinition)
                .collect(),
        );
        tables.insert(
            keys::GROUP_PROXIES.to_string(),
            self.groups.into_values().map(ProxyValue::Group).collect(),
        );
        tables.insert(
            keys::RENDER_MATERIAL_PROXIES.to_string(),
            self.render_materials
                .into_values()
                .map(ProxyValue::RenderMaterial)
                .collect(),
        );
        tables.insert(
            keys::COLOR_PROXIES.to_string(),
            self.colors.into_values().map(ProxyValue::Color).collect(),
        );

        if !self.property_sets.is_empty() {
            tables.insert(
                keys::PROPERTY_SET_DEFINITIONS.to_string(),
                self.property_sets
                    .into_values()
                    .map(ProxyValue::PropertySet)
                    .collect(),
            );
        }

        for (key, table) in self.custom {
            tables
                .entry(key)
                .or_insert_with(Vec::new)
                .extend(table.into_values().map(ProxyValue::Custom));
        }

        tables
    }
}
