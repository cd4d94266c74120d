//! Receive-side unpacking.
//!
//! Walks a received root collection and hands every non-collection node to
//! the host's baking stage together with the chain of collections above it,
//! so the receiver can recreate the sender's layer hierarchy. Proxy tables
//! are read back from the root by their well-known keys.

use std::collections::HashSet;

use tracing::{debug, warn};

use connector_core::graph::{
    ColorProxy, Collection, CustomProxy, GraphNode, GroupProxy, InstanceDefinitionProxy,
    PropertySetProxy, ProxyValue, RenderMaterialProxy, keys,
};
use connector_core::types::{ApplicationId, LayerPath};

/// One node to bake, with the collections it was found under.
#[derive(Debug, Clone, PartialEq)]
pub struct TraversalContext<'a> {
    /// Ancestor collections, outermost first, excluding the root.
    pub layer_path: Vec<&'a Collection>,
    /// The node itself. Never a collection.
    pub node: &'a GraphNode,
}

impl TraversalContext<'_> {
    /// Collection names along the path.
    pub fn layer_names(&self) -> Vec<&str> {
        self.layer_path.iter().map(|c| c.name.as_str()).collect()
    }

    /// The path as a [`LayerPath`], comparable with what the sender used.
    pub fn to_layer_path(&self) -> LayerPath {
        LayerPath::new(self.layer_path.iter().map(|c| c.name.clone()))
    }
}

/// Lazy depth-first traversal of a root collection.
///
/// Children are visited in their stored order. Cloning the iterator (or
/// calling [`RootObjectUnpacker::objects_to_convert`] again) restarts the
/// walk and yields the same sequence.
#[derive(Debug, Clone)]
pub struct ObjectTraversal<'a> {
    stack: Vec<(&'a Collection, usize)>,
}

impl<'a> Iterator for ObjectTraversal<'a> {
    type Item = TraversalContext<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            let (collection, index) = *top;
            let Some(node) = collection.elements.get(index) else {
                self.stack.pop();
                continue;
            };
            top.1 += 1;

            match node {
                GraphNode::Collection(child) => self.stack.push((child, 0)),
                node => {
                    let layer_path = self.stack.iter().skip(1).map(|(c, _)| *c).collect();
                    return Some(TraversalContext { layer_path, node });
                }
            }
        }
    }
}

/// A proxy entry whose object id does not appear in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanReference {
    /// Root key of the table holding the proxy.
    pub key: String,
    /// The missing object id.
    pub application_id: ApplicationId,
}

/// Everything a receiver needs from a root, read in one pass.
#[derive(Debug)]
pub struct UnpackedRoot<'a> {
    /// Nodes to bake, depth-first.
    pub objects: Vec<TraversalContext<'a>>,
    /// Shared instance definitions.
    pub instance_definitions: Option<Vec<InstanceDefinitionProxy>>,
    /// Host groups.
    pub groups: Option<Vec<GroupProxy>>,
    /// Render materials.
    pub render_materials: Option<Vec<RenderMaterialProxy>>,
    /// Display colors.
    pub colors: Option<Vec<ColorProxy>>,
    /// Property set definitions.
    pub property_sets: Option<Vec<PropertySetProxy>>,
    /// Proxy references to absent objects. Inert; reported for diagnostics.
    pub orphans: Vec<OrphanReference>,
}

/// Reads received graphs back into bakeable pieces.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootObjectUnpacker;

impl RootObjectUnpacker {
    /// Depth-first traversal of every non-collection node under `root`.
    pub fn objects_to_convert(root: &Collection) -> ObjectTraversal<'_> {
        ObjectTraversal {
            stack: vec![(root, 0)],
        }
    }

    /// Color proxies, or `None` if the root has no color table.
    pub fn try_get_color_proxies(root: &Collection) -> Option<Vec<ColorProxy>> {
        Self::table(root, keys::COLOR_PROXIES, |value| match value {
            ProxyValue::Color(p) => Some(p.clone()),
            _ => None,
        })
    }

    /// Render material proxies, or `None` if absent.
    pub fn try_get_render_material_proxies(root: &Collection) -> Option<Vec<RenderMaterialProxy>> {
        Self::table(root, keys::RENDER_MATERIAL_PROXIES, |value| match value {
            ProxyValue::RenderMaterial(p) => Some(p.clone()),
            _ => None,
        })
    }

    /// Instance definition proxies, or `None` if absent.
    pub fn try_get_instance_definition_proxies(
        root: &Collection,
    ) -> Option<Vec<InstanceDefinitionProxy>> {
        Self::table(root, keys::INSTANCE_DEFINITION_PROXIES, |value| match value {
            ProxyValue::InstanceDefinition(p) => Some(p.clone()),
            _ => None,
        })
    }

    /// Group proxies, or `None` if absent.
    pub fn try_get_group_proxies(root: &Collection) -> Option<Vec<GroupProxy>> {
        Self::table(root, keys::GROUP_PROXIES, |value| match value {
            ProxyValue::Group(p) => Some(p.clone()),
            _ => None,
        })
    }

    /// Property set definitions, or `None` if absent.
    pub fn try_get_property_set_proxies(root: &Collection) -> Option<Vec<PropertySetProxy>> {
        Self::table(root, keys::PROPERTY_SET_DEFINITIONS, |value| match value {
            ProxyValue::PropertySet(p) => Some(p.clone()),
            _ => None,
        })
    }

    /// Connector-specific proxies stored under `key`, or `None` if absent.
    pub fn try_get_custom_proxies(root: &Collection, key: &str) -> Option<Vec<CustomProxy>> {
        Self::table(root, key, |value| match value {
            ProxyValue::Custom(p) => Some(p.clone()),
            _ => None,
        })
    }

    fn table<T>(
        root: &Collection,
        key: &str,
        extract: impl Fn(&ProxyValue) -> Option<T>,
    ) -> Option<Vec<T>> {
        let table = root.proxy_table(key)?;
        let values: Vec<T> = table.iter().filter_map(&extract).collect();
        if values.len() != table.len() {
            warn!(
                key,
                skipped = table.len() - values.len(),
                "Proxy table holds records of an unexpected type"
            );
        }
        Some(values)
    }

    /// Proxy entries pointing at ids that no node in the tree carries.
    pub fn orphan_references(root: &Collection) -> Vec<OrphanReference> {
        let present: HashSet<&ApplicationId> = Self::objects_to_convert(root)
            .filter_map(|context| context.node.application_id())
            .collect();
        let present = &present;

        root.proxies
            .iter()
            .flat_map(move |(key, table)| {
                table
                    .iter()
                    .flat_map(ProxyValue::objects)
                    .filter(move |id| !present.contains(id))
                    .map(move |id| OrphanReference {
                        key: key.clone(),
                        application_id: id.clone(),
                    })
            })
            .collect()
    }

    /// Read traversal and proxy tables together. Orphans are logged and
    /// otherwise ignored.
    pub fn unpack(root: &Collection) -> UnpackedRoot<'_> {
        let orphans = Self::orphan_references(root);
        for orphan in &orphans {
            warn!(
                key = %orphan.key,
                application_id = %orphan.application_id,
                "Proxy references an object absent from the tree"
            );
        }

        let unpacked = UnpackedRoot {
            objects: Self::objects_to_convert(root).collect(),
            instance_definitions: Self::try_get_instance_definition_proxies(root),
            groups: Self::try_get_group_proxies(root),
            render_materials: Self::try_get_render_material_proxies(root),
            colors: Self::try_get_color_proxies(root),
            property_sets: Self::try_get_property_set_proxies(root),
            orphans,
        };
        debug!(
            objects = unpacked.objects.len(),
            orphans = unpacked.orphans.len(),
            "Unpacked root"
        );
        unpacked
    }
}
