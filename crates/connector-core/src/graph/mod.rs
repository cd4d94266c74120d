//! The portable object graph.
//!
//! A send produces one root [`Collection`] whose nested collections mirror
//! the host's layer hierarchy and whose leaves are converted objects,
//! references to previously uploaded objects, or instance placements.
//! Side-tables of shared values (materials, colors, groups, instance
//! definitions, property sets) travel on the root under well-known keys.

pub mod node;
pub mod proxy;
pub mod reference;

pub use node::{Collection, DataObject, GraphNode};
pub use proxy::{
    Color, ColorProxy, CustomProxy, CustomValue, GroupInfo, GroupProxy, InstanceDefinition,
    InstanceDefinitionProxy, InstanceProxy, PropertySet, PropertySetProxy, ProxyCollection,
    ProxyValue, RenderMaterial, RenderMaterialProxy, keys,
};
pub use reference::ObjectReference;
