//! Proxy side-tables and instance placements.
//!
//! A proxy pairs one shared value with every object that uses it. Proxies
//! live outside the primary tree, on the root collection, and point back
//! into it by [`ApplicationId`].

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::types::{ApplicationId, DefinitionId, Transform};

/// Well-known keys under which proxy tables are stored on the root.
///
/// Downstream serializers must preserve these verbatim.
pub mod keys {
    /// Shared instance definitions.
    pub const INSTANCE_DEFINITION_PROXIES: &str = "instanceDefinitionProxies";
    /// Host groups.
    pub const GROUP_PROXIES: &str = "groupProxies";
    /// Render materials.
    pub const RENDER_MATERIAL_PROXIES: &str = "renderMaterialProxies";
    /// Display colors.
    pub const COLOR_PROXIES: &str = "colorProxies";
    /// Property set definitions (BIM hosts).
    pub const PROPERTY_SET_DEFINITIONS: &str = "propertySetDefinitions";
    /// Structural component tables (analysis hosts).
    pub const COMPONENT_PROXIES: &str = "componentProxies";
}

/// A shared value and the ids of every object that uses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyCollection<T> {
    /// The shared value.
    pub value: T,
    /// Objects using the value, in first-use order.
    pub objects: Vec<ApplicationId>,
}

impl<T> ProxyCollection<T> {
    /// Create a proxy with no users yet.
    pub fn new(value: T) -> Self {
        Self {
            value,
            objects: Vec::new(),
        }
    }

    /// Record a user, ignoring repeats.
    pub fn add_object(&mut self, application_id: ApplicationId) {
        if !self.objects.contains(&application_id) {
            self.objects.push(application_id);
        }
    }
}

/// Shared geometry referenced by one or more instance placements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDefinition {
    /// Content hash of `vertices`.
    pub id: DefinitionId,
    /// Host name of the block/definition.
    pub name: String,
    /// Flat `x, y, z` vertex buffer.
    pub vertices: Vec<f64>,
}

/// A host group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupInfo {
    /// Host id of the group.
    pub application_id: ApplicationId,
    /// Group name.
    pub name: String,
}

/// A render material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderMaterial {
    /// Host id of the material; materials are shared by this id.
    pub application_id: ApplicationId,
    /// Material name.
    pub name: String,
    /// Diffuse color as packed ARGB.
    pub diffuse: u32,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f64,
    /// Metalness in `0.0..=1.0`.
    #[serde(default)]
    pub metalness: f64,
    /// Roughness in `0.0..=1.0`.
    #[serde(default = "default_roughness")]
    pub roughness: f64,
}

fn default_roughness() -> f64 {
    1.0
}

/// A display color. Colors are shared by `argb` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Color {
    /// Packed ARGB.
    pub argb: u32,
    /// Optional host name of the color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A named set of properties shared by several objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    /// Set name; sets are shared by name.
    pub name: String,
    /// Property values.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Opaque connector-specific proxy payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomValue {
    /// Connector-defined discriminator.
    pub kind: String,
    /// Encoded value.
    pub data: Bytes,
}

/// Instance definition proxy: the definition plus every instance using it.
pub type InstanceDefinitionProxy = ProxyCollection<InstanceDefinition>;
/// Group proxy.
pub type GroupProxy = ProxyCollection<GroupInfo>;
/// Render material proxy.
pub type RenderMaterialProxy = ProxyCollection<RenderMaterial>;
/// Color proxy.
pub type ColorProxy = ProxyCollection<Color>;
/// Property set proxy.
pub type PropertySetProxy = ProxyCollection<PropertySet>;
/// Connector-specific proxy.
pub type CustomProxy = ProxyCollection<CustomValue>;

/// A proxy record as stored in a root table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "proxyType", rename_all = "camelCase")]
pub enum ProxyValue {
    /// See [`InstanceDefinitionProxy`].
    InstanceDefinition(InstanceDefinitionProxy),
    /// See [`GroupProxy`].
    Group(GroupProxy),
    /// See [`RenderMaterialProxy`].
    RenderMaterial(RenderMaterialProxy),
    /// See [`ColorProxy`].
    Color(ColorProxy),
    /// See [`PropertySetProxy`].
    PropertySet(PropertySetProxy),
    /// See [`CustomProxy`].
    Custom(CustomProxy),
}

impl ProxyValue {
    /// Ids of the objects this proxy points at.
    pub fn objects(&self) -> &[ApplicationId] {
        match self {
            Self::InstanceDefinition(p) => &p.objects,
            Self::Group(p) => &p.objects,
            Self::RenderMaterial(p) => &p.objects,
            Self::Color(p) => &p.objects,
            Self::PropertySet(p) => &p.objects,
            Self::Custom(p) => &p.objects,
        }
    }

    /// Mutable access to the object id list.
    pub fn objects_mut(&mut self) -> &mut Vec<ApplicationId> {
        match self {
            Self::InstanceDefinition(p) => &mut p.objects,
            Self::Group(p) => &mut p.objects,
            Self::RenderMaterial(p) => &mut p.objects,
            Self::Color(p) => &mut p.objects,
            Self::PropertySet(p) => &mut p.objects,
            Self::Custom(p) => &mut p.objects,
        }
    }
}

/// One placement of a shared instance definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceProxy {
    /// Host id of the placed instance.
    pub application_id: ApplicationId,
    /// Definition this instance places.
    pub definition_id: DefinitionId,
    /// Placement transform.
    pub transform: Transform,
}
