//! Host enumeration traits.

use crate::graph::{Color, CustomValue, GroupInfo, PropertySet, RenderMaterial};
use crate::result::AppResult;
use crate::types::{ApplicationId, LayerPath, Transform};

/// Geometry of an object that is a placement of shared geometry
/// (a block reference, a component instance).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceGeometry<'a> {
    /// Host name of the definition.
    pub name: &'a str,
    /// Flat `x, y, z` vertex buffer of the definition, in definition space.
    pub vertices: &'a [f64],
    /// Placement of this instance.
    pub transform: Transform,
}

/// A handle to one host-native object.
pub trait HostObject: Send + Sync {
    /// Stable per-document id.
    fn application_id(&self) -> ApplicationId;

    /// Host type name, reported in conversion results.
    fn source_type(&self) -> &str;

    /// Shared geometry when this object is an instance placement.
    fn instance_geometry(&self) -> Option<InstanceGeometry<'_>> {
        None
    }
}

/// Enumerates the user's selection in a host document and answers
/// questions about where each object sits.
///
/// Only `enumerate_selection` and `layer_of` are required; hosts without
/// groups, materials, colors, or property sets keep the defaults.
pub trait HostObjectSource: Send + Sync {
    /// Handle type for this host's objects.
    type Handle: HostObject;

    /// The currently selected objects, in a stable order.
    fn enumerate_selection(&self) -> AppResult<Vec<Self::Handle>>;

    /// Layer (or group) path the object lives on.
    fn layer_of(&self, handle: &Self::Handle) -> LayerPath;

    /// Groups the object belongs to.
    fn groups_of(&self, _handle: &Self::Handle) -> Vec<GroupInfo> {
        Vec::new()
    }

    /// Render material assigned to the object.
    fn render_material_of(&self, _handle: &Self::Handle) -> Option<RenderMaterial> {
        None
    }

    /// Display color of the object.
    fn color_of(&self, _handle: &Self::Handle) -> Option<Color> {
        None
    }

    /// Property sets attached to the object.
    fn property_sets_of(&self, _handle: &Self::Handle) -> Vec<PropertySet> {
        Vec::new()
    }

    /// Connector-specific proxy values, each paired with the root key its
    /// table is stored under (e.g. `componentProxies`).
    fn custom_proxies_of(&self, _handle: &Self::Handle) -> Vec<(String, CustomValue)> {
        Vec::new()
    }
}
