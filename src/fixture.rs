//! JSON host fixtures.
//!
//! Stands in for a live host document: a file listing the selected objects
//! with their layers, instance geometry, and the materials, colors, groups
//! and property sets a host would report. The converter passes each
//! object's `properties` through, or fails when the object carries an
//! `error`.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use connector_core::AppResult;
use connector_core::error::{AppError, ConversionError, ErrorKind};
use connector_core::graph::{Color, CustomValue, DataObject, GroupInfo, PropertySet, RenderMaterial};
use connector_core::traits::{HostObject, HostObjectSource, InstanceGeometry, ObjectConverter};
use connector_core::types::{ApplicationId, LayerPath, Transform};

/// Geometry shared by instances of one block definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureInstance {
    /// Definition name.
    pub name: String,
    /// Flat vertex buffer.
    #[serde(default)]
    pub vertices: Vec<f64>,
    /// Placement; identity when omitted.
    #[serde(default)]
    pub transform: Transform,
}

/// A connector-specific proxy value and the table it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureCustomProxy {
    /// Root key of the table.
    pub key: String,
    /// Discriminator.
    pub kind: String,
    /// Payload, stored as UTF-8 bytes.
    pub data: String,
}

/// One selected host object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixtureObject {
    /// Host id.
    pub id: ApplicationId,
    /// Host type name.
    #[serde(rename = "type")]
    pub source_type: String,
    /// `::`-delimited layer name; root when empty.
    #[serde(default)]
    pub layer: String,
    /// Converter output for this object.
    #[serde(default)]
    pub properties: serde_json::Value,
    /// Present when the object is a block instance.
    #[serde(default)]
    pub instance: Option<FixtureInstance>,
    /// Makes conversion fail with this message.
    #[serde(default)]
    pub error: Option<String>,
    /// Host groups.
    #[serde(default)]
    pub groups: Vec<GroupInfo>,
    /// Render material.
    #[serde(default)]
    pub material: Option<RenderMaterial>,
    /// Display color.
    #[serde(default)]
    pub color: Option<Color>,
    /// Attached property sets.
    #[serde(default)]
    pub property_sets: Vec<PropertySet>,
    /// Connector-specific proxies.
    #[serde(default)]
    pub custom_proxies: Vec<FixtureCustomProxy>,
}

impl HostObject for FixtureObject {
    fn application_id(&self) -> ApplicationId {
        self.id.clone()
    }

    fn source_type(&self) -> &str {
        &self.source_type
    }

    fn instance_geometry(&self) -> Option<InstanceGeometry<'_>> {
        self.instance.as_ref().map(|instance| InstanceGeometry {
            name: &instance.name,
            vertices: &instance.vertices,
            transform: instance.transform,
        })
    }
}

/// A host document read from a fixture file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureHost {
    /// The selection, in host order.
    pub objects: Vec<FixtureObject>,
}

impl FixtureHost {
    /// Read a fixture file.
    pub async fn load(path: &Path) -> AppResult<Self> {
        let content = tokio::fs::read(path).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to read fixture '{}'", path.display()),
                e,
            )
        })?;
        let host: Self = serde_json::from_slice(&content)?;
        Ok(host)
    }
}

impl HostObjectSource for FixtureHost {
    type Handle = FixtureObject;

    fn enumerate_selection(&self) -> AppResult<Vec<FixtureObject>> {
        Ok(self.objects.clone())
    }

    fn layer_of(&self, handle: &FixtureObject) -> LayerPath {
        LayerPath::parse(&handle.layer)
    }

    fn groups_of(&self, handle: &FixtureObject) -> Vec<GroupInfo> {
        handle.groups.clone()
    }

    fn render_material_of(&self, handle: &FixtureObject) -> Option<RenderMaterial> {
        handle.material.clone()
    }

    fn color_of(&self, handle: &FixtureObject) -> Option<Color> {
        handle.color.clone()
    }

    fn property_sets_of(&self, handle: &FixtureObject) -> Vec<PropertySet> {
        handle.property_sets.clone()
    }

    fn custom_proxies_of(&self, handle: &FixtureObject) -> Vec<(String, CustomValue)> {
        handle
            .custom_proxies
            .iter()
            .map(|proxy| {
                (
                    proxy.key.clone(),
                    CustomValue {
                        kind: proxy.kind.clone(),
                        data: proxy.data.clone().into_bytes().into(),
                    },
                )
            })
            .collect()
    }
}

/// Converter that passes fixture properties through.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureConverter;

#[async_trait]
impl ObjectConverter<FixtureObject> for FixtureConverter {
    async fn convert(&self, object: &FixtureObject) -> Result<DataObject, ConversionError> {
        if let Some(message) = &object.error {
            return Err(ConversionError::failed(message.clone()));
        }
        if object.source_type.is_empty() {
            return Err(ConversionError::Unsupported {
                source_type: String::new(),
            });
        }
        Ok(DataObject::new(
            object.source_type.clone(),
            object.properties.clone(),
        ))
    }

    fn is_reentrant(&self) -> bool {
        true
    }
}
