//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use connector_core::AppResult;
use connector_core::config::PipelineConfig;
use connector_core::error::ConversionError;
use connector_core::graph::{Color, DataObject, GroupInfo, RenderMaterial};
use connector_core::traits::{
    ConversionCache, HostObject, HostObjectSource, InstanceGeometry, ObjectConverter,
};
use connector_core::types::{ApplicationId, LayerPath, Transform};
use connector_pipeline::DocumentSession;

/// A host object with scriptable behaviour.
#[derive(Debug, Clone)]
pub struct TestObject {
    pub id: ApplicationId,
    pub layer: LayerPath,
    pub vertices: Vec<f64>,
    pub instance: Option<Transform>,
    pub fail: bool,
    pub panic: bool,
    pub color: Option<Color>,
    pub material: Option<RenderMaterial>,
    pub groups: Vec<GroupInfo>,
}

impl TestObject {
    /// A plain object on `layer` (`::`-delimited).
    pub fn atomic(id: &str, layer: &str) -> Self {
        Self {
            id: ApplicationId::new(id),
            layer: LayerPath::parse(layer),
            vertices: vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            instance: None,
            fail: false,
            panic: false,
            color: None,
            material: None,
            groups: Vec::new(),
        }
    }

    /// A block instance placing `vertices` at `transform`.
    pub fn instance(id: &str, layer: &str, vertices: Vec<f64>, transform: Transform) -> Self {
        Self {
            vertices,
            instance: Some(transform),
            ..Self::atomic(id, layer)
        }
    }

    pub fn with_vertices(mut self, vertices: Vec<f64>) -> Self {
        self.vertices = vertices;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panic = true;
        self
    }

    pub fn with_color(mut self, argb: u32) -> Self {
        self.color = Some(Color { argb, name: None });
        self
    }

    pub fn with_material(mut self, material_id: &str) -> Self {
        self.material = Some(RenderMaterial {
            application_id: ApplicationId::new(material_id),
            name: material_id.to_string(),
            diffuse: 0xFFCCCCCC,
            opacity: 1.0,
            metalness: 0.0,
            roughness: 0.5,
        });
        self
    }

    pub fn in_group(mut self, group_id: &str) -> Self {
        self.groups.push(GroupInfo {
            application_id: ApplicationId::new(group_id),
            name: group_id.to_string(),
        });
        self
    }
}

impl HostObject for TestObject {
    fn application_id(&self) -> ApplicationId {
        self.id.clone()
    }

    fn source_type(&self) -> &str {
        if self.instance.is_some() { "InstanceReference" } else { "Mesh" }
    }

    fn instance_geometry(&self) -> Option<InstanceGeometry<'_>> {
        self.instance.map(|transform| InstanceGeometry {
            name: "Block",
            vertices: &self.vertices,
            transform,
        })
    }
}

/// An in-memory host document whose selection can be swapped between sends.
#[derive(Debug, Default)]
pub struct TestHost {
    selection: Mutex<Vec<TestObject>>,
}

impl TestHost {
    pub fn new(selection: Vec<TestObject>) -> Self {
        Self {
            selection: Mutex::new(selection),
        }
    }

    pub fn select(&self, selection: Vec<TestObject>) {
        *self.selection.lock().expect("selection lock") = selection;
    }
}

impl HostObjectSource for TestHost {
    type Handle = TestObject;

    fn enumerate_selection(&self) -> AppResult<Vec<TestObject>> {
        Ok(self.selection.lock().expect("selection lock").clone())
    }

    fn layer_of(&self, handle: &TestObject) -> LayerPath {
        handle.layer.clone()
    }

    fn groups_of(&self, handle: &TestObject) -> Vec<GroupInfo> {
        handle.groups.clone()
    }

    fn render_material_of(&self, handle: &TestObject) -> Option<RenderMaterial> {
        handle.material.clone()
    }

    fn color_of(&self, handle: &TestObject) -> Option<Color> {
        handle.color.clone()
    }
}

/// Converter that records every call and fails or panics on demand.
#[derive(Debug, Default)]
pub struct TestConverter {
    calls: AtomicUsize,
    converted: Mutex<Vec<ApplicationId>>,
    reentrant: bool,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl TestConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow the builder to run conversions concurrently.
    pub fn reentrant() -> Self {
        Self {
            reentrant: true,
            ..Self::default()
        }
    }

    /// Cancel `token` once `calls` conversions have run.
    pub fn cancelling_after(calls: usize, token: CancellationToken) -> Self {
        Self {
            cancel_after: Some((calls, token)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn converted(&self) -> Vec<ApplicationId> {
        self.converted.lock().expect("converted lock").clone()
    }
}

#[async_trait]
impl ObjectConverter<TestObject> for TestConverter {
    async fn convert(&self, object: &TestObject) -> Result<DataObject, ConversionError> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.converted
            .lock()
            .expect("converted lock")
            .push(object.id.clone());

        if let Some((after, token)) = &self.cancel_after {
            if calls >= *after {
                token.cancel();
            }
        }
        if object.panic {
            panic!("converter crashed on {}", object.id);
        }
        if object.fail {
            return Err(ConversionError::InvalidGeometry {
                reason: format!("{} is degenerate", object.id),
            });
        }

        // Yield so concurrent conversions interleave.
        tokio::task::yield_now().await;

        Ok(DataObject::new(
            "Mesh",
            json!({ "id": object.id, "vertices": object.vertices }),
        ))
    }

    fn is_reentrant(&self) -> bool {
        self.reentrant
    }
}

/// Open a session over `host` backed by `cache`.
pub fn session(
    host: Arc<TestHost>,
    converter: Arc<TestConverter>,
    cache: Arc<dyn ConversionCache>,
) -> DocumentSession<TestHost, TestConverter> {
    session_with_config(host, converter, cache, PipelineConfig::default())
}

pub fn session_with_config(
    host: Arc<TestHost>,
    converter: Arc<TestConverter>,
    cache: Arc<dyn ConversionCache>,
    config: PipelineConfig,
) -> DocumentSession<TestHost, TestConverter> {
    DocumentSession::with_cache(host, converter, cache, config)
}

/// Vertex buffer shared by the instance scenarios.
pub fn chair() -> Vec<f64> {
    vec![0.0, 0.0, 0.0, 0.5, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 0.5, 0.9]
}
