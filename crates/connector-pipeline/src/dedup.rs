//! Instance deduplication.
//!
//! Instances whose definition geometry hashes identically share a single
//! [`InstanceDefinition`]; each placement becomes an [`InstanceProxy`]
//! carrying only the definition id and a transform.

use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use connector_core::graph::{InstanceDefinition, InstanceDefinitionProxy, InstanceProxy};
use connector_core::traits::HostObject;
use connector_core::types::{ApplicationId, DefinitionId};

/// A selection split into atomic objects and instance placements.
#[derive(Debug)]
pub struct UnpackedSelection<'a, H> {
    /// Objects that are not instance placements, in input order.
    pub atomic_objects: Vec<&'a H>,
    /// One proxy per placed instance, keyed by the instance's id.
    pub instance_proxies: IndexMap<ApplicationId, InstanceProxy>,
    /// Shared definitions keyed by content hash, each listing its instances.
    pub definition_proxies: IndexMap<DefinitionId, InstanceDefinitionProxy>,
}

impl<H> Default for UnpackedSelection<'_, H> {
    fn default() -> Self {
        Self {
            atomic_objects: Vec::new(),
            instance_proxies: IndexMap::new(),
            definition_proxies: IndexMap::new(),
        }
    }
}

/// Computes definition identity and groups instances under shared definitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstanceDeduplicator;

impl InstanceDeduplicator {
    /// SHA-256 over the raw little-endian bytes of the vertex buffer, hex encoded.
    ///
    /// This is the sole equality criterion for definitions: topology and
    /// material are ignored, and buffers that differ in any bit produce
    /// distinct ids. An empty buffer hashes to the digest of no bytes.
    pub fn compute_content_hash(vertices: &[f64]) -> DefinitionId {
        let mut hasher = Sha256::new();
        for value in vertices {
            hasher.update(value.to_le_bytes());
        }
        DefinitionId::new(hex::encode(hasher.finalize()))
    }

    /// Partition a selection into atomic objects and instance placements.
    ///
    /// The first instance seen for a hash creates its definition; later
    /// instances with the same hash reuse it.
    pub fn unpack_selection<'a, H: HostObject>(objects: &'a [H]) -> UnpackedSelection<'a, H> {
        let mut unpacked = UnpackedSelection::default();

        for object in objects {
            let Some(geometry) = object.instance_geometry() else {
                unpacked.atomic_objects.push(object);
                continue;
            };

            let application_id = object.application_id();
            let definition_id = Self::compute_content_hash(geometry.vertices);

            let definition = unpacked
                .definition_proxies
                .entry(definition_id.clone())
                .or_insert_with(|| {
                    debug!(
                        %definition_id,
                        name = geometry.name,
                        vertex_count = geometry.vertices.len() / 3,
                        "Created instance definition"
                    );
                    InstanceDefinitionProxy::new(InstanceDefinition {
                        id: definition_id.clone(),
                        name: geometry.name.to_string(),
                        vertices: geometry.vertices.to_vec(),
                    })
                });
            definition.add_object(application_id.clone());

            let proxy = InstanceProxy {
                application_id: application_id.clone(),
                definition_id,
                transform: geometry.transform,
            };
            if unpacked
                .instance_proxies
                .insert(application_id.clone(), proxy)
                .is_some()
            {
                warn!(%application_id, "Duplicate application id in selection; keeping last placement");
            }
        }

        debug!(
            atomic = unpacked.atomic_objects.len(),
            instances = unpacked.instance_proxies.len(),
            definitions = unpacked.definition_proxies.len(),
            "Unpacked selection"
        );
        unpacked
    }
}
