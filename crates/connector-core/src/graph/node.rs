//! Graph nodes and collections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::proxy::{InstanceProxy, ProxyValue};
use super::reference::ObjectReference;
use crate::types::ApplicationId;

/// One node of the object graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "nodeType", rename_all = "camelCase")]
pub enum GraphNode {
    /// A container mirroring a host layer or group.
    Collection(Collection),
    /// A freshly converted host object.
    Object(DataObject),
    /// A previously uploaded object reused from the conversion cache.
    Reference(ObjectReference),
    /// One placement of a shared instance definition.
    Instance(InstanceProxy),
}

impl GraphNode {
    /// Host id of the object this node stands for. Collections have none.
    pub fn application_id(&self) -> Option<&ApplicationId> {
        match self {
            Self::Collection(c) => c.application_id.as_ref(),
            Self::Object(o) => o.application_id.as_ref(),
            Self::Reference(r) => r.application_id.as_ref(),
            Self::Instance(i) => Some(&i.application_id),
        }
    }

    /// Whether this node is a collection.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// Borrow as a collection.
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }
}

/// A converted host object.
///
/// `properties` holds whatever the host converter produced (geometry,
/// display values, user attributes). The pipeline never interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataObject {
    /// Host id of the source object.
    pub application_id: Option<ApplicationId>,
    /// Host type name of the source object (e.g. `"Brep"`, `"BlockReference"`).
    pub source_type: String,
    /// Converter output.
    #[serde(default)]
    pub properties: serde_json::Value,
}

impl DataObject {
    /// Create an untagged object.
    pub fn new(source_type: impl Into<String>, properties: serde_json::Value) -> Self {
        Self {
            application_id: None,
            source_type: source_type.into(),
            properties,
        }
    }

    /// Tag with the host id it was converted from.
    pub fn with_application_id(mut self, application_id: ApplicationId) -> Self {
        self.application_id = Some(application_id);
        self
    }

    /// Content-derived id: hex SHA-256 of the object's canonical JSON.
    ///
    /// `serde_json` maps are ordered, so equal objects always hash equally.
    pub fn content_id(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        hex::encode(Sha256::digest(&bytes))
    }

    /// Reference to this object once uploaded.
    pub fn to_reference(&self) -> ObjectReference {
        ObjectReference::new(self.content_id(), self.application_id.clone())
    }
}

/// A named container of graph nodes.
///
/// `elements` holds converted objects and nested collections in insertion
/// order. Proxy tables are only populated on the root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    /// Display name (the layer or group name).
    pub name: String,
    /// Host id of the layer, when the host has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,
    /// Child collections and objects.
    #[serde(default)]
    pub elements: Vec<GraphNode>,
    /// Proxy side-tables keyed by their well-known names.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub proxies: BTreeMap<String, Vec<ProxyValue>>,
}

impl Collection {
    /// Create an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append an element.
    pub fn push(&mut self, node: GraphNode) {
        self.elements.push(node);
    }

    /// Nested collections, in order.
    pub fn children(&self) -> impl Iterator<Item = &Collection> {
        self.elements.iter().filter_map(GraphNode::as_collection)
    }

    /// Find a direct child collection by name.
    pub fn child(&self, name: &str) -> Option<&Collection> {
        self.children().find(|c| c.name == name)
    }

    /// Non-collection elements, in order.
    pub fn objects(&self) -> impl Iterator<Item = &GraphNode> {
        self.elements.iter().filter(|n| !n.is_collection())
    }

    /// Attach a proxy table under `key`, replacing any previous table.
    pub fn attach_proxies(&mut self, key: impl Into<String>, table: Vec<ProxyValue>) {
        self.proxies.insert(key.into(), table);
    }

    /// Proxy table stored under `key`, if present.
    pub fn proxy_table(&self, key: &str) -> Option<&[ProxyValue]> {
        self.proxies.get(key).map(Vec::as_slice)
    }
}
