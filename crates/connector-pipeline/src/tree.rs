//! Collection tree assembly.
//!
//! Collections are created lazily, one per unique layer path, and looked up
//! through a path index for the rest of the build. Nodes are held in an
//! arena until the build finishes and are then materialized into nested
//! [`Collection`] values, so no node is ever aliased.

use std::collections::HashMap;

use connector_core::graph::{Collection, GraphNode};
use connector_core::types::LayerPath;

enum Entry {
    Child(usize),
    Node(GraphNode),
}

struct Slot {
    name: String,
    entries: Vec<Entry>,
}

/// Arena-backed builder of a root collection mirroring host layers.
pub(crate) struct CollectionTree {
    slots: Vec<Slot>,
    index: HashMap<LayerPath, usize>,
}

impl CollectionTree {
    /// Start a tree with an empty root named `root_name`.
    pub(crate) fn new(root_name: &str) -> Self {
        Self {
            slots: vec![Slot {
                name: root_name.to_string(),
                entries: Vec::new(),
            }],
            index: HashMap::from([(LayerPath::root(), 0)]),
        }
    }

    /// Slot for `path`, creating it and any missing ancestors.
    fn collection_for(&mut self, path: &LayerPath) -> usize {
        if let Some(&slot) = self.index.get(path) {
            return slot;
        }

        let parent = match path.parent() {
            Some(parent) => self.collection_for(&parent),
            None => 0,
        };

        let slot = self.slots.len();
        self.slots.push(Slot {
            name: path.leaf().unwrap_or_default().to_string(),
            entries: Vec::new(),
        });
        self.slots[parent].entries.push(Entry::Child(slot));
        self.index.insert(path.clone(), slot);
        slot
    }

    /// Place `node` in the collection for `path`.
    pub(crate) fn insert(&mut self, path: &LayerPath, node: GraphNode) {
        let slot = self.collection_for(path);
        self.slots[slot].entries.push(Entry::Node(node));
    }

    /// Number of collections, root included.
    pub(crate) fn collection_count(&self) -> usize {
        self.slots.len()
    }

    /// Materialize into nested collections.
    pub(crate) fn into_root(self) -> Collection {
        let mut slots: Vec<Option<Slot>> = self.slots.into_iter().map(Some).collect();
        Self::materialize(&mut slots, 0)
    }

    fn materialize(slots: &mut [Option<Slot>], index: usize) -> Collection {
        let Some(slot) = slots.get_mut(index).and_then(Option::take) else {
            return Collection::default();
        };

        let mut collection = Collection::new(slot.name);
        for entry in slot.entries {
            match entry {
                Entry::Child(child) => {
                    let child = Self::materialize(slots, child);
                    collection.push(GraphNode::Collection(child));
                }
                Entry::Node(node) => collection.push(node),
            }
        }
        collection
    }
}
