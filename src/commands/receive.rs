//! Receive command: unpack a root graph the way a host baking stage would.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use connector_core::error::AppError;
use connector_core::graph::{Collection, GraphNode};
use connector_pipeline::{RootObjectUnpacker, TraversalContext};

/// Arguments for the receive command
#[derive(Debug, Args)]
pub struct ReceiveArgs {
    /// Root collection (JSON) produced by `send --out`
    #[arg(long)]
    pub root: PathBuf,
}

/// One row per node to bake
#[derive(Debug, Serialize, Tabled)]
struct ObjectRow {
    /// Layer path the node is baked on
    layer: String,
    /// Node kind
    node_type: String,
    /// Host object ID
    application_id: String,
    /// Content, reference, or definition ID
    target: String,
}

impl From<&TraversalContext<'_>> for ObjectRow {
    fn from(context: &TraversalContext<'_>) -> Self {
        let (node_type, target) = match context.node {
            GraphNode::Object(object) => ("object", object.content_id()),
            GraphNode::Reference(reference) => ("reference", reference.referenced_id.clone()),
            GraphNode::Instance(instance) => ("instance", instance.definition_id.to_string()),
            GraphNode::Collection(collection) => ("collection", collection.name.clone()),
        };
        let layer = context.to_layer_path();

        Self {
            layer: if layer.is_root() {
                "(root)".to_string()
            } else {
                layer.to_string()
            },
            node_type: node_type.to_string(),
            application_id: context
                .node
                .application_id()
                .map(ToString::to_string)
                .unwrap_or_default(),
            target,
        }
    }
}

fn count<T>(table: Option<&[T]>) -> String {
    table.map_or_else(|| "absent".to_string(), |t| t.len().to_string())
}

/// Execute the receive command
pub async fn execute(args: &ReceiveArgs, format: OutputFormat) -> Result<(), AppError> {
    let content = tokio::fs::read(&args.root).await?;
    let root: Collection = serde_json::from_slice(&content)?;

    let unpacked = RootObjectUnpacker::unpack(&root);
    let rows: Vec<ObjectRow> = unpacked.objects.iter().map(ObjectRow::from).collect();
    output::print_list(&rows, format);

    if format == OutputFormat::Table {
        output::print_kv("Instance definitions", &count(unpacked.instance_definitions.as_deref()));
        output::print_kv("Groups", &count(unpacked.groups.as_deref()));
        output::print_kv("Render materials", &count(unpacked.render_materials.as_deref()));
        output::print_kv("Colors", &count(unpacked.colors.as_deref()));
        output::print_kv("Property sets", &count(unpacked.property_sets.as_deref()));
        for orphan in &unpacked.orphans {
            output::print_warning(&format!(
                "{} references missing object '{}'",
                orphan.key, orphan.application_id
            ));
        }
    }

    Ok(())
}
