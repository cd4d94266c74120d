//! Hash command: print the definition id of a vertex buffer.

use clap::Args;

use connector_core::error::AppError;
use connector_pipeline::InstanceDeduplicator;

/// Arguments for the hash command
#[derive(Debug, Args)]
pub struct HashArgs {
    /// Comma-separated vertex coordinates, e.g. `0,0,0,1,0,0`
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, num_args = 0..)]
    pub vertices: Vec<f64>,
}

/// Execute the hash command
pub fn execute(args: &HashArgs) -> Result<(), AppError> {
    println!("{}", InstanceDeduplicator::compute_content_hash(&args.vertices));
    Ok(())
}
