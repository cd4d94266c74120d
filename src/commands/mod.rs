//! CLI command definitions and dispatch.

pub mod config;
pub mod hash;
pub mod receive;
pub mod send;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use connector_core::config::AppConfig;
use connector_core::error::AppError;

/// Connector: send/receive conversion pipeline
#[derive(Debug, Parser)]
#[command(name = "connector", version, about, long_about = None)]
pub struct Cli {
    /// Directory holding `default.toml` and environment overlays
    #[arg(short, long, default_value = "config", env = "CONNECTOR_CONFIG_DIR")]
    pub config_dir: String,

    /// Environment overlay to apply (`{config_dir}/{env}.toml`)
    #[arg(short, long, default_value = "development", env = "CONNECTOR_ENV")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Build a root graph from a host fixture
    Send(send::SendArgs),
    /// Unpack a root graph and list what a host would bake
    Receive(receive::ReceiveArgs),
    /// Print the instance definition id of a vertex buffer
    Hash(hash::HashArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Load the merged configuration this invocation runs with.
    pub fn load_config(&self) -> Result<AppConfig, AppError> {
        AppConfig::load(&self.config_dir, &self.env)
    }

    /// Execute the CLI command
    pub async fn execute(&self, config: AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Send(args) => send::execute(args, &config, self.format).await,
            Commands::Receive(args) => receive::execute(args, self.format).await,
            Commands::Hash(args) => hash::execute(args),
            Commands::Config(args) => config::execute(args, &config),
        }
    }
}
