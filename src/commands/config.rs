//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use crate::output;
use connector_core::config::AppConfig;
use connector_core::error::AppError;

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration
    Show,
    /// Validate the configuration
    Validate,
}

/// Execute config commands
pub fn execute(args: &ConfigArgs, config: &AppConfig) -> Result<(), AppError> {
    match &args.command {
        ConfigCommand::Show => output::print_json(config),
        ConfigCommand::Validate => {
            output::print_success("Configuration is valid");
            output::print_kv("Cache", &config.cache.provider);
            output::print_kv("Concurrency", &config.pipeline.concurrency.to_string());
            output::print_kv("Root name", &config.pipeline.root_name);
            output::print_kv("Log level", &config.logging.level);
        }
    }
    Ok(())
}
