//! Send command: build a root graph from a host fixture.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::fixture::{FixtureConverter, FixtureHost};
use crate::output::{self, OutputFormat};
use connector_core::config::AppConfig;
use connector_core::error::AppError;
use connector_pipeline::{
    BuildError, BuildOutcome, BuildProgress, BuildRequest, ConversionResult, DocumentSession,
};

/// Arguments for the send command
#[derive(Debug, Args)]
pub struct SendArgs {
    /// Host fixture (JSON) describing the selection
    #[arg(long)]
    pub fixture: PathBuf,

    /// Target project ID
    #[arg(short, long)]
    pub project: String,

    /// Model card (unit of work) ID
    #[arg(short, long, default_value = "default")]
    pub unit: String,

    /// Conversion setting as `id=value`; values are parsed as JSON when possible
    #[arg(short, long = "setting")]
    pub settings: Vec<String>,

    /// Write the root collection to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Send the selection this many times in one session
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub passes: u32,
}

/// One row per selected object
#[derive(Debug, Serialize, Tabled)]
struct ResultRow {
    /// Host object ID
    application_id: String,
    /// Host type
    source_type: String,
    /// success / error
    status: String,
    /// Kind of node produced
    result_type: String,
    /// Result ID or error message
    detail: String,
}

impl From<&ConversionResult> for ResultRow {
    fn from(result: &ConversionResult) -> Self {
        match result {
            ConversionResult::Success {
                application_id,
                source_type,
                result_id,
                result_type,
                from_cache,
            } => Self {
                application_id: application_id.to_string(),
                source_type: source_type.clone(),
                status: if *from_cache { "cached" } else { "success" }.to_string(),
                result_type: result_type.clone(),
                detail: result_id.clone(),
            },
            ConversionResult::Error {
                application_id,
                source_type,
                error,
            } => Self {
                application_id: application_id.to_string(),
                source_type: source_type.clone(),
                status: "error".to_string(),
                result_type: "-".to_string(),
                detail: error.to_string(),
            },
        }
    }
}

/// Parse `id=value`, reading the value as JSON and falling back to a string.
fn parse_setting(raw: &str) -> Result<(String, serde_json::Value), AppError> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| AppError::validation(format!("Setting '{raw}' must be id=value")))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(AppError::validation(format!("Setting '{raw}' has no id")));
    }
    let value = serde_json::from_str(value.trim())
        .unwrap_or_else(|_| serde_json::Value::String(value.trim().to_string()));
    Ok((id.to_string(), value))
}

fn print_results(results: &[ConversionResult], format: OutputFormat) {
    let rows: Vec<ResultRow> = results.iter().map(ResultRow::from).collect();
    output::print_list(&rows, format);
}

/// Execute the send command
pub async fn execute(
    args: &SendArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let host = Arc::new(FixtureHost::load(&args.fixture).await?);
    let session = DocumentSession::new(
        host,
        Arc::new(FixtureConverter),
        &config.cache,
        config.pipeline.clone(),
    )?;

    let mut request = BuildRequest::new(args.project.as_str(), args.unit.as_str());
    for raw in &args.settings {
        let (id, value) = parse_setting(raw)?;
        request = request.with_setting(id, value);
    }

    let cancel = CancellationToken::new();
    let watcher = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let progress = |p: BuildProgress| {
        debug!(state = %p.state, current = p.current, total = p.total, "Send progress");
    };

    let mut outcome = None;
    for pass in 1..=args.passes {
        debug!(pass, "Starting send");
        match session.send(&request, &cancel, &progress).await {
            Ok(result) => {
                let cancelled = result.is_cancelled();
                outcome = Some(result);
                if cancelled {
                    break;
                }
            }
            Err(BuildError::TotalFailure { failed, results }) => {
                watcher.abort();
                print_results(&results, format);
                return Err(AppError::conversion(format!(
                    "All {failed} objects failed to convert"
                )));
            }
            Err(e) => {
                watcher.abort();
                return Err(e.into());
            }
        }
    }
    watcher.abort();

    match outcome {
        Some(BuildOutcome::Completed(build)) => {
            print_results(&build.results, format);

            if let Some(path) = &args.out {
                let json = serde_json::to_vec_pretty(&build.root)?;
                tokio::fs::write(path, json).await?;
            }

            if format == OutputFormat::Table {
                let metrics = session.metrics();
                output::print_success(&format!(
                    "Build {} completed: {} succeeded, {} failed",
                    build.build_id,
                    build.success_count(),
                    build.error_count()
                ));
                output::print_kv("Cache hits", &build.cache_hits.to_string());
                output::print_kv("Objects converted", &metrics.objects_converted.to_string());
                if let Some(path) = &args.out {
                    output::print_kv("Root written to", &path.display().to_string());
                }
            }
        }
        Some(BuildOutcome::Cancelled { results }) => {
            print_results(&results, format);
            output::print_warning("Send cancelled; nothing was cached");
        }
        None => {}
    }

    session.close().await;
    Ok(())
}
