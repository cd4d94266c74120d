//! Build-level error type for the conversion pipeline.
//!
//! Per-object failures never appear here: they are recorded as
//! [`ConversionResult::Error`](crate::models::ConversionResult) and the build
//! carries on. `BuildError` covers only what is thrown to the caller.

use connector_core::error::{AppError, ErrorKind};
use thiserror::Error;

use crate::models::ConversionResult;

/// Errors that abort a build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The selection contained no objects.
    #[error("No objects were found to convert")]
    EmptySelection,

    /// Every object in the selection failed to convert.
    #[error("All {failed} objects failed to convert")]
    TotalFailure {
        /// Number of failed objects.
        failed: usize,
        /// Per-object outcomes, all errors.
        results: Vec<ConversionResult>,
    },

    /// The request violated the build contract (e.g. a blank project id).
    #[error("Invalid build request: {reason}")]
    InvalidRequest {
        /// What was wrong with the request.
        reason: String,
    },

    /// The host failed to enumerate its selection.
    #[error("Host enumeration failed: {0}")]
    Source(#[from] AppError),
}

impl BuildError {
    /// Shorthand for an invalid-request error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }
}

impl From<BuildError> for AppError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Source(inner) => inner,
            BuildError::InvalidRequest { .. } => AppError::validation(err.to_string()),
            BuildError::EmptySelection | BuildError::TotalFailure { .. } => {
                AppError::new(ErrorKind::Conversion, err.to_string())
            }
        }
    }
}
