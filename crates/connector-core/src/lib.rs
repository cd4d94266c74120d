//! # connector-core
//!
//! Core crate for the host connectors. Contains the unified error system,
//! configuration schemas, typed identifiers, the portable object graph
//! that every send produces and every receive consumes, and the capability
//! traits that host integrations implement.
//!
//! This crate has **no** internal dependencies on other connector crates.

pub mod config;
pub mod error;
pub mod graph;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
