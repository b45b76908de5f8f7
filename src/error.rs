//! Error types for replan
//!
//! The optimizer core has no fatal errors; these cover the surfaces around it
//! (seed loading, input files, the HTTP server).

use thiserror::Error;

use crate::store::StoreError;

/// Main error type for replan operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type alias for replan operations
pub type Result<T> = std::result::Result<T, Error>;
