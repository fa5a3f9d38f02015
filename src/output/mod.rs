//! Output module for the persisted link catalog
//!
//! This module handles:
//! - Ordering a run's date groups into catalog entries
//! - Writing the catalog file
//! - Reading it back for the comment refresher and the serving API

mod writer;

pub use writer::{build_catalog, load_catalog, write_catalog};

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to encode catalog: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode catalog {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
