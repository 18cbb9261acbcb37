// error.rs — Error types for identity cache persistence.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting the identity cache.
///
/// Loading never fails: an unreadable state file is reported as a warning
/// and treated as a cold start.
#[derive(Debug, Error)]
pub enum CacheError {
    /// A file I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to serialize the mapping.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
