// error.rs — Error types for the sync engine and its collaborators.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a [`RemoteClient`](crate::RemoteClient).
///
/// The engine never propagates these past a single event; they are logged
/// and the event counts as failed.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The remote store rejected the credentials.
    #[error("unauthorized (HTTP {status})")]
    Unauthorized { status: u16 },

    /// The remote store answered with a non-success status.
    #[error("remote API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// The response could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors raised by event handlers and cache persistence.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Persisting the identity cache failed.
    #[error("cache error: {0}")]
    Cache(#[from] ns_cache::CacheError),

    /// A handler could not process its event.
    #[error("handler for '{kind}' failed: {message}")]
    Handler { kind: String, message: String },
}

/// Configuration problems. All of these are fatal before dispatch.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this schema.
    #[error("invalid config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A required credential is missing.
    #[error("{var} environment variable is required for real sync runs")]
    MissingToken { var: &'static str },
}
