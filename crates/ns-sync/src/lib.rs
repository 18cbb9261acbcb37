//! # ns-sync
//!
//! The synchronization engine: classified events in, idempotent upserts out.
//!
//! A [`SyncContext`] owns the remote client, the identity cache, and the
//! routing table. The [`Dispatcher`] walks a batch of events in arrival
//! order, hands each to the handler registered for its kind, and persists the
//! cache right after any event that changed it. One event failing never stops
//! the batch.
//!
//! ## Key components
//!
//! - [`RemoteClient`] — the two-operation capability a transport must provide
//! - [`RoutingTable`] — event kind → destination database
//! - [`SyncConfig`] — layered configuration (defaults, TOML file, environment)
//! - [`SyncContext`] — update-if-known, else create-and-remember
//! - [`Dispatcher`] — per-event isolation and crash-safe persistence
//! - [`DryRunClient`] — logs what would be sent, talks to nobody

pub mod client;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod dry_run;
pub mod error;
pub mod handlers;
pub mod routing;

pub use client::RemoteClient;
pub use config::SyncConfig;
pub use context::{SyncContext, UpsertOutcome};
pub use dispatch::{DispatchReport, Dispatcher, EventOutcome, EventRecord, Handler, SkipReason};
pub use dry_run::DryRunClient;
pub use error::{ConfigError, RemoteError, SyncError};
pub use routing::RoutingTable;
