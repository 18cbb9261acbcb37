//! # ns-cache
//!
//! Durable identity mapping for notion-sync.
//!
//! Every source entity that has been projected into the remote store is
//! remembered as `"{event_kind}:{source_id}" -> remote_record_id`. The mapping
//! is loaded wholesale at startup and rewritten wholesale after each
//! mutation, so replaying an event resolves to the record created the first
//! time instead of creating a duplicate.
//!
//! ## Key components
//!
//! - [`IdentityCache`] — in-memory mapping bound to its state file
//! - [`cache_key`] — the stable composite key format
//! - [`CacheError`] — persistence failures

pub mod cache;
pub mod error;

pub use cache::{cache_key, IdentityCache};
pub use error::CacheError;
