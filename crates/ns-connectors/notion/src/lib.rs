//! # ns-connector-notion
//!
//! Blocking transport for the Notion REST API.
//!
//! [`NotionClient`] implements [`ns_sync::RemoteClient`]: `create` adds a
//! page to a database, `update` patches an existing page's properties.
//! Property values are rendered into Notion's column format by
//! [`render_properties`].

pub mod client;
pub mod render;

pub use client::{NotionClient, NotionClientBuilder};
pub use render::{column_name, render_properties};
