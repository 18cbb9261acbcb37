//! # ns-events
//!
//! Turns raw lifecycle event payloads into records ready for the remote store.
//!
//! ## Flow
//!
//! 1. [`parse_payload`] + [`classify`] split a payload (one envelope or an
//!    array of them) into [`NormalizedEvent`]s, each tagged with its kind
//! 2. [`entity_identifier`] resolves the stable source id of an entity
//! 3. [`build_properties`] extracts a [`RecordProperties`] set for the kind
//!
//! Everything in this crate is pure: no I/O, no remote calls.

pub mod classify;
pub mod entity;
pub mod error;
pub mod kind;
pub mod properties;

pub use classify::{classify, parse_payload, NormalizedEvent};
pub use entity::entity_identifier;
pub use error::ClassifyError;
pub use kind::EventKind;
pub use properties::{
    build_properties, truncate_text, PropertyField, PropertyValue, RecordProperties, ELLIPSIS,
    MAX_TEXT_LEN,
};
