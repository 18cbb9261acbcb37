// error.rs — Error types for payload parsing and classification.

use thiserror::Error;

/// Validation failures that reject a payload before anything is dispatched.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The payload text is not valid JSON.
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top-level payload is neither an object nor an array.
    #[error("payload must be an event object or an array of event objects, found {found}")]
    InvalidPayload { found: &'static str },

    /// An array entry is not an object.
    #[error("event at index {index} must be an object, found {found}")]
    NotAnObject { index: usize, found: &'static str },

    /// No `event_type` on the envelope and no default kind for the batch.
    #[error("event at index {index} has no event_type and no default event type was given")]
    MissingKind { index: usize },

    /// `event_type` is present but not a string.
    #[error("event at index {index} has a non-string event_type ({found})")]
    InvalidKind { index: usize, found: &'static str },
}

/// JSON type name used in error messages.
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
