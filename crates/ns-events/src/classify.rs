// classify.rs — Event Classifier: payload → (kind, entity) pairs.
//
// A payload is either one envelope object or an array of them. Each envelope
// names its kind in `event_type`; envelopes without one fall back to the
// batch default. Validation is all-or-nothing: one bad entry rejects the
// whole payload so nothing is dispatched from a half-understood batch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{json_type_name, ClassifyError};
use crate::kind::EventKind;

/// Envelope field carrying the event kind.
pub const EVENT_TYPE_FIELD: &str = "event_type";

/// A classified event, ready for dispatch. Ephemeral: never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    /// Kind name. Canonical for known kinds, verbatim otherwise.
    pub kind: String,
    /// The entity object carried by the event.
    pub entity: Map<String, Value>,
    /// Envelope-level facts about the delivery (`action`, `repository`,
    /// `sender`). Empty when the envelope itself is the entity.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub context: Map<String, Value>,
}

impl NormalizedEvent {
    pub fn new(kind: impl Into<String>, entity: Map<String, Value>) -> Self {
        Self {
            kind: kind.into(),
            entity,
            context: Map::new(),
        }
    }

    /// The known kind, if this event has one.
    pub fn event_kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.kind)
    }
}

/// Parse raw payload text.
pub fn parse_payload(text: &str) -> Result<Value, ClassifyError> {
    Ok(serde_json::from_str(text)?)
}

/// Classify a payload into events, in arrival order.
///
/// `default_kind` applies to every envelope that has no `event_type`.
pub fn classify(
    payload: &Value,
    default_kind: Option<&str>,
) -> Result<Vec<NormalizedEvent>, ClassifyError> {
    let default_kind = default_kind.map(str::trim).filter(|k| !k.is_empty());

    let events = match payload {
        Value::Object(envelope) => vec![classify_envelope(0, envelope, default_kind)?],
        Value::Array(entries) => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| match entry {
                Value::Object(envelope) => classify_envelope(index, envelope, default_kind),
                other => Err(ClassifyError::NotAnObject {
                    index,
                    found: json_type_name(other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => {
            return Err(ClassifyError::InvalidPayload {
                found: json_type_name(other),
            })
        }
    };

    tracing::debug!(events = events.len(), default_kind = ?default_kind, "classified payload");
    Ok(events)
}

fn classify_envelope(
    index: usize,
    envelope: &Map<String, Value>,
    default_kind: Option<&str>,
) -> Result<NormalizedEvent, ClassifyError> {
    let explicit = match envelope.get(EVENT_TYPE_FIELD) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim()),
        Some(other) => {
            return Err(ClassifyError::InvalidKind {
                index,
                found: json_type_name(other),
            })
        }
    };

    let raw_kind = explicit
        .or(default_kind)
        .ok_or(ClassifyError::MissingKind { index })?;

    let known = EventKind::parse(raw_kind);
    if known.is_none() {
        tracing::debug!(index, kind = raw_kind, "envelope has no built-in kind");
    }
    let kind = known.map_or_else(|| raw_kind.to_string(), |k| k.as_str().to_string());
    let (entity, context) = extract_entity(known, envelope);

    Ok(NormalizedEvent {
        kind,
        entity,
        context,
    })
}

/// The entity object for a kind plus its delivery context, or the envelope
/// itself when the kind's payload key is absent.
fn extract_entity(
    kind: Option<EventKind>,
    envelope: &Map<String, Value>,
) -> (Map<String, Value>, Map<String, Value>) {
    let nested = kind.and_then(|k| {
        k.payload_keys()
            .iter()
            .find_map(|key| envelope.get(*key).and_then(Value::as_object))
    });

    match nested {
        Some(entity) => (entity.clone(), delivery_context(envelope)),
        None => {
            let mut entity = envelope.clone();
            entity.remove(EVENT_TYPE_FIELD);
            (entity, Map::new())
        }
    }
}

fn delivery_context(envelope: &Map<String, Value>) -> Map<String, Value> {
    let mut context = Map::new();
    let fields = [
        ("action", envelope.get("action")),
        ("repository", envelope.get("repository").and_then(|r| r.get("full_name"))),
        ("sender", envelope.get("sender").and_then(|s| s.get("login"))),
    ];
    for (key, value) in fields {
        if let Some(Value::String(s)) = value {
            context.insert(key.to_string(), Value::String(s.clone()));
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn single_envelope_with_explicit_kind() {
        let payload = json!({"event_type": "issues", "issue": {"id": 1, "title": "Bug"}});
        let events = classify(&payload, None).unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, "issues");
        assert_eq!(events[0].entity.get("title"), Some(&json!("Bug")));
        assert_eq!(events[0].event_kind(), Some(EventKind::Issues));
        assert!(events[0].context.is_empty());
    }

    #[test]
    fn delivery_context_is_captured() {
        let payload = json!({
            "event_type": "issues",
            "action": "opened",
            "repository": {"full_name": "octo/repo", "id": 3},
            "sender": {"login": "octocat"},
            "issue": {"id": 1}
        });
        let events = classify(&payload, None).unwrap();

        assert_eq!(
            Value::Object(events[0].context.clone()),
            json!({"action": "opened", "repository": "octo/repo", "sender": "octocat"})
        );
    }

    #[test]
    fn default_kind_fills_missing_event_type() {
        let payload = json!([
            {"pull_request": {"id": 5}},
            {"event_type": "issues", "issue": {"id": 6}}
        ]);
        let events = classify(&payload, Some("pull_request")).unwrap();

        assert_eq!(events[0].kind, "pull_request");
        assert_eq!(events[1].kind, "issues");
    }

    #[test]
    fn alias_is_canonicalized() {
        let payload = json!({"event_type": "projects_v2", "projects_v2": {"node_id": "PVT_1"}});
        let events = classify(&payload, None).unwrap();

        assert_eq!(events[0].kind, "project");
        assert_eq!(events[0].entity.get("node_id"), Some(&json!("PVT_1")));
    }

    #[test]
    fn envelope_is_entity_when_payload_key_absent() {
        let payload = json!({"event_type": "issues", "id": 9, "title": "Flat"});
        let events = classify(&payload, None).unwrap();

        assert_eq!(events[0].entity.get("id"), Some(&json!(9)));
        assert!(!events[0].entity.contains_key(EVENT_TYPE_FIELD));
    }

    #[test]
    fn unknown_kind_is_kept_verbatim() {
        let payload = json!({"event_type": "push", "ref": "refs/heads/main"});
        let events = classify(&payload, None).unwrap();

        assert_eq!(events[0].kind, "push");
        assert_eq!(events[0].event_kind(), None);
    }

    #[test]
    fn missing_kind_without_default_fails() {
        let payload = json!([
            {"event_type": "issues", "issue": {"id": 1}},
            {"issue": {"id": 2}}
        ]);
        let err = classify(&payload, None).unwrap_err();
        assert!(matches!(err, ClassifyError::MissingKind { index: 1 }));
    }

    #[test]
    fn blank_default_counts_as_missing() {
        let payload = json!({"issue": {"id": 2}});
        let err = classify(&payload, Some("  ")).unwrap_err();
        assert!(matches!(err, ClassifyError::MissingKind { index: 0 }));
    }

    #[test]
    fn non_object_entry_fails() {
        let payload = json!([{"event_type": "issues"}, 42]);
        let err = classify(&payload, None).unwrap_err();
        assert!(matches!(err, ClassifyError::NotAnObject { index: 1, found: "number" }));
    }

    #[test]
    fn scalar_payload_fails() {
        let err = classify(&json!("issues"), None).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidPayload { found: "string" }));
    }

    #[test]
    fn non_string_event_type_fails() {
        let err = classify(&json!({"event_type": 3}), None).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidKind { index: 0, .. }));
    }

    #[test]
    fn empty_array_is_an_empty_batch() {
        assert!(classify(&json!([]), None).unwrap().is_empty());
    }

    #[test]
    fn parse_payload_rejects_bad_json() {
        assert!(matches!(parse_payload("{not json"), Err(ClassifyError::Json(_))));
    }
}
