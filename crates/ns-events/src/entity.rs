// entity.rs — Field access helpers over raw entity objects.

use serde_json::{Map, Value};

/// Identifier fields, in priority order: global node id, numeric id,
/// sequence number, name.
pub const IDENTIFIER_FIELDS: [&str; 4] = ["node_id", "id", "number", "name"];

/// Resolve the stable source identifier of an entity.
///
/// The first identifier field holding a non-empty string or a number wins.
/// `None` means the entity cannot be mapped and must be skipped.
pub fn entity_identifier(entity: &Map<String, Value>) -> Option<String> {
    IDENTIFIER_FIELDS
        .iter()
        .find_map(|field| match entity.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
}

/// Follow a path of object keys.
pub(crate) fn lookup<'a>(entity: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter()
        .try_fold(entity.get(*first)?, |value, key| value.get(*key))
}

/// A non-empty string at `path`.
pub(crate) fn string_at(entity: &Map<String, Value>, path: &[&str]) -> Option<String> {
    match lookup(entity, path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Any non-null value at `path`.
pub(crate) fn value_at(entity: &Map<String, Value>, path: &[&str]) -> Option<Value> {
    lookup(entity, path).filter(|v| !v.is_null()).cloned()
}

/// The `name`s of an array of label objects (`[{"name": "bug"}, ...]`).
pub(crate) fn names_at(entity: &Map<String, Value>, path: &[&str], field: &str) -> Option<Value> {
    let names: Vec<Value> = lookup(entity, path)?
        .as_array()?
        .iter()
        .filter_map(|item| item.get(field).and_then(Value::as_str))
        .map(|s| Value::String(s.to_string()))
        .collect();
    (!names.is_empty()).then_some(Value::Array(names))
}
