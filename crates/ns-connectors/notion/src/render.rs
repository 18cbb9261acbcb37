// render.rs — RecordProperties → Notion property objects.

use ns_events::{PropertyField, PropertyValue, RecordProperties};
use serde_json::{json, Map, Value};

/// The database column a field is written to.
pub fn column_name(field: PropertyField) -> &'static str {
    match field {
        PropertyField::Title => "Name",
        PropertyField::Url => "URL",
        PropertyField::State => "State",
        PropertyField::UpdatedAt => "Updated",
        PropertyField::Metadata => "Metadata",
        PropertyField::TypeName => "Type",
        PropertyField::Number => "Number",
    }
}

/// Render every property as `{"<column>": <notion value>}`.
pub fn render_properties(properties: &RecordProperties) -> Value {
    let rendered: Map<String, Value> = properties
        .iter()
        .map(|(field, value)| (column_name(field).to_string(), render_value(value)))
        .collect();
    Value::Object(rendered)
}

fn render_value(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Title(text) => json!({ "title": [{ "text": { "content": text } }] }),
        PropertyValue::Url(url) => json!({ "url": url }),
        PropertyValue::Select(name) => json!({ "select": { "name": name } }),
        PropertyValue::Date(start) => json!({ "date": { "start": start } }),
        PropertyValue::RichText(text) => json!({ "rich_text": [{ "text": { "content": text } }] }),
        PropertyValue::Number(n) => json!({ "number": n }),
    }
}
