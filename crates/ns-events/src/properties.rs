// properties.rs — Property Builder: raw entity → RecordProperties.
//
// Each event kind has its own extraction rule deciding which raw fields feed
// the title, url, state, updated_at, number and metadata of the record. The
// assembly step afterwards is shared: defaults, state normalization, and
// truncation to the remote store's text limits.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Number, Value};

use crate::entity::{names_at, string_at, value_at};
use crate::kind::EventKind;

/// Maximum characters in a text property (Notion rich-text limit).
pub const MAX_TEXT_LEN: usize = 2000;

/// Marker appended to truncated text.
pub const ELLIPSIS: char = '…';

const UNTITLED: &str = "Untitled";
const UNKNOWN_STATE: &str = "Unknown";

/// Named fields a record can carry, in their canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyField {
    Title,
    Url,
    State,
    UpdatedAt,
    Metadata,
    TypeName,
    Number,
}

impl PropertyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyField::Title => "title",
            PropertyField::Url => "url",
            PropertyField::State => "state",
            PropertyField::UpdatedAt => "updated_at",
            PropertyField::Metadata => "metadata",
            PropertyField::TypeName => "type_name",
            PropertyField::Number => "number",
        }
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Title(String),
    Url(String),
    Select(String),
    /// ISO-8601 date or datetime, used as the start of a date range.
    Date(String),
    RichText(String),
    Number(Number),
}

impl PropertyValue {
    /// The textual content, for every variant except numbers.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Title(s)
            | PropertyValue::Url(s)
            | PropertyValue::Select(s)
            | PropertyValue::Date(s)
            | PropertyValue::RichText(s) => Some(s),
            PropertyValue::Number(_) => None,
        }
    }
}

/// Ordered, immutable set of record properties.
///
/// Built by [`build_properties`] or through the consuming `with_*` methods;
/// there is no way to mutate a value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordProperties {
    fields: Vec<(PropertyField, PropertyValue)>,
}

impl RecordProperties {
    /// A record with only a title. Empty titles become `"Untitled"`.
    pub fn new(title: &str) -> Self {
        let title = if title.trim().is_empty() { UNTITLED } else { title };
        Self {
            fields: vec![(
                PropertyField::Title,
                PropertyValue::Title(truncate_text(title, MAX_TEXT_LEN)),
            )],
        }
    }

    pub fn with_url(self, url: impl Into<String>) -> Self {
        self.with(PropertyField::Url, PropertyValue::Url(url.into()))
    }

    pub fn with_state(self, state: impl Into<String>) -> Self {
        self.with(PropertyField::State, PropertyValue::Select(state.into()))
    }

    pub fn with_updated_at(self, updated_at: impl Into<String>) -> Self {
        self.with(PropertyField::UpdatedAt, PropertyValue::Date(updated_at.into()))
    }

    pub fn with_metadata(self, text: &str) -> Self {
        self.with(
            PropertyField::Metadata,
            PropertyValue::RichText(truncate_text(text, MAX_TEXT_LEN)),
        )
    }

    pub fn with_type_name(self, type_name: impl Into<String>) -> Self {
        self.with(PropertyField::TypeName, PropertyValue::Select(type_name.into()))
    }

    pub fn with_number(self, number: Number) -> Self {
        self.with(PropertyField::Number, PropertyValue::Number(number))
    }

    /// Set `field`, replacing any previous value and keeping canonical order.
    fn with(mut self, field: PropertyField, value: PropertyValue) -> Self {
        match self.fields.iter().position(|(f, _)| *f >= field) {
            Some(i) if self.fields[i].0 == field => self.fields[i].1 = value,
            Some(i) => self.fields.insert(i, (field, value)),
            None => self.fields.push((field, value)),
        }
        self
    }

    pub fn get(&self, field: PropertyField) -> Option<&PropertyValue> {
        self.fields.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    /// Text content of `field`, if present and textual.
    pub fn text(&self, field: PropertyField) -> Option<&str> {
        self.get(field).and_then(PropertyValue::as_text)
    }

    pub fn title(&self) -> &str {
        self.text(PropertyField::Title).unwrap_or(UNTITLED)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyField, &PropertyValue)> {
        self.fields.iter().map(|(f, v)| (*f, v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for RecordProperties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            match value {
                PropertyValue::Number(n) => map.serialize_entry(field.as_str(), n)?,
                other => map.serialize_entry(field.as_str(), other.as_text().unwrap_or_default())?,
            }
        }
        map.end()
    }
}

/// Truncate `value` to at most `max` characters.
///
/// Longer values keep their first `max - 1` characters followed by
/// [`ELLIPSIS`], so the result is exactly `max` characters long.
pub fn truncate_text(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
    out.push(ELLIPSIS);
    out
}

/// Build the record properties for an entity of `kind`.
///
/// `extra` is merged over the kind-specific metadata before serialization.
pub fn build_properties(
    kind: EventKind,
    entity: &Map<String, Value>,
    extra: Option<&Map<String, Value>>,
) -> RecordProperties {
    let extracted = match kind {
        EventKind::Issues => extract_issue(entity),
        EventKind::PullRequest => extract_pull_request(entity),
        EventKind::Discussion => extract_discussion(entity),
        EventKind::Project => extract_project(entity),
        EventKind::WorkflowRun => extract_workflow_run(entity),
    };
    assemble(kind, extracted, extra)
}

/// Raw values pulled from an entity before normalization.
struct Extracted {
    title: Option<String>,
    url: Option<String>,
    /// `None`: no state field. `Some(None)`: present but falsy.
    state: Option<Option<String>>,
    updated_at: Option<String>,
    number: Option<Number>,
    metadata: Map<String, Value>,
}

impl Extracted {
    fn common(entity: &Map<String, Value>, title_keys: &[&str]) -> Self {
        Self {
            title: title_keys.iter().find_map(|k| string_at(entity, &[*k])),
            url: string_at(entity, &["html_url"]),
            state: state_field(entity, "state"),
            updated_at: string_at(entity, &["updated_at"]),
            number: number_at(entity, "number"),
            metadata: Map::new(),
        }
    }

    fn meta(&mut self, key: &str, value: Option<Value>) {
        if let Some(value) = value {
            self.metadata.insert(key.to_string(), value);
        }
    }
}

fn extract_issue(entity: &Map<String, Value>) -> Extracted {
    let mut e = Extracted::common(entity, &["title"]);
    e.meta("author", value_at(entity, &["user", "login"]));
    e.meta("labels", names_at(entity, &["labels"], "name"));
    e.meta("assignees", names_at(entity, &["assignees"], "login"));
    e.meta("comments", value_at(entity, &["comments"]));
    e
}

fn extract_pull_request(entity: &Map<String, Value>) -> Extracted {
    let mut e = Extracted::common(entity, &["title"]);
    if entity.get("merged") == Some(&Value::Bool(true)) {
        e.state = Some(Some("merged".to_string()));
    }
    e.meta("author", value_at(entity, &["user", "login"]));
    e.meta("head", value_at(entity, &["head", "ref"]));
    e.meta("base", value_at(entity, &["base", "ref"]));
    e.meta("draft", value_at(entity, &["draft"]));
    e.meta("labels", names_at(entity, &["labels"], "name"));
    e
}

fn extract_discussion(entity: &Map<String, Value>) -> Extracted {
    let mut e = Extracted::common(entity, &["title"]);
    e.meta("author", value_at(entity, &["user", "login"]));
    e.meta("category", value_at(entity, &["category", "name"]));
    e.meta("answer_url", value_at(entity, &["answer_html_url"]));
    e.meta("comments", value_at(entity, &["comments"]));
    e
}

fn extract_project(entity: &Map<String, Value>) -> Extracted {
    let mut e = Extracted::common(entity, &["title", "name"]);
    e.meta("owner", value_at(entity, &["owner", "login"]));
    e.meta("description", value_at(entity, &["short_description"]));
    e.meta("body", value_at(entity, &["body"]));
    e
}

fn extract_workflow_run(entity: &Map<String, Value>) -> Extracted {
    let mut e = Extracted::common(entity, &["display_title", "name"]);
    e.number = number_at(entity, "run_number");
    e.state = match string_at(entity, &["conclusion"]) {
        Some(conclusion) => Some(Some(conclusion)),
        None => state_field(entity, "status").or_else(|| {
            entity.contains_key("conclusion").then_some(None)
        }),
    };
    e.meta("workflow", value_at(entity, &["name"]));
    e.meta("event", value_at(entity, &["event"]));
    e.meta("branch", value_at(entity, &["head_branch"]));
    e.meta("sha", value_at(entity, &["head_sha"]));
    e.meta("attempt", value_at(entity, &["run_attempt"]));
    e.meta("status", value_at(entity, &["status"]));
    e
}

fn assemble(
    kind: EventKind,
    extracted: Extracted,
    extra: Option<&Map<String, Value>>,
) -> RecordProperties {
    let mut props = RecordProperties::new(extracted.title.as_deref().unwrap_or(UNTITLED));

    if let Some(url) = extracted.url {
        props = props.with_url(url);
    }
    if let Some(state) = extracted.state {
        let state = state.map_or_else(|| UNKNOWN_STATE.to_string(), |s| title_case(&s));
        props = props.with_state(state);
    }
    if let Some(updated_at) = extracted.updated_at {
        props = props.with_updated_at(updated_at);
    }

    let mut metadata = extracted.metadata;
    if let Some(extra) = extra {
        for (key, value) in extra {
            metadata.insert(key.clone(), value.clone());
        }
    }
    if !metadata.is_empty() {
        props = props.with_metadata(&metadata_text(&Value::Object(metadata)));
    }

    props = props.with_type_name(kind.type_name());
    if let Some(number) = extracted.number {
        props = props.with_number(number);
    }
    props
}

/// State field as seen by the builder: absent, present-but-falsy, or a value.
fn state_field(entity: &Map<String, Value>, key: &str) -> Option<Option<String>> {
    match entity.get(key)? {
        Value::Null | Value::Bool(false) => Some(None),
        Value::String(s) if s.trim().is_empty() => Some(None),
        Value::String(s) => Some(Some(s.trim().to_string())),
        other => Some(Some(other.to_string())),
    }
}

fn number_at(entity: &Map<String, Value>, key: &str) -> Option<Number> {
    entity.get(key).and_then(Value::as_number).cloned()
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_alpha = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Pretty JSON with recursively sorted keys.
fn metadata_text(value: &Value) -> String {
    let sorted = sort_keys(value);
    serde_json::to_string_pretty(&sorted).unwrap_or_else(|_| sorted.to_string())
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), sort_keys(&map[key]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn title_defaults_to_untitled() {
        let props = build_properties(EventKind::Issues, &obj(json!({"id": 1})), None);
        assert_eq!(props.title(), "Untitled");

        let props = build_properties(EventKind::Issues, &obj(json!({"title": ""})), None);
        assert_eq!(props.title(), "Untitled");
    }

    #[test]
    fn optional_fields_only_when_present() {
        let props = build_properties(EventKind::Issues, &obj(json!({"title": "Bug"})), None);
        assert!(props.get(PropertyField::Url).is_none());
        assert!(props.get(PropertyField::State).is_none());
        assert!(props.get(PropertyField::UpdatedAt).is_none());
        assert!(props.get(PropertyField::Metadata).is_none());
        assert_eq!(props.text(PropertyField::TypeName), Some("Issue"));
    }

    #[test]
    fn issue_fields_are_extracted() {
        let entity = obj(json!({
            "id": 1,
            "number": 42,
            "title": "Bug",
            "state": "open",
            "html_url": "https://github.com/o/r/issues/42",
            "updated_at": "2024-05-01T12:00:00Z",
            "user": {"login": "octocat"},
            "labels": [{"name": "bug"}]
        }));
        let props = build_properties(EventKind::Issues, &entity, None);

        assert_eq!(props.title(), "Bug");
        assert_eq!(props.text(PropertyField::State), Some("Open"));
        assert_eq!(
            props.get(PropertyField::Url),
            Some(&PropertyValue::Url("https://github.com/o/r/issues/42".into()))
        );
        assert_eq!(
            props.get(PropertyField::UpdatedAt),
            Some(&PropertyValue::Date("2024-05-01T12:00:00Z".into()))
        );
        assert_eq!(
            props.get(PropertyField::Number),
            Some(&PropertyValue::Number(42.into()))
        );
        let meta = props.text(PropertyField::Metadata).unwrap();
        assert!(meta.contains("\"author\": \"octocat\""));
        assert!(meta.contains("\"bug\""));
    }

    #[test]
    fn falsy_state_becomes_unknown() {
        for state in [json!(null), json!(""), json!(false)] {
            let props = build_properties(EventKind::Issues, &obj(json!({"state": state})), None);
            assert_eq!(props.text(PropertyField::State), Some("Unknown"));
        }
    }

    #[test]
    fn state_is_title_cased() {
        assert_eq!(title_case("open"), "Open");
        assert_eq!(title_case("in_progress"), "In_Progress");
        assert_eq!(title_case("CLOSED"), "Closed");
        assert_eq!(title_case("timed out"), "Timed Out");
    }

    #[test]
    fn merged_pull_request_state() {
        let merged = obj(json!({"title": "Feat", "state": "closed", "merged": true}));
        let props = build_properties(EventKind::PullRequest, &merged, None);
        assert_eq!(props.text(PropertyField::State), Some("Merged"));

        let closed = obj(json!({"title": "Feat", "state": "closed", "merged": false}));
        let props = build_properties(EventKind::PullRequest, &closed, None);
        assert_eq!(props.text(PropertyField::State), Some("Closed"));
        assert_eq!(props.text(PropertyField::TypeName), Some("Pull Request"));
    }

    #[test]
    fn workflow_run_prefers_conclusion_then_status() {
        let done = obj(json!({"name": "CI", "status": "completed", "conclusion": "success", "run_number": 17}));
        let props = build_properties(EventKind::WorkflowRun, &done, None);
        assert_eq!(props.title(), "CI");
        assert_eq!(props.text(PropertyField::State), Some("Success"));
        assert_eq!(
            props.get(PropertyField::Number),
            Some(&PropertyValue::Number(17.into()))
        );

        let running = obj(json!({"display_title": "Fix flake", "status": "in_progress", "conclusion": null}));
        let props = build_properties(EventKind::WorkflowRun, &running, None);
        assert_eq!(props.title(), "Fix flake");
        assert_eq!(props.text(PropertyField::State), Some("In_Progress"));
    }

    #[test]
    fn project_title_falls_back_to_name() {
        let props = build_properties(EventKind::Project, &obj(json!({"name": "Roadmap"})), None);
        assert_eq!(props.title(), "Roadmap");
    }

    #[test]
    fn metadata_is_deterministic_and_merges_extra() {
        let entity = obj(json!({"title": "Q", "user": {"login": "a"}, "category": {"name": "Q&A"}}));
        let extra = obj(json!({"zeta": {"b": 2, "a": 1}, "author": "override"}));
        let props = build_properties(EventKind::Discussion, &entity, Some(&extra));

        assert_eq!(
            props.text(PropertyField::Metadata),
            Some("{\n  \"author\": \"override\",\n  \"category\": \"Q&A\",\n  \"zeta\": {\n    \"a\": 1,\n    \"b\": 2\n  }\n}")
        );
    }

    #[test]
    fn truncation_bounds_long_text() {
        let exact = "x".repeat(MAX_TEXT_LEN);
        assert_eq!(truncate_text(&exact, MAX_TEXT_LEN), exact);

        let long = "y".repeat(MAX_TEXT_LEN + 10);
        let cut = truncate_text(&long, MAX_TEXT_LEN);
        assert_eq!(cut.chars().count(), MAX_TEXT_LEN);
        assert!(cut.ends_with(ELLIPSIS));

        assert_eq!(truncate_text("héllo wörld", 5), "héll…");
    }

    #[test]
    fn long_title_is_truncated() {
        let title = "t".repeat(MAX_TEXT_LEN * 2);
        let props = build_properties(EventKind::Issues, &obj(json!({"title": title})), None);
        assert_eq!(props.title().chars().count(), MAX_TEXT_LEN);
    }

    #[test]
    fn with_keeps_canonical_order_and_replaces() {
        let props = RecordProperties::new("T")
            .with_number(3.into())
            .with_url("https://a")
            .with_state("Open")
            .with_state("Closed");
        let fields: Vec<PropertyField> = props.iter().map(|(f, _)| f).collect();
        assert_eq!(
            fields,
            vec![PropertyField::Title, PropertyField::Url, PropertyField::State, PropertyField::Number]
        );
        assert_eq!(props.text(PropertyField::State), Some("Closed"));
    }

    #[test]
    fn serializes_as_ordered_map() {
        let props = RecordProperties::new("T").with_url("https://a").with_number(7.into());
        assert_eq!(
            serde_json::to_string(&props).unwrap(),
            r#"{"title":"T","url":"https://a","number":7}"#
        );
    }
}
