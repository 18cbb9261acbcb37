// routing.rs — RoutingTable: which database each event kind lands in.

use std::collections::BTreeMap;

use ns_events::EventKind;
use serde::{Deserialize, Serialize};

/// Environment key naming the fallback database for every kind.
pub const DEFAULT_DATABASE_VAR: &str = "NOTION_DATABASE_ID";

/// Environment key naming the database for a specific kind.
pub fn database_var(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Issues => "NOTION_DATABASE_ISSUES",
        EventKind::PullRequest => "NOTION_DATABASE_PULL_REQUESTS",
        EventKind::Discussion => "NOTION_DATABASE_DISCUSSIONS",
        EventKind::Project => "NOTION_DATABASE_PROJECTS",
        EventKind::WorkflowRun => "NOTION_DATABASE_WORKFLOW_RUNS",
    }
}

/// Event kind → destination collection id, with an optional fallback.
///
/// Kind names are canonicalized on the way in and on lookup, so
/// `projects_v2` and `project` share a route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingTable {
    routes: BTreeMap<String, String>,
    default: Option<String>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from an environment-style lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut table = Self::new();
        for kind in EventKind::ALL {
            if let Some(id) = non_blank(lookup(database_var(kind))) {
                table.set_route(kind.as_str(), id);
            }
        }
        if let Some(id) = non_blank(lookup(DEFAULT_DATABASE_VAR)) {
            table.set_default(id);
        }
        table
    }

    pub fn with_route(mut self, kind: &str, destination: impl Into<String>) -> Self {
        self.set_route(kind, destination);
        self
    }

    pub fn with_default(mut self, destination: impl Into<String>) -> Self {
        self.set_default(destination);
        self
    }

    pub fn set_route(&mut self, kind: &str, destination: impl Into<String>) {
        self.routes.insert(canonical(kind), destination.into());
    }

    pub fn set_default(&mut self, destination: impl Into<String>) {
        self.default = Some(destination.into());
    }

    /// Overlay `other` on top of this table: its routes and default win.
    pub fn merge(&mut self, other: RoutingTable) {
        self.routes.extend(other.routes);
        if other.default.is_some() {
            self.default = other.default;
        }
    }

    /// Destination for `kind`: its own route, else the default.
    pub fn resolve(&self, kind: &str) -> Option<&str> {
        self.routes
            .get(&canonical(kind))
            .or(self.default.as_ref())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty() && self.default.is_none()
    }
}

fn canonical(kind: &str) -> String {
    EventKind::parse(kind).map_or_else(|| kind.trim().to_string(), |k| k.as_str().to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
