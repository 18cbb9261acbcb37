// kind.rs — The fixed set of event kinds notion-sync knows how to project.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of an incoming lifecycle event.
///
/// The canonical spelling (see [`EventKind::as_str`]) is the one used in
/// identity cache keys, so it must not change once state files exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Issues,
    PullRequest,
    Discussion,
    Project,
    WorkflowRun,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Issues,
        EventKind::PullRequest,
        EventKind::Discussion,
        EventKind::Project,
        EventKind::WorkflowRun,
    ];

    /// Canonical kind name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Issues => "issues",
            EventKind::PullRequest => "pull_request",
            EventKind::Discussion => "discussion",
            EventKind::Project => "project",
            EventKind::WorkflowRun => "workflow_run",
        }
    }

    /// Parse a kind name, accepting the aliases webhook senders use.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim() {
            "issues" | "issue" => Some(EventKind::Issues),
            "pull_request" => Some(EventKind::PullRequest),
            "discussion" => Some(EventKind::Discussion),
            "project" | "projects_v2" => Some(EventKind::Project),
            "workflow_run" => Some(EventKind::WorkflowRun),
            _ => None,
        }
    }

    /// Envelope keys that may carry the entity for this kind, in lookup order.
    pub fn payload_keys(&self) -> &'static [&'static str] {
        match self {
            EventKind::Issues => &["issue"],
            EventKind::PullRequest => &["pull_request"],
            EventKind::Discussion => &["discussion"],
            EventKind::Project => &["project", "projects_v2"],
            EventKind::WorkflowRun => &["workflow_run"],
        }
    }

    /// Human-readable record type tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            EventKind::Issues => "Issue",
            EventKind::PullRequest => "Pull Request",
            EventKind::Discussion => "Discussion",
            EventKind::Project => "Project",
            EventKind::WorkflowRun => "Workflow Run",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::parse(s).ok_or_else(|| format!("unknown event kind '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_parse_back() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn aliases_resolve_to_canonical_kind() {
        assert_eq!(EventKind::parse("issue"), Some(EventKind::Issues));
        assert_eq!(EventKind::parse("projects_v2"), Some(EventKind::Project));
        assert_eq!(EventKind::parse("push"), None);
    }

    #[test]
    fn serde_uses_canonical_names() {
        let json = serde_json::to_string(&EventKind::WorkflowRun).unwrap();
        assert_eq!(json, "\"workflow_run\"");
    }
}
