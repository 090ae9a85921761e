//! Repository events that may start a pipeline run.

use serde::{Deserialize, Serialize};

/// Kind of inbound repository event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
    Manual,
}

/// An inbound repository event, delivered by the version-control host.
///
/// Push and pull-request events carry the set of changed paths; manual
/// dispatch carries none, which the trigger evaluator treats as "run".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    #[serde(default)]
    pub changed_paths: Vec<String>,
    #[serde(default)]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub git_sha: Option<String>,
}

impl Event {
    pub fn push(changed_paths: Vec<String>) -> Self {
        Self {
            kind: EventKind::Push,
            changed_paths,
            git_ref: None,
            git_sha: None,
        }
    }

    pub fn pull_request(changed_paths: Vec<String>) -> Self {
        Self {
            kind: EventKind::PullRequest,
            changed_paths,
            git_ref: None,
            git_sha: None,
        }
    }

    pub fn manual() -> Self {
        Self {
            kind: EventKind::Manual,
            changed_paths: Vec::new(),
            git_ref: None,
            git_sha: None,
        }
    }

    /// Whether the event carries path information at all.
    pub fn has_path_info(&self) -> bool {
        !matches!(self.kind, EventKind::Manual) && !self.changed_paths.is_empty()
    }
}
