use std::fmt;

use serde::{Deserialize, Serialize};

pub const LABEL_TASK: &str = "task";
pub const LABEL_ENHANCEMENT: &str = "enhancement";
pub const LABEL_COMPLETED: &str = "completed";
pub const LABEL_EPIC: &str = "epic";
pub const LABEL_KIRO_GENERATED: &str = "kiro-generated";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueState {
    Open,
    Closed,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "open" => Some(IssueState::Open),
            "closed" => Some(IssueState::Closed),
            _ => None,
        }
    }
}

impl fmt::Display for IssueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    Completed,
    NotPlanned,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::Completed => "completed",
            CloseReason::NotPlanned => "not_planned",
        }
    }
}

/// An issue as returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    /// Repository-scoped number (`#42`).
    pub number: u64,
    /// Tracker-global id, needed by native sub-issue links.
    pub id: Option<u64>,
    pub title: String,
    pub milestone: Option<u64>,
    pub state: IssueState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub milestone: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
    pub url: String,
    pub head: String,
    pub base: String,
}

/// Issue search: open/closed issues whose title contains a literal fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    pub title_contains: String,
    pub state: IssueState,
}

impl IssueQuery {
    pub fn open_with_title(fragment: impl Into<String>) -> Self {
        Self {
            title_contains: fragment.into(),
            state: IssueState::Open,
        }
    }

    /// Trackers with fuzzy search may return near misses; this is the exact check.
    pub fn matches(&self, issue: &IssueRef) -> bool {
        issue.state == self.state && issue.title.contains(&self.title_contains)
    }
}

/// The epic issue for a planning project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epic {
    pub number: u64,
    pub id: Option<u64>,
    pub title: String,
    pub milestone: Option<u64>,
    /// False when the epic was found by search rather than created this run.
    pub created: bool,
}

impl Epic {
    pub fn title_for(project_name: &str) -> String {
        format!("Epic: {project_name}")
    }

    pub fn link(&self, child: u64) -> EpicLink {
        EpicLink {
            child,
            epic: self.number,
        }
    }
}

/// Child issue to epic relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpicLink {
    pub child: u64,
    pub epic: u64,
}

impl EpicLink {
    /// Text form embedded in the child's body.
    pub fn back_reference(epic: u64) -> String {
        format!("Part of epic #{epic}")
    }
}

impl fmt::Display for EpicLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} -> epic #{}", self.child, self.epic)
    }
}
