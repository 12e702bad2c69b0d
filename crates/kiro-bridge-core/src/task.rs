use std::fmt;

use serde::{Deserialize, Serialize};

/// Requirements value used when a task block carries no `_Requirements:_` line.
pub const REQUIREMENTS_NOT_SPECIFIED: &str = "Not specified";

/// Issue description used for tasks whose block has no description lines.
pub const DESCRIPTION_PLACEHOLDER: &str =
    "Implementation details to be determined during development.";

/// One checklist entry from a tasks document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Ordinal exactly as written in the document (e.g. "3").
    pub number: String,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub completed: bool,
}

impl TaskRecord {
    /// Tracker issue title, e.g. `Task 3: Add validation`.
    ///
    /// The ordinal is written without leading zeros so the title carries the
    /// same `Task N:` marker a branch like `task-04` resolves to.
    pub fn issue_title(&self) -> String {
        match TaskNumber::parse_str(&self.number) {
            Some(number) => format!("Task {number}: {}", self.title),
            None => format!("Task {}: {}", self.number, self.title),
        }
    }

    pub fn description_or_placeholder(&self) -> &str {
        if self.description.trim().is_empty() {
            DESCRIPTION_PLACEHOLDER
        } else {
            &self.description
        }
    }
}

/// A task ordinal used to find the tracker issue for a branch.
///
/// Always a non-empty run of ASCII digits with leading zeros removed, so that
/// `feature/task-04` and an issue titled `Task 4: ...` agree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskNumber(String);

impl TaskNumber {
    /// Parse an explicit task number. Returns `None` unless the whole
    /// (trimmed) input is a digit run.
    pub fn parse_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self::normalized(s))
    }

    /// Take the first contiguous digit run in a branch name.
    pub fn from_branch(branch: &str) -> Option<Self> {
        let start = branch.find(|c: char| c.is_ascii_digit())?;
        let rest = &branch[start..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        Some(Self::normalized(&rest[..end]))
    }

    fn normalized(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            TaskNumber("0".to_string())
        } else {
            TaskNumber(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The literal title fragment that identifies this task's issue.
    pub fn title_marker(&self) -> String {
        format!("Task {}:", self.0)
    }

    /// Strip `Task N: ` from an issue title, leaving the task's own title.
    pub fn strip_title_prefix<'a>(&self, issue_title: &'a str) -> &'a str {
        let prefix = format!("{} ", self.title_marker());
        issue_title.strip_prefix(&prefix).unwrap_or(issue_title)
    }
}

impl fmt::Display for TaskNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
