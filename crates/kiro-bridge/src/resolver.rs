use kiro_bridge_core::issue::IssueQuery;
use kiro_bridge_core::{IssueRef, SyncError, TaskNumber};
use kiro_bridge_tracker::Tracker;
use tracing::{info, warn};

/// Where the task number for a PR comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSource {
    /// Supplied by the caller, e.g. `--task-number 4`.
    Explicit(String),
    /// Derived from the first digit run of a branch name.
    Branch(String),
}

pub fn resolve_task_number(source: &TaskSource) -> Result<TaskNumber, SyncError> {
    match source {
        TaskSource::Explicit(raw) => {
            TaskNumber::parse_str(raw).ok_or_else(|| SyncError::NoTaskNumber(raw.clone()))
        }
        TaskSource::Branch(branch) => {
            TaskNumber::from_branch(branch).ok_or_else(|| SyncError::NoTaskNumber(branch.clone()))
        }
    }
}

/// The open issue whose title carries `Task N:`.
///
/// When several match, the first one the tracker returns is used.
pub async fn find_task_issue(
    tracker: &dyn Tracker,
    number: &TaskNumber,
) -> Result<IssueRef, SyncError> {
    let query = IssueQuery::open_with_title(number.title_marker());
    let mut hits = tracker.search_issues(&query).await?;

    if hits.len() > 1 {
        let numbers: Vec<String> = hits.iter().map(|i| format!("#{}", i.number)).collect();
        warn!(
            "{} open issues match {:?} ({}); using #{}",
            hits.len(),
            query.title_contains,
            numbers.join(", "),
            hits[0].number
        );
    }

    if hits.is_empty() {
        return Err(SyncError::IssueNotFound(number.to_string()));
    }
    Ok(hits.swap_remove(0))
}

/// A task number together with its tracker issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIssue {
    pub task_number: TaskNumber,
    pub issue: IssueRef,
}

impl ResolvedIssue {
    /// Issue title without the `Task N: ` prefix.
    pub fn task_title(&self) -> &str {
        self.task_number.strip_title_prefix(&self.issue.title)
    }
}

pub async fn resolve_issue(
    tracker: &dyn Tracker,
    task_number: TaskNumber,
) -> Result<ResolvedIssue, SyncError> {
    let issue = find_task_issue(tracker, &task_number).await?;
    info!("task {task_number} resolves to issue #{}", issue.number);
    Ok(ResolvedIssue { task_number, issue })
}
