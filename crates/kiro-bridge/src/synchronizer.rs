use kiro_bridge_core::issue::{
    CloseReason, NewIssue, LABEL_COMPLETED, LABEL_ENHANCEMENT, LABEL_TASK,
};
use kiro_bridge_core::{
    Epic, EpicLink, FailurePolicy, IssueState, ItemFailure, SyncError, TaskRecord,
};
use kiro_bridge_tracker::Tracker;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::orchestrator::{ensure_epic, EpicContent, PlanningDocuments};
use crate::sections::{read_section, ARCHITECTURE_OVERVIEW, REQUIREMENTS_SUMMARY};
use crate::task_parser::parse_tasks_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub policy: FailurePolicy,
    /// Also attach each task issue to the epic with the tracker's sub-issue API.
    pub native_links: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::CollectErrors,
            native_links: false,
        }
    }
}

/// A task issue created this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskIssue {
    pub number: u64,
    pub task_number: String,
    pub title: String,
    pub labels: Vec<String>,
    pub milestone: Option<u64>,
    pub state: IssueState,
    pub epic: Option<EpicLink>,
}

#[derive(Debug, Default)]
pub struct SyncReport {
    pub created: Vec<TaskIssue>,
    pub total: usize,
    pub failures: Vec<ItemFailure>,
}

impl SyncReport {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }

    pub fn summary(&self) -> String {
        format!(
            "Successfully created {} out of {} task issues",
            self.created_count(),
            self.total
        )
    }
}

pub fn task_labels(task: &TaskRecord) -> Vec<String> {
    let mut labels = vec![LABEL_TASK.to_string(), LABEL_ENHANCEMENT.to_string()];
    if task.completed {
        labels.push(LABEL_COMPLETED.to_string());
    }
    labels
}

pub fn render_task_body(task: &TaskRecord, epic: Option<u64>) -> String {
    let mut body = format!(
        "## Task #{number}: {title}

### Description
{description}

### Requirements Covered
{requirements}
",
        number = task.number,
        title = task.title,
        description = task.description_or_placeholder(),
        requirements = task.requirements,
    );

    if let Some(epic) = epic {
        body.push_str(&format!(
            "\n### Related Epic\n{}\n",
            EpicLink::back_reference(epic)
        ));
    }

    body.push_str(
        "
### Definition of Done
- [ ] Implementation completed
- [ ] Unit tests written and passing
- [ ] Code reviewed
- [ ] Requirements validated
- [ ] Documentation updated

*Auto-generated from Kiro tasks*",
    );
    body
}

/// Create (and, for completed tasks, close) the issue for one task.
pub async fn sync_task(
    tracker: &dyn Tracker,
    task: &TaskRecord,
    epic: Option<&Epic>,
    milestone: Option<u64>,
    native_links: bool,
) -> Result<TaskIssue, SyncError> {
    let labels = task_labels(task);
    let issue = tracker
        .create_issue(&NewIssue {
            title: task.issue_title(),
            body: render_task_body(task, epic.map(|e| e.number)),
            labels: labels.clone(),
            milestone,
        })
        .await?;
    info!(
        "created issue #{} for task {}: {}",
        issue.number, task.number, task.title
    );

    let mut state = IssueState::Open;
    if task.completed {
        tracker
            .close_issue(issue.number, CloseReason::Completed)
            .await?;
        state = IssueState::Closed;
        info!("closed completed task {} (#{})", task.number, issue.number);
    }

    let link = epic.map(|e| e.link(issue.number));
    if let (true, Some(epic), Some(link)) = (native_links, epic, link) {
        // The body already carries the text reference, so a missing native
        // link is not a task failure.
        if let Err(e) = tracker.link_sub_issue(epic.number, &issue).await {
            warn!("could not link {link} natively: {e}");
        }
    }

    Ok(TaskIssue {
        number: issue.number,
        task_number: task.number.clone(),
        title: issue.title,
        labels,
        milestone,
        state,
        epic: link,
    })
}

/// Create one issue per task, in document order.
pub async fn sync_tasks(
    tracker: &dyn Tracker,
    tasks: &[TaskRecord],
    epic: Option<&Epic>,
    milestone: Option<u64>,
    options: SyncOptions,
) -> Result<SyncReport, SyncError> {
    let mut report = SyncReport {
        total: tasks.len(),
        ..SyncReport::default()
    };

    for task in tasks {
        match sync_task(tracker, task, epic, milestone, options.native_links).await {
            Ok(issue) => report.created.push(issue),
            Err(e) => {
                error!("failed to create issue for task {}: {e}", task.number);
                options
                    .policy
                    .absorb(format!("task {}", task.number), e, &mut report.failures)?;
            }
        }
    }

    info!("{}", report.summary());
    Ok(report)
}

#[derive(Debug, Clone)]
pub struct SyncRequest {
    pub project_name: String,
    pub documents: PlanningDocuments,
    pub milestone_name: Option<String>,
    pub options: SyncOptions,
}

#[derive(Debug)]
pub struct SyncOutcome {
    pub epic: Epic,
    pub report: SyncReport,
    /// Non-fatal conditions such as an empty tasks document.
    pub warnings: Vec<SyncError>,
}

/// Serializable digest of a run, printed by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub epic: u64,
    pub epic_created: bool,
    pub milestone: Option<u64>,
    pub created: usize,
    pub total: usize,
    pub failed: Vec<String>,
}

impl SyncOutcome {
    /// `(epic_id, created_count, total_count)`
    pub fn counts(&self) -> (u64, usize, usize) {
        (self.epic.number, self.report.created_count(), self.report.total)
    }

    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            epic: self.epic.number,
            epic_created: self.epic.created,
            milestone: self.epic.milestone,
            created: self.report.created_count(),
            total: self.report.total,
            failed: self.report.failures.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// Full project run: documents, milestone, epic, then task issues.
///
/// Missing documents and epic/milestone failures abort the run. Task-level
/// failures follow `request.options.policy`.
pub async fn synchronize(
    tracker: &dyn Tracker,
    request: &SyncRequest,
) -> Result<SyncOutcome, SyncError> {
    let docs = &request.documents;
    docs.check_exists()?;

    let mut warnings = Vec::new();
    let tasks = parse_tasks_file(&docs.tasks);
    info!("found {} tasks to process", tasks.len());
    if tasks.is_empty() {
        let empty = SyncError::ParseYieldedEmpty(docs.tasks.clone());
        warn!("{empty}");
        warnings.push(empty);
    }

    let requirements_excerpt = read_section(&docs.requirements, REQUIREMENTS_SUMMARY);
    let architecture_excerpt = read_section(&docs.design, ARCHITECTURE_OVERVIEW);
    let content = EpicContent {
        project_name: &request.project_name,
        requirements_excerpt: &requirements_excerpt,
        architecture_excerpt: &architecture_excerpt,
        documents: docs,
    };

    let epic = ensure_epic(tracker, &content, request.milestone_name.as_deref()).await?;
    let report = sync_tasks(
        tracker,
        &tasks,
        Some(&epic),
        epic.milestone,
        request.options,
    )
    .await?;

    Ok(SyncOutcome {
        epic,
        report,
        warnings,
    })
}
