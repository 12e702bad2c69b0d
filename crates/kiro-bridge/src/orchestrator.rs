use std::path::PathBuf;

use kiro_bridge_core::issue::{IssueQuery, NewIssue, LABEL_ENHANCEMENT, LABEL_EPIC};
use kiro_bridge_core::{Epic, SyncError};
use kiro_bridge_tracker::Tracker;
use tracing::{info, warn};

pub const MILESTONE_DESCRIPTION: &str = "Auto-generated milestone from Kiro planning";

/// The three planning documents of one Kiro spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanningDocuments {
    pub requirements: PathBuf,
    pub design: PathBuf,
    pub tasks: PathBuf,
}

impl PlanningDocuments {
    /// Fail with `DocumentNotFound` for the first path that does not exist.
    pub fn check_exists(&self) -> Result<(), SyncError> {
        for path in [&self.requirements, &self.design, &self.tasks] {
            if !path.is_file() {
                return Err(SyncError::DocumentNotFound(path.clone()));
            }
        }
        Ok(())
    }
}

/// Everything the epic body is built from.
#[derive(Debug, Clone)]
pub struct EpicContent<'a> {
    pub project_name: &'a str,
    pub requirements_excerpt: &'a str,
    pub architecture_excerpt: &'a str,
    pub documents: &'a PlanningDocuments,
}

/// Create a milestone. Names are not de-duplicated: calling this twice with
/// the same name creates two milestones.
pub async fn create_milestone(tracker: &dyn Tracker, name: &str) -> Result<u64, SyncError> {
    let number = tracker
        .create_milestone(name, MILESTONE_DESCRIPTION)
        .await?;
    info!("created milestone {name:?} (#{number})");
    Ok(number)
}

pub fn render_epic_body(content: &EpicContent<'_>) -> String {
    let name = content.project_name;
    let docs = content.documents;
    format!(
        "## Epic: {name}

### Overview
This epic tracks the implementation of the {name} feature based on Kiro-generated planning documents.

### Requirements Summary
{requirements}

### Architecture Overview
{architecture}

### Related Documents
- [Requirements]({req_path})
- [Design]({design_path})
- [Tasks]({tasks_path})

### Acceptance Criteria
- [ ] All task items completed
- [ ] Requirements validated
- [ ] Code reviewed and approved
- [ ] Tests passing

*Auto-generated from Kiro planning documents*",
        requirements = content.requirements_excerpt,
        architecture = content.architecture_excerpt,
        req_path = docs.requirements.display(),
        design_path = docs.design.display(),
        tasks_path = docs.tasks.display(),
    )
}

/// Create the epic issue, labelled `epic` + `enhancement`.
pub async fn create_epic(
    tracker: &dyn Tracker,
    content: &EpicContent<'_>,
    milestone: Option<u64>,
) -> Result<Epic, SyncError> {
    let title = Epic::title_for(content.project_name);
    let issue = tracker
        .create_issue(&NewIssue {
            title: title.clone(),
            body: render_epic_body(content),
            labels: vec![LABEL_EPIC.to_string(), LABEL_ENHANCEMENT.to_string()],
            milestone,
        })
        .await?;
    info!("created epic #{}: {title}", issue.number);

    Ok(Epic {
        number: issue.number,
        id: issue.id,
        title,
        milestone,
        created: true,
    })
}

/// Look up an open epic.
///
/// With a project name, only the exact title `Epic: {project}` counts.
/// Without one, the first open issue whose title starts with `Epic:` wins.
pub async fn find_epic(
    tracker: &dyn Tracker,
    project_name: Option<&str>,
) -> Result<Option<Epic>, SyncError> {
    let wanted = project_name.map(Epic::title_for);
    let query = IssueQuery::open_with_title(wanted.clone().unwrap_or_else(|| "Epic:".into()));
    let hits = tracker.search_issues(&query).await?;

    let found = hits.into_iter().find(|issue| match &wanted {
        Some(title) => issue.title == *title,
        None => issue.title.starts_with("Epic:"),
    });

    Ok(found.map(|issue| Epic {
        number: issue.number,
        id: issue.id,
        title: issue.title,
        milestone: issue.milestone,
        created: false,
    }))
}

/// Find this project's epic or create it (with a fresh milestone when a name
/// is given).
///
/// A located epic keeps its own milestone; no new milestone is created for
/// it, so epic and tasks stay on the same milestone.
pub async fn ensure_epic(
    tracker: &dyn Tracker,
    content: &EpicContent<'_>,
    milestone_name: Option<&str>,
) -> Result<Epic, SyncError> {
    if let Some(epic) = find_epic(tracker, Some(content.project_name)).await? {
        info!("found existing epic #{}: {}", epic.number, epic.title);
        if let Some(name) = milestone_name {
            warn!(
                "epic #{} already exists; not creating milestone {name:?}",
                epic.number
            );
        }
        return Ok(epic);
    }

    let milestone = match milestone_name {
        Some(name) => Some(create_milestone(tracker, name).await?),
        None => None,
    };
    create_epic(tracker, content, milestone).await
}
