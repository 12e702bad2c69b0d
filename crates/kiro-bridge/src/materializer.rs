use kiro_bridge_core::issue::{NewPullRequest, LABEL_KIRO_GENERATED, LABEL_TASK};
use kiro_bridge_core::{FailurePolicy, ItemFailure, PullRequestRef, SyncError};
use kiro_bridge_tracker::{CommitLog, Tracker};
use tracing::{info, warn};

use crate::orchestrator::find_epic;
use crate::resolver::{resolve_issue, resolve_task_number, ResolvedIssue, TaskSource};

/// Changes section used when the branch has no commits of its own, or the
/// log could not be read.
pub const COMMIT_FALLBACK: &str = "- Initial commit for this task";

#[derive(Debug, Clone)]
pub struct PrRequest {
    pub source: TaskSource,
    /// Branch the PR is opened from.
    pub head: String,
    pub base: String,
    /// Rendered as a validation checklist when non-empty.
    pub acceptance_criteria: Vec<String>,
    /// Applies to the epic lookup and the issue comment.
    pub policy: FailurePolicy,
}

#[derive(Debug)]
pub enum PrOutcome {
    /// An open PR for the same head/base already existed; nothing was created.
    Existing(PullRequestRef),
    Created {
        pr: PullRequestRef,
        issue: u64,
        epic: Option<u64>,
        warnings: Vec<ItemFailure>,
    },
}

impl PrOutcome {
    pub fn number(&self) -> u64 {
        match self {
            PrOutcome::Existing(pr) => pr.number,
            PrOutcome::Created { pr, .. } => pr.number,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            PrOutcome::Existing(pr) => &pr.url,
            PrOutcome::Created { pr, .. } => &pr.url,
        }
    }
}

/// The open PR from `head` into `base`, if any.
pub async fn find_open_pr(
    tracker: &dyn Tracker,
    head: &str,
    base: &str,
) -> Result<Option<PullRequestRef>, SyncError> {
    let mut open = tracker.search_pull_requests(head, base).await?;
    if open.is_empty() {
        return Ok(None);
    }
    Ok(Some(open.swap_remove(0)))
}

/// Bullet list of commit subjects on `head` since `base`.
pub async fn commit_summary(log: &dyn CommitLog, base: &str, head: &str) -> String {
    match log.commit_subjects_between(base, head).await {
        Ok(subjects) if !subjects.is_empty() => subjects
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n"),
        Ok(_) => COMMIT_FALLBACK.to_string(),
        Err(e) => {
            warn!("could not read commits {base}..{head}: {e}");
            COMMIT_FALLBACK.to_string()
        }
    }
}

pub fn render_pr_body(
    issue_title: &str,
    issue: u64,
    epic: Option<u64>,
    commits: &str,
    acceptance_criteria: &[String],
) -> String {
    let mut body = format!(
        "## {issue_title}

### Description
This PR implements the changes for {issue_title} as part of the Kiro-planned feature development.

### Related Issues
- Resolves #{issue}"
    );
    if let Some(epic) = epic {
        body.push_str(&format!("\n- Related to Epic #{epic}"));
    }

    body.push_str(&format!("\n\n### Changes Made\n{commits}\n"));

    if !acceptance_criteria.is_empty() {
        body.push_str("\n### Acceptance Criteria Validation\n");
        for criterion in acceptance_criteria {
            body.push_str(&format!("- [ ] {criterion}\n"));
        }
    }

    body.push_str(
        "
### Testing Checklist
- [ ] Unit tests added/updated
- [ ] Integration tests pass
- [ ] Manual testing completed
- [ ] Edge cases tested
- [ ] Error handling tested

### Code Quality Checklist
- [ ] Code follows project standards
- [ ] Types properly defined
- [ ] Error handling implemented
- [ ] Loading states implemented
- [ ] No debug logging left in code

### Review Checklist
- [ ] Functionality matches requirements
- [ ] Code is readable and maintainable
- [ ] Performance considerations addressed
- [ ] Security considerations addressed
- [ ] Accessibility requirements met

### Deployment Notes
<!-- Add any special deployment considerations -->

---
*This PR was auto-generated from Kiro task tracking*",
    );
    body
}

pub fn pr_comment(pr: u64) -> String {
    format!("🔗 Pull Request created: #{pr}")
}

/// Open a PR for a task branch, cross-linked to its issue and epic.
///
/// Runs in order: task number, existing-PR check, issue lookup, epic lookup,
/// commit summary, PR creation, labels and milestone, issue comment. An
/// existing PR for the same head/base short-circuits with
/// [`PrOutcome::Existing`]. Issue lookup and PR creation failures are always
/// fatal; the epic lookup and the comment follow `request.policy`. Once the
/// PR exists a labelling failure is only a warning, so the issue still gets
/// its comment.
pub async fn materialize_pr(
    tracker: &dyn Tracker,
    log: &dyn CommitLog,
    request: &PrRequest,
) -> Result<PrOutcome, SyncError> {
    let task_number = resolve_task_number(&request.source)?;

    if let Some(existing) = find_open_pr(tracker, &request.head, &request.base).await? {
        info!(
            "PR #{} already exists for {} -> {}",
            existing.number, request.head, request.base
        );
        return Ok(PrOutcome::Existing(existing));
    }

    let resolved = resolve_issue(tracker, task_number).await?;
    let mut warnings = Vec::new();

    let epic = match find_epic(tracker, None).await {
        Ok(epic) => epic.map(|e| e.number),
        Err(e) => {
            warn!("epic lookup failed: {e}");
            request.policy.absorb("epic lookup", e, &mut warnings)?;
            None
        }
    };

    let commits = commit_summary(log, &request.base, &request.head).await;
    let pr = create_linked_pr(tracker, request, &resolved, epic, &commits).await?;
    info!("created PR #{}: {}", pr.number, pr.url);

    if let Err(e) = apply_pr_labels(tracker, pr.number, &resolved).await {
        warn!("could not label PR #{}: {e}", pr.number);
        warnings.push(ItemFailure {
            item: format!("labels on PR #{}", pr.number),
            error: e,
        });
    }

    if let Err(e) = tracker
        .comment_on_issue(resolved.issue.number, &pr_comment(pr.number))
        .await
    {
        warn!("could not comment on issue #{}: {e}", resolved.issue.number);
        request
            .policy
            .absorb(format!("comment on #{}", resolved.issue.number), e.into(), &mut warnings)?;
    }

    Ok(PrOutcome::Created {
        pr,
        issue: resolved.issue.number,
        epic,
        warnings,
    })
}

async fn create_linked_pr(
    tracker: &dyn Tracker,
    request: &PrRequest,
    resolved: &ResolvedIssue,
    epic: Option<u64>,
    commits: &str,
) -> Result<PullRequestRef, SyncError> {
    let body = render_pr_body(
        &resolved.issue.title,
        resolved.issue.number,
        epic,
        commits,
        &request.acceptance_criteria,
    );
    let pr = tracker
        .create_pull_request(&NewPullRequest {
            title: resolved.task_title().to_string(),
            body,
            head: request.head.clone(),
            base: request.base.clone(),
        })
        .await?;
    Ok(pr)
}

/// Task labels, plus the issue's milestone when it has one.
async fn apply_pr_labels(
    tracker: &dyn Tracker,
    pr: u64,
    resolved: &ResolvedIssue,
) -> Result<(), SyncError> {
    let labels = [LABEL_TASK.to_string(), LABEL_KIRO_GENERATED.to_string()];
    tracker
        .label_pull_request(pr, &labels, resolved.issue.milestone)
        .await?;
    Ok(())
}
