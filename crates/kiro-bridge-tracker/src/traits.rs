use async_trait::async_trait;
use kiro_bridge_core::issue::{CloseReason, IssueQuery, NewIssue, NewPullRequest};
use kiro_bridge_core::{IssueRef, PullRequestRef, TrackerError};

/// Abstraction over the issue tracker.
///
/// The synchronizer and PR materializer program against this trait.
/// `GitHubTracker` talks to the GitHub REST API; `MockTracker` keeps
/// everything in memory and records each call for tests.
///
/// Every call is awaited to completion by the caller before the next one
/// starts. Implementations do not retry.
#[async_trait]
pub trait Tracker: Send + Sync {
    fn name(&self) -> &str;

    // -- Milestones --
    async fn create_milestone(&self, title: &str, description: &str) -> Result<u64, TrackerError>;

    // -- Issues --
    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueRef, TrackerError>;
    async fn close_issue(&self, number: u64, reason: CloseReason) -> Result<(), TrackerError>;
    /// Results come back in tracker order and already satisfy `query.matches`.
    async fn search_issues(&self, query: &IssueQuery) -> Result<Vec<IssueRef>, TrackerError>;
    async fn comment_on_issue(&self, number: u64, body: &str) -> Result<(), TrackerError>;

    /// Attach `child` under `parent` with the tracker's own relation primitive.
    async fn link_sub_issue(&self, parent: u64, child: &IssueRef) -> Result<(), TrackerError> {
        let _ = (parent, child);
        Err(TrackerError::Unsupported(format!(
            "{} has no native sub-issue links",
            self.name()
        )))
    }

    // -- Pull requests --
    /// Open pull requests from `head` into `base`.
    async fn search_pull_requests(
        &self,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequestRef>, TrackerError>;
    /// Open the PR only; labels and milestone are set by `label_pull_request`.
    async fn create_pull_request(
        &self,
        pr: &NewPullRequest,
    ) -> Result<PullRequestRef, TrackerError>;
    async fn label_pull_request(
        &self,
        number: u64,
        labels: &[String],
        milestone: Option<u64>,
    ) -> Result<(), TrackerError>;
}

/// Source-control history query used to summarise a branch.
#[async_trait]
pub trait CommitLog: Send + Sync {
    /// Subjects of commits reachable from `head` but not from `base`, newest first.
    async fn commit_subjects_between(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<String>, TrackerError>;
}
