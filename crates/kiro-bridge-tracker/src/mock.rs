use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use kiro_bridge_core::issue::{CloseReason, IssueQuery, NewIssue, NewPullRequest};
use kiro_bridge_core::{IssueRef, IssueState, PullRequestRef, TrackerError};

use crate::{CommitLog, Tracker};

/// One recorded interaction with [`MockTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    CreateMilestone { title: String },
    CreateIssue { title: String },
    CloseIssue { number: u64, reason: CloseReason },
    SearchIssues { title_contains: String },
    CommentOnIssue { number: u64 },
    LinkSubIssue { parent: u64, child: u64 },
    SearchPullRequests { head: String, base: String },
    CreatePullRequest { head: String, base: String },
    LabelPullRequest { number: u64 },
}

/// An issue held by the mock, with the fields a test wants to inspect.
#[derive(Debug, Clone)]
pub struct MockIssue {
    pub issue: IssueRef,
    pub body: String,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MockPullRequest {
    pub pr: PullRequestRef,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub milestone: Option<u64>,
}

#[derive(Debug, Default)]
struct MockState {
    next_number: u64,
    next_milestone: u64,
    milestones: Vec<(u64, String)>,
    issues: Vec<MockIssue>,
    pulls: Vec<MockPullRequest>,
    comments: Vec<(u64, String)>,
    links: Vec<(u64, u64)>,
    calls: Vec<TrackerCall>,
}

/// In-memory tracker for tests. Issue and PR numbers share one sequence,
/// as they do on GitHub.
#[derive(Debug)]
pub struct MockTracker {
    state: Mutex<MockState>,
    native_links: bool,
    fail_milestone: bool,
    fail_issue_titles: Vec<String>,
    fail_close: bool,
    fail_search: bool,
    fail_search_titles: Vec<String>,
    fail_pr: bool,
    fail_comment: bool,
    fail_label: bool,
}

impl Default for MockTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_number: 1,
                next_milestone: 1,
                ..MockState::default()
            }),
            native_links: false,
            fail_milestone: false,
            fail_issue_titles: Vec::new(),
            fail_close: false,
            fail_search: false,
            fail_search_titles: Vec::new(),
            fail_pr: false,
            fail_comment: false,
            fail_label: false,
        }
    }

    /// Seed an existing issue. Returns the tracker for chaining.
    pub fn with_issue(self, title: &str, state: IssueState, milestone: Option<u64>) -> Self {
        {
            let mut st = self.state();
            let number = st.next_number;
            st.next_number += 1;
            st.issues.push(MockIssue {
                issue: IssueRef {
                    number,
                    id: Some(number + 10_000),
                    title: title.to_string(),
                    milestone,
                    state,
                },
                body: String::new(),
                labels: Vec::new(),
            });
        }
        self
    }

    /// Seed an existing open PR from `head` into `base`.
    pub fn with_pull_request(self, head: &str, base: &str) -> Self {
        {
            let mut st = self.state();
            let number = st.next_number;
            st.next_number += 1;
            st.pulls.push(MockPullRequest {
                pr: PullRequestRef {
                    number,
                    url: format!("https://github.com/test/repo/pull/{number}"),
                    head: head.to_string(),
                    base: base.to_string(),
                },
                title: String::new(),
                body: String::new(),
                labels: Vec::new(),
                milestone: None,
            });
        }
        self
    }

    pub fn with_native_links(mut self) -> Self {
        self.native_links = true;
        self
    }

    pub fn with_milestone_fail(mut self) -> Self {
        self.fail_milestone = true;
        self
    }

    /// Fail `create_issue` for any title containing `fragment`.
    pub fn with_issue_fail(mut self, fragment: &str) -> Self {
        self.fail_issue_titles.push(fragment.to_string());
        self
    }

    pub fn with_close_fail(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn with_search_fail(mut self) -> Self {
        self.fail_search = true;
        self
    }

    /// Fail only issue searches whose title fragment contains `fragment`.
    pub fn with_issue_search_fail(mut self, fragment: &str) -> Self {
        self.fail_search_titles.push(fragment.to_string());
        self
    }

    pub fn with_pr_fail(mut self) -> Self {
        self.fail_pr = true;
        self
    }

    pub fn with_comment_fail(mut self) -> Self {
        self.fail_comment = true;
        self
    }

    /// Fail setting labels and milestone on a PR that was already opened.
    pub fn with_label_fail(mut self) -> Self {
        self.fail_label = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<TrackerCall> {
        self.state().calls.clone()
    }

    pub fn issues(&self) -> Vec<MockIssue> {
        self.state().issues.clone()
    }

    pub fn issue(&self, number: u64) -> Option<MockIssue> {
        self.state()
            .issues
            .iter()
            .find(|i| i.issue.number == number)
            .cloned()
    }

    pub fn pull_requests(&self) -> Vec<MockPullRequest> {
        self.state().pulls.clone()
    }

    pub fn milestones(&self) -> Vec<(u64, String)> {
        self.state().milestones.clone()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.state().comments.clone()
    }

    pub fn links(&self) -> Vec<(u64, u64)> {
        self.state().links.clone()
    }
}

fn mock_failure(operation: &str) -> TrackerError {
    TrackerError::Status {
        operation: operation.to_string(),
        status: 500,
        body: format!("mock {operation} failure"),
    }
}

#[async_trait]
impl Tracker for MockTracker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_milestone(&self, title: &str, _description: &str) -> Result<u64, TrackerError> {
        let mut st = self.state();
        st.calls.push(TrackerCall::CreateMilestone {
            title: title.to_string(),
        });
        if self.fail_milestone {
            return Err(mock_failure("create milestone"));
        }
        let number = st.next_milestone;
        st.next_milestone += 1;
        st.milestones.push((number, title.to_string()));
        Ok(number)
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueRef, TrackerError> {
        let mut st = self.state();
        st.calls.push(TrackerCall::CreateIssue {
            title: issue.title.clone(),
        });
        if self
            .fail_issue_titles
            .iter()
            .any(|f| issue.title.contains(f.as_str()))
        {
            return Err(mock_failure("create issue"));
        }
        let number = st.next_number;
        st.next_number += 1;
        let created = IssueRef {
            number,
            id: Some(number + 10_000),
            title: issue.title.clone(),
            milestone: issue.milestone,
            state: IssueState::Open,
        };
        st.issues.push(MockIssue {
            issue: created.clone(),
            body: issue.body.clone(),
            labels: issue.labels.clone(),
        });
        Ok(created)
    }

    async fn close_issue(&self, number: u64, reason: CloseReason) -> Result<(), TrackerError> {
        let mut st = self.state();
        st.calls.push(TrackerCall::CloseIssue { number, reason });
        if self.fail_close {
            return Err(mock_failure("close issue"));
        }
        let issue = st
            .issues
            .iter_mut()
            .find(|i| i.issue.number == number)
            .ok_or_else(|| TrackerError::Status {
                operation: "close issue".into(),
                status: 404,
                body: format!("issue #{number} not found"),
            })?;
        issue.issue.state = IssueState::Closed;
        Ok(())
    }

    async fn search_issues(&self, query: &IssueQuery) -> Result<Vec<IssueRef>, TrackerError> {
        let mut st = self.state();
        st.calls.push(TrackerCall::SearchIssues {
            title_contains: query.title_contains.clone(),
        });
        if self.fail_search
            || self
                .fail_search_titles
                .iter()
                .any(|f| query.title_contains.contains(f.as_str()))
        {
            return Err(mock_failure("search issues"));
        }
        Ok(st
            .issues
            .iter()
            .map(|i| i.issue.clone())
            .filter(|i| query.matches(i))
            .collect())
    }

    async fn comment_on_issue(&self, number: u64, body: &str) -> Result<(), TrackerError> {
        let mut st = self.state();
        st.calls.push(TrackerCall::CommentOnIssue { number });
        if self.fail_comment {
            return Err(mock_failure("comment on issue"));
        }
        st.comments.push((number, body.to_string()));
        Ok(())
    }

    async fn link_sub_issue(&self, parent: u64, child: &IssueRef) -> Result<(), TrackerError> {
        let mut st = self.state();
        st.calls.push(TrackerCall::LinkSubIssue {
            parent,
            child: child.number,
        });
        if !self.native_links {
            return Err(TrackerError::Unsupported(
                "mock has no native sub-issue links".into(),
            ));
        }
        st.links.push((parent, child.number));
        Ok(())
    }

    async fn search_pull_requests(
        &self,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequestRef>, TrackerError> {
        let mut st = self.state();
        st.calls.push(TrackerCall::SearchPullRequests {
            head: head.to_string(),
            base: base.to_string(),
        });
        if self.fail_search {
            return Err(mock_failure("list pull requests"));
        }
        Ok(st
            .pulls
            .iter()
            .filter(|p| p.pr.head == head && p.pr.base == base)
            .map(|p| p.pr.clone())
            .collect())
    }

    async fn create_pull_request(
        &self,
        pr: &NewPullRequest,
    ) -> Result<PullRequestRef, TrackerError> {
        let mut st = self.state();
        st.calls.push(TrackerCall::CreatePullRequest {
            head: pr.head.clone(),
            base: pr.base.clone(),
        });
        if self.fail_pr {
            return Err(mock_failure("create pull request"));
        }
        let number = st.next_number;
        st.next_number += 1;
        let created = PullRequestRef {
            number,
            url: format!("https://github.com/test/repo/pull/{number}"),
            head: pr.head.clone(),
            base: pr.base.clone(),
        };
        st.pulls.push(MockPullRequest {
            pr: created.clone(),
            title: pr.title.clone(),
            body: pr.body.clone(),
            labels: Vec::new(),
            milestone: None,
        });
        Ok(created)
    }

    async fn label_pull_request(
        &self,
        number: u64,
        labels: &[String],
        milestone: Option<u64>,
    ) -> Result<(), TrackerError> {
        let mut st = self.state();
        st.calls.push(TrackerCall::LabelPullRequest { number });
        if self.fail_label {
            return Err(mock_failure("label pull request"));
        }
        let pull = st
            .pulls
            .iter_mut()
            .find(|p| p.pr.number == number)
            .ok_or_else(|| TrackerError::Other(format!("no pull request #{number}")))?;
        pull.labels = labels.to_vec();
        pull.milestone = milestone;
        Ok(())
    }
}

/// Commit log returning a fixed list, or an error when built with `failing()`.
#[derive(Debug, Clone, Default)]
pub struct MockCommitLog {
    subjects: Option<Vec<String>>,
}

impl MockCommitLog {
    pub fn new(subjects: &[&str]) -> Self {
        Self {
            subjects: Some(subjects.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn failing() -> Self {
        Self { subjects: None }
    }
}

#[async_trait]
impl CommitLog for MockCommitLog {
    async fn commit_subjects_between(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<String>, TrackerError> {
        self.subjects
            .clone()
            .ok_or_else(|| TrackerError::Other(format!("mock git log {base}..{head} failure")))
    }
}
