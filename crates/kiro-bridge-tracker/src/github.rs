use std::time::Duration;

use async_trait::async_trait;
use kiro_bridge_core::issue::{CloseReason, IssueQuery, NewIssue, NewPullRequest};
use kiro_bridge_core::{IssueRef, IssueState, PullRequestRef, TrackerError};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::Tracker;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// GitHub REST v3 implementation of [`Tracker`].
#[derive(Debug)]
pub struct GitHubTracker {
    /// API root, e.g. "https://api.github.com" or a GHES "https://host/api/v3".
    api_url: String,
    owner: String,
    repo: String,
    /// Token sent as a bearer credential. Anonymous requests are allowed but
    /// only reads will succeed.
    token: Option<String>,
    client: Client,
}

impl GitHubTracker {
    pub fn new(
        api_url: &str,
        repository: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TrackerError> {
        let api_url = api_url.trim_end_matches('/');
        url::Url::parse(api_url)
            .map_err(|e| TrackerError::Other(format!("invalid API URL {api_url}: {e}")))?;
        let (owner, repo) = parse_repository(repository)?;

        let client = Client::builder()
            .user_agent(concat!("kiro-bridge/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| TrackerError::Other(format!("HTTP client init: {e}")))?;

        Ok(Self {
            api_url: api_url.to_string(),
            owner,
            repo,
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn repo_url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}{path}", self.api_url, self.owner, self.repo)
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, TrackerError> {
        self.with_auth(builder)
            .send()
            .await
            .map_err(|e| TrackerError::Request(e.to_string()))
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: String,
        body: &B,
        operation: &str,
    ) -> Result<T, TrackerError> {
        let resp = self.send(self.client.post(url).json(body)).await?;
        handle_response(resp, operation).await
    }

    async fn patch_json<B: Serialize + ?Sized>(
        &self,
        url: String,
        body: &B,
        operation: &str,
    ) -> Result<(), TrackerError> {
        let resp = self.send(self.client.patch(url).json(body)).await?;
        check_status(resp, operation).await.map(|_| ())
    }
}

/// Parse `owner/repo` or a GitHub web/clone URL into its two path segments.
fn parse_repository(repository: &str) -> Result<(String, String), TrackerError> {
    let trimmed = repository.trim().trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    let path = if let Some(rest) = trimmed.strip_prefix("git@") {
        rest.split_once(':').map(|(_, p)| p.to_string())
    } else if trimmed.contains("://") {
        let parsed = url::Url::parse(trimmed)
            .map_err(|e| TrackerError::Other(format!("invalid repository URL: {e}")))?;
        Some(parsed.path().trim_start_matches('/').to_string())
    } else {
        Some(trimmed.to_string())
    };

    let path = path.unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() != 2 {
        return Err(TrackerError::Other(format!(
            "repository must be owner/repo, got {repository:?}"
        )));
    }
    Ok((segments[0].to_string(), segments[1].to_string()))
}

async fn check_status(resp: Response, operation: &str) -> Result<Response, TrackerError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    if status.as_u16() == 401 {
        return Err(TrackerError::AuthFailed(format!("{operation}: {body}")));
    }
    Err(TrackerError::Status {
        operation: operation.to_string(),
        status: status.as_u16(),
        body,
    })
}

async fn handle_response<T: DeserializeOwned>(
    resp: Response,
    operation: &str,
) -> Result<T, TrackerError> {
    let resp = check_status(resp, operation).await?;
    resp.json()
        .await
        .map_err(|e| TrackerError::Decode(format!("{operation} response: {e}")))
}

#[async_trait]
impl Tracker for GitHubTracker {
    fn name(&self) -> &str {
        "github"
    }

    async fn create_milestone(&self, title: &str, description: &str) -> Result<u64, TrackerError> {
        #[derive(Serialize)]
        struct CreateMilestone<'a> {
            title: &'a str,
            description: &'a str,
        }

        let milestone: GhMilestone = self
            .post_json(
                self.repo_url("/milestones"),
                &CreateMilestone { title, description },
                "create milestone",
            )
            .await?;
        info!("created milestone {title:?} (#{})", milestone.number);
        Ok(milestone.number)
    }

    async fn create_issue(&self, issue: &NewIssue) -> Result<IssueRef, TrackerError> {
        #[derive(Serialize)]
        struct CreateIssue<'a> {
            title: &'a str,
            body: &'a str,
            labels: &'a [String],
            #[serde(skip_serializing_if = "Option::is_none")]
            milestone: Option<u64>,
        }

        let created: GhIssue = self
            .post_json(
                self.repo_url("/issues"),
                &CreateIssue {
                    title: &issue.title,
                    body: &issue.body,
                    labels: &issue.labels,
                    milestone: issue.milestone,
                },
                "create issue",
            )
            .await?;
        debug!("created issue #{}: {}", created.number, created.title);
        Ok(created.into())
    }

    async fn close_issue(&self, number: u64, reason: CloseReason) -> Result<(), TrackerError> {
        #[derive(Serialize)]
        struct CloseIssue<'a> {
            state: &'a str,
            state_reason: &'a str,
        }

        self.patch_json(
            self.repo_url(&format!("/issues/{number}")),
            &CloseIssue {
                state: IssueState::Closed.as_str(),
                state_reason: reason.as_str(),
            },
            "close issue",
        )
        .await
    }

    async fn search_issues(&self, query: &IssueQuery) -> Result<Vec<IssueRef>, TrackerError> {
        let q = format!(
            "repo:{}/{} is:issue is:{} in:title \"{}\"",
            self.owner,
            self.repo,
            query.state.as_str(),
            query.title_contains.replace('"', "")
        );
        let url = format!("{}/search/issues", self.api_url);
        let resp = self
            .send(
                self.client
                    .get(url)
                    .query(&[("q", q.as_str()), ("per_page", "100")]),
            )
            .await?;
        let results: GhSearchResults = handle_response(resp, "search issues").await?;

        // Search is tokenised and fuzzy; keep only literal title matches.
        let issues: Vec<IssueRef> = results
            .items
            .into_iter()
            .filter(|item| item.pull_request.is_none())
            .map(IssueRef::from)
            .filter(|issue| query.matches(issue))
            .collect();
        debug!("search {q:?}: {} matching issues", issues.len());
        Ok(issues)
    }

    async fn comment_on_issue(&self, number: u64, body: &str) -> Result<(), TrackerError> {
        #[derive(Serialize)]
        struct CommentBody<'a> {
            body: &'a str,
        }

        let resp = self
            .send(
                self.client
                    .post(self.repo_url(&format!("/issues/{number}/comments")))
                    .json(&CommentBody { body }),
            )
            .await?;
        check_status(resp, "comment on issue").await.map(|_| ())
    }

    async fn link_sub_issue(&self, parent: u64, child: &IssueRef) -> Result<(), TrackerError> {
        #[derive(Serialize)]
        struct SubIssue {
            sub_issue_id: u64,
        }

        let sub_issue_id = child.id.ok_or_else(|| {
            TrackerError::Unsupported(format!("issue #{} has no global id", child.number))
        })?;
        let resp = self
            .send(
                self.client
                    .post(self.repo_url(&format!("/issues/{parent}/sub_issues")))
                    .json(&SubIssue { sub_issue_id }),
            )
            .await?;
        check_status(resp, "link sub-issue").await.map(|_| ())
    }

    async fn search_pull_requests(
        &self,
        head: &str,
        base: &str,
    ) -> Result<Vec<PullRequestRef>, TrackerError> {
        let head_filter = format!("{}:{head}", self.owner);
        let resp = self
            .send(self.client.get(self.repo_url("/pulls")).query(&[
                ("state", "open"),
                ("head", head_filter.as_str()),
                ("base", base),
            ]))
            .await?;
        let pulls: Vec<GhPull> = handle_response(resp, "list pull requests").await?;
        Ok(pulls.into_iter().map(PullRequestRef::from).collect())
    }

    async fn create_pull_request(
        &self,
        pr: &NewPullRequest,
    ) -> Result<PullRequestRef, TrackerError> {
        #[derive(Serialize)]
        struct CreatePr<'a> {
            title: &'a str,
            body: &'a str,
            head: &'a str,
            base: &'a str,
        }

        let created: GhPull = self
            .post_json(
                self.repo_url("/pulls"),
                &CreatePr {
                    title: &pr.title,
                    body: &pr.body,
                    head: &pr.head,
                    base: &pr.base,
                },
                "create pull request",
            )
            .await?;
        info!("opened PR #{}: {}", created.number, created.html_url);
        Ok(created.into())
    }

    async fn label_pull_request(
        &self,
        number: u64,
        labels: &[String],
        milestone: Option<u64>,
    ) -> Result<(), TrackerError> {
        #[derive(Serialize)]
        struct UpdateIssue<'a> {
            labels: &'a [String],
            #[serde(skip_serializing_if = "Option::is_none")]
            milestone: Option<u64>,
        }

        // The pulls endpoint takes neither labels nor milestone; a PR is an
        // issue, so set them through the issues endpoint.
        self.patch_json(
            self.repo_url(&format!("/issues/{number}")),
            &UpdateIssue { labels, milestone },
            "label pull request",
        )
        .await
    }
}

// GitHub API response structs

#[derive(Deserialize)]
struct GhMilestone {
    number: u64,
}

#[derive(Deserialize)]
struct GhIssue {
    id: u64,
    number: u64,
    title: String,
    state: String,
    milestone: Option<GhMilestone>,
    /// Present when a search hit is actually a pull request.
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl From<GhIssue> for IssueRef {
    fn from(issue: GhIssue) -> Self {
        IssueRef {
            number: issue.number,
            id: Some(issue.id),
            title: issue.title,
            milestone: issue.milestone.map(|m| m.number),
            state: IssueState::parse_str(&issue.state).unwrap_or(IssueState::Open),
        }
    }
}

#[derive(Deserialize)]
struct GhSearchResults {
    items: Vec<GhIssue>,
}

#[derive(Deserialize)]
struct GhBranchRef {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Deserialize)]
struct GhPull {
    number: u64,
    html_url: String,
    head: GhBranchRef,
    base: GhBranchRef,
}

impl From<GhPull> for PullRequestRef {
    fn from(pr: GhPull) -> Self {
        PullRequestRef {
            number: pr.number,
            url: pr.html_url,
            head: pr.head.name,
            base: pr.base.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_repository_owner_repo() {
        let (owner, repo) = parse_repository("acme/widgets").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "widgets");
    }

    #[test]
    fn parse_repository_https_url() {
        let (owner, repo) = parse_repository("https://github.com/acme/widgets.git").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "widgets");
    }

    #[test]
    fn parse_repository_ssh_url() {
        let (owner, repo) = parse_repository("git@github.com:acme/widgets.git").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "widgets");
    }

    #[test]
    fn parse_repository_rejects_bare_name() {
        assert!(parse_repository("widgets").is_err());
        assert!(parse_repository("a/b/c").is_err());
    }

    #[test]
    fn construction_trims_api_url() {
        let tracker = GitHubTracker::new(
            "https://ghe.example.com/api/v3/",
            "acme/widgets",
            Some("ghp_test".into()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(tracker.name(), "github");
        assert_eq!(tracker.repository(), "acme/widgets");
        assert_eq!(
            tracker.repo_url("/issues"),
            "https://ghe.example.com/api/v3/repos/acme/widgets/issues"
        );
    }

    #[test]
    fn empty_token_is_anonymous() {
        let tracker = GitHubTracker::new(
            DEFAULT_API_URL,
            "acme/widgets",
            Some(String::new()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(tracker.token.is_none());
    }

    #[test]
    fn invalid_api_url_rejected() {
        let err = GitHubTracker::new("not a url", "acme/widgets", None, Duration::from_secs(5))
            .unwrap_err();
        assert!(err.to_string().contains("invalid API URL"));
    }
}
