//! Integration tests for `GitHubTracker` against an in-process fake of the
//! GitHub REST API.
//!
//! Each test spawns an axum server on a random port, points the tracker at it,
//! and inspects the requests the fake recorded.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use kiro_bridge_core::issue::{CloseReason, IssueQuery, NewIssue, NewPullRequest};
use kiro_bridge_core::{IssueState, TrackerError};
use kiro_bridge_tracker::{GitHubTracker, Tracker};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
struct Recorded {
    method: &'static str,
    path: String,
    body: Value,
    authorization: Option<String>,
}

#[derive(Default)]
struct Fake {
    requests: Vec<Recorded>,
    next_number: u64,
    /// Answer issue PATCHes with 422, as GitHub does for an unknown milestone.
    reject_updates: bool,
}

type Shared = Arc<Mutex<Fake>>;

fn record(state: &Shared, method: &'static str, path: String, body: Value, headers: &HeaderMap) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.lock().unwrap().requests.push(Recorded {
        method,
        path,
        body,
        authorization,
    });
}

fn next_number(state: &Shared) -> u64 {
    let mut fake = state.lock().unwrap();
    fake.next_number += 1;
    fake.next_number
}

async fn create_milestone(
    State(state): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "POST", format!("/repos/{owner}/{repo}/milestones"), body.clone(), &headers);
    (
        StatusCode::CREATED,
        Json(json!({ "number": 3, "title": body["title"] })),
    )
}

async fn create_issue(
    State(state): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "POST", format!("/repos/{owner}/{repo}/issues"), body.clone(), &headers);
    if body["title"].as_str() == Some("reject me") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Validation Failed" })),
        );
    }
    let number = next_number(&state);
    let milestone = body["milestone"]
        .as_u64()
        .map(|m| json!({ "number": m }))
        .unwrap_or(Value::Null);
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 5000 + number,
            "number": number,
            "title": body["title"],
            "state": "open",
            "milestone": milestone,
        })),
    )
}

async fn update_issue(
    State(state): State<Shared>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "PATCH", format!("/repos/{owner}/{repo}/issues/{number}"), body, &headers);
    if state.lock().unwrap().reject_updates {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "Validation Failed" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({ "id": 5000 + number, "number": number, "title": "x", "state": "closed" })),
    )
}

async fn comment(
    State(state): State<Shared>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(
        &state,
        "POST",
        format!("/repos/{owner}/{repo}/issues/{number}/comments"),
        body,
        &headers,
    );
    (StatusCode::CREATED, Json(json!({ "id": 1 })))
}

async fn sub_issue(
    State(state): State<Shared>,
    Path((owner, repo, number)): Path<(String, String, u64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(
        &state,
        "POST",
        format!("/repos/{owner}/{repo}/issues/{number}/sub_issues"),
        body,
        &headers,
    );
    (StatusCode::CREATED, Json(json!({ "number": number })))
}

async fn search_issues(
    State(state): State<Shared>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    let q = params.get("q").cloned().unwrap_or_default();
    record(&state, "GET", "/search/issues".into(), json!({ "q": q }), &headers);
    // GitHub search is fuzzy: "Task 1:" also hits "Task 11:" and PRs.
    Json(json!({
        "total_count": 3,
        "items": [
            { "id": 9011, "number": 11, "title": "Task 11: Later work", "state": "open", "milestone": null },
            { "id": 9001, "number": 1, "title": "Task 1: Setup", "state": "open", "milestone": { "number": 3 } },
            { "id": 9002, "number": 2, "title": "Task 1: Setup", "state": "open", "milestone": null,
              "pull_request": { "url": "https://api.github.com/repos/acme/widgets/pulls/2" } }
        ]
    }))
}

async fn list_pulls(
    State(state): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    record(
        &state,
        "GET",
        format!("/repos/{owner}/{repo}/pulls"),
        json!(params),
        &headers,
    );
    if params.get("head").map(String::as_str) == Some("acme:feature/task-04") {
        Json(json!([{
            "number": 77,
            "html_url": "https://github.com/acme/widgets/pull/77",
            "head": { "ref": "feature/task-04" },
            "base": { "ref": "main" }
        }]))
    } else {
        Json(json!([]))
    }
}

async fn create_pull(
    State(state): State<Shared>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&state, "POST", format!("/repos/{owner}/{repo}/pulls"), body.clone(), &headers);
    (
        StatusCode::CREATED,
        Json(json!({
            "number": 78,
            "html_url": "https://github.com/acme/widgets/pull/78",
            "head": { "ref": body["head"] },
            "base": { "ref": body["base"] }
        })),
    )
}

async fn spawn_fake() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(Fake::default()));
    let app = Router::new()
        .route("/repos/{owner}/{repo}/milestones", post(create_milestone))
        .route("/repos/{owner}/{repo}/issues", post(create_issue))
        .route("/repos/{owner}/{repo}/issues/{number}", patch(update_issue))
        .route("/repos/{owner}/{repo}/issues/{number}/comments", post(comment))
        .route("/repos/{owner}/{repo}/issues/{number}/sub_issues", post(sub_issue))
        .route("/repos/{owner}/{repo}/pulls", get(list_pulls).post(create_pull))
        .route("/search/issues", get(search_issues))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

fn tracker(base_url: &str) -> GitHubTracker {
    GitHubTracker::new(
        base_url,
        "acme/widgets",
        Some("ghp_test".into()),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn requests(state: &Shared) -> Vec<Recorded> {
    state.lock().unwrap().requests.clone()
}

fn task_pr() -> NewPullRequest {
    NewPullRequest {
        title: "Setup".into(),
        body: "Resolves #1".into(),
        head: "feature/task-01".into(),
        base: "main".into(),
    }
}

#[tokio::test]
async fn create_milestone_posts_title_and_description() {
    let (url, state) = spawn_fake().await;
    let number = tracker(&url)
        .create_milestone("Sprint 1", "Auto-generated")
        .await
        .unwrap();
    assert_eq!(number, 3);

    let reqs = requests(&state);
    assert_eq!(reqs.len(), 1);
    assert_eq!(reqs[0].path, "/repos/acme/widgets/milestones");
    assert_eq!(reqs[0].body["title"], "Sprint 1");
    assert_eq!(reqs[0].body["description"], "Auto-generated");
    assert_eq!(reqs[0].authorization.as_deref(), Some("Bearer ghp_test"));
}

#[tokio::test]
async fn create_issue_sends_labels_and_milestone() {
    let (url, state) = spawn_fake().await;
    let issue = tracker(&url)
        .create_issue(&NewIssue {
            title: "Task 1: Setup".into(),
            body: "body".into(),
            labels: vec!["task".into(), "enhancement".into()],
            milestone: Some(3),
        })
        .await
        .unwrap();
    assert_eq!(issue.number, 1);
    assert_eq!(issue.id, Some(5001));
    assert_eq!(issue.milestone, Some(3));
    assert_eq!(issue.state, IssueState::Open);

    let body = &requests(&state)[0].body;
    assert_eq!(body["labels"], json!(["task", "enhancement"]));
    assert_eq!(body["milestone"], 3);
}

#[tokio::test]
async fn create_issue_omits_absent_milestone() {
    let (url, state) = spawn_fake().await;
    tracker(&url)
        .create_issue(&NewIssue {
            title: "Epic: Widgets".into(),
            body: "body".into(),
            labels: vec!["epic".into()],
            milestone: None,
        })
        .await
        .unwrap();
    let body = &requests(&state)[0].body;
    assert!(body.get("milestone").is_none());
}

#[tokio::test]
async fn create_issue_error_status_surfaces() {
    let (url, _state) = spawn_fake().await;
    let err = tracker(&url)
        .create_issue(&NewIssue {
            title: "reject me".into(),
            body: String::new(),
            labels: Vec::new(),
            milestone: None,
        })
        .await
        .unwrap_err();
    match err {
        TrackerError::Status { status, body, .. } => {
            assert_eq!(status, 422);
            assert!(body.contains("Validation Failed"));
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn close_issue_patches_state_reason() {
    let (url, state) = spawn_fake().await;
    tracker(&url)
        .close_issue(4, CloseReason::Completed)
        .await
        .unwrap();
    let reqs = requests(&state);
    assert_eq!(reqs[0].method, "PATCH");
    assert_eq!(reqs[0].path, "/repos/acme/widgets/issues/4");
    assert_eq!(reqs[0].body["state"], "closed");
    assert_eq!(reqs[0].body["state_reason"], "completed");
}

#[tokio::test]
async fn search_issues_filters_fuzzy_hits_and_prs() {
    let (url, state) = spawn_fake().await;
    let hits = tracker(&url)
        .search_issues(&IssueQuery::open_with_title("Task 1:"))
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].number, 1);
    assert_eq!(hits[0].milestone, Some(3));

    let q = requests(&state)[0].body["q"].as_str().unwrap().to_string();
    assert!(q.contains("repo:acme/widgets"));
    assert!(q.contains("is:issue"));
    assert!(q.contains("is:open"));
    assert!(q.contains("\"Task 1:\""));
}

#[tokio::test]
async fn search_pull_requests_qualifies_head_with_owner() {
    let (url, state) = spawn_fake().await;
    let t = tracker(&url);
    let found = t.search_pull_requests("feature/task-04", "main").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].number, 77);
    assert_eq!(found[0].head, "feature/task-04");

    let none = t.search_pull_requests("feature/task-05", "main").await.unwrap();
    assert!(none.is_empty());

    let reqs = requests(&state);
    assert_eq!(reqs[0].body["head"], "acme:feature/task-04");
    assert_eq!(reqs[0].body["base"], "main");
    assert_eq!(reqs[0].body["state"], "open");
}

#[tokio::test]
async fn create_pull_request_then_labels_via_issues_endpoint() {
    let (url, state) = spawn_fake().await;
    let t = tracker(&url);
    let pr = t.create_pull_request(&task_pr()).await.unwrap();
    assert_eq!(pr.number, 78);
    assert_eq!(pr.head, "feature/task-01");
    assert_eq!(requests(&state).len(), 1);

    t.label_pull_request(pr.number, &["task".to_string(), "kiro-generated".to_string()], Some(3))
        .await
        .unwrap();

    let reqs = requests(&state);
    assert_eq!(reqs.len(), 2);
    assert_eq!(reqs[0].path, "/repos/acme/widgets/pulls");
    assert!(reqs[0].body.get("labels").is_none());
    assert_eq!(reqs[1].method, "PATCH");
    assert_eq!(reqs[1].path, "/repos/acme/widgets/issues/78");
    assert_eq!(reqs[1].body["labels"], json!(["task", "kiro-generated"]));
    assert_eq!(reqs[1].body["milestone"], 3);
}

#[tokio::test]
async fn rejected_labels_leave_pr_created() {
    let (url, state) = spawn_fake().await;
    state.lock().unwrap().reject_updates = true;
    let t = tracker(&url);

    let pr = t.create_pull_request(&task_pr()).await.unwrap();
    assert_eq!(pr.number, 78);

    let err = t
        .label_pull_request(pr.number, &["task".to_string()], Some(99))
        .await
        .unwrap_err();
    match err {
        TrackerError::Status {
            operation, status, ..
        } => {
            assert_eq!(operation, "label pull request");
            assert_eq!(status, 422);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let reqs = requests(&state);
    assert_eq!(reqs.len(), 2);
    assert_eq!(reqs[1].body["milestone"], 99);
}

#[tokio::test]
async fn comment_and_sub_issue_link() {
    let (url, state) = spawn_fake().await;
    let t = tracker(&url);
    t.comment_on_issue(1, "Pull Request created: #78")
        .await
        .unwrap();
    let child = t
        .create_issue(&NewIssue {
            title: "Task 2: Child".into(),
            body: String::new(),
            labels: Vec::new(),
            milestone: None,
        })
        .await
        .unwrap();
    t.link_sub_issue(10, &child).await.unwrap();

    let reqs = requests(&state);
    assert_eq!(reqs[0].path, "/repos/acme/widgets/issues/1/comments");
    assert_eq!(reqs[0].body["body"], "Pull Request created: #78");
    assert_eq!(reqs[2].path, "/repos/acme/widgets/issues/10/sub_issues");
    assert_eq!(reqs[2].body["sub_issue_id"], 5001);
}

#[tokio::test]
async fn unreachable_server_is_request_error() {
    let t = GitHubTracker::new(
        "http://127.0.0.1:9",
        "acme/widgets",
        None,
        Duration::from_secs(2),
    )
    .unwrap();
    let err = t.create_milestone("M", "").await.unwrap_err();
    assert!(matches!(err, TrackerError::Request(_)));
}
