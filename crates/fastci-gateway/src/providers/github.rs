//! GitHub payload adapter.

use fastci_core::{EventType, NormalizedEvent};
use serde::Deserialize;

/// Normalize a GitHub webhook, dispatching on the `X-GitHub-Event` value.
pub fn normalize(event_type: &str, body: &[u8]) -> Result<NormalizedEvent, String> {
    match event_type {
        "push" => serde_json::from_slice::<GitHubPushPayload>(body)
            .map_err(|e| format!("malformed github push payload: {e}"))?
            .into_event(),
        "pull_request" => serde_json::from_slice::<GitHubPullRequestPayload>(body)
            .map_err(|e| format!("malformed github pull_request payload: {e}"))?
            .into_event(),
        other => Err(format!("event_type = {other} not allowed")),
    }
}

#[derive(Debug, Deserialize)]
pub struct GitHubPushPayload {
    #[serde(rename = "ref")]
    git_ref: String,
    compare: String,
    repository: Repository,
    head_commit: HeadCommit,
}

#[derive(Debug, Deserialize)]
struct Repository {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct HeadCommit {
    id: String,
    message: String,
    timestamp: String,
    url: String,
    author: Signature,
    committer: Signature,
}

#[derive(Debug, Deserialize)]
struct Signature {
    name: String,
    email: Option<String>,
}

impl GitHubPushPayload {
    fn into_event(self) -> Result<NormalizedEvent, String> {
        // Tag pushes and branch deletions carry other ref shapes and are
        // not buildable.
        let branch = self
            .git_ref
            .strip_prefix("refs/heads/")
            .ok_or_else(|| format!("ref {} is not a branch push", self.git_ref))?
            .to_string();

        Ok(NormalizedEvent {
            event_type: EventType::Push,
            commit_hash: self.head_commit.id,
            branch,
            src_branch: None,
            repo_url: self.repository.html_url,
            message: self.head_commit.message,
            author: self.head_commit.author.name,
            email: self.head_commit.author.email,
            authored_date: self.head_commit.timestamp.clone(),
            committer: Some(self.head_commit.committer.name),
            committed_date: Some(self.head_commit.timestamp),
            url: self.head_commit.url,
            compare: Some(self.compare),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct GitHubPullRequestPayload {
    pull_request: PullRequest,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    body: Option<String>,
    created_at: String,
    user: User,
    head: GitRef,
    base: GitRef,
}

#[derive(Debug, Deserialize)]
struct User {
    login: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GitRef {
    #[serde(rename = "ref")]
    branch: String,
    sha: String,
}

impl GitHubPullRequestPayload {
    fn into_event(self) -> Result<NormalizedEvent, String> {
        let pr = self.pull_request;
        Ok(NormalizedEvent {
            event_type: EventType::PullRequest,
            commit_hash: pr.head.sha,
            branch: pr.base.branch,
            src_branch: Some(pr.head.branch),
            repo_url: self.repository.html_url,
            message: pr.body.unwrap_or_default(),
            author: pr.user.login,
            email: None,
            authored_date: pr.created_at,
            committer: None,
            committed_date: None,
            url: pr.user.url,
            compare: None,
        })
    }
}
