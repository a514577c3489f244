//! Bitbucket payload adapter.

use fastci_core::{EventType, NormalizedEvent};
use serde::Deserialize;

/// Normalize a Bitbucket webhook, dispatching on the `X-Event-Key` value.
///
/// Only `repo:push` and `pullrequest:created` trigger builds;
/// `pullrequest:updated` and everything else is rejected.
pub fn normalize(event_key: &str, body: &[u8]) -> Result<NormalizedEvent, String> {
    match event_key {
        "repo:push" => serde_json::from_slice::<BitbucketPushPayload>(body)
            .map_err(|e| format!("malformed bitbucket push payload: {e}"))?
            .into_event(),
        "pullrequest:created" => serde_json::from_slice::<BitbucketPullRequestPayload>(body)
            .map_err(|e| format!("malformed bitbucket pullrequest payload: {e}"))?
            .into_event(),
        other => Err(format!("event_type = {other} not allowed")),
    }
}

/// Pull the email out of a raw `Name <email>` author string, falling back
/// to the raw string when the brackets are missing.
fn email_from_raw(raw: &str) -> String {
    raw.split_once('<')
        .and_then(|(_, rest)| rest.split_once('>'))
        .map(|(email, _)| email.trim().to_string())
        .unwrap_or_else(|| raw.to_string())
}

#[derive(Debug, Deserialize)]
pub struct BitbucketPushPayload {
    push: Push,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct Push {
    changes: Vec<Change>,
}

#[derive(Debug, Deserialize)]
struct Change {
    commits: Vec<Commit>,
    new: BranchRef,
    links: HtmlLinks,
}

#[derive(Debug, Deserialize)]
struct BranchRef {
    name: String,
}

#[derive(Debug, Deserialize)]
struct HtmlLinks {
    html: Href,
}

#[derive(Debug, Deserialize)]
struct Href {
    href: String,
}

#[derive(Debug, Deserialize)]
struct Commit {
    hash: String,
    message: String,
    date: String,
    author: Author,
    links: HtmlLinks,
}

#[derive(Debug, Deserialize)]
struct Author {
    raw: String,
    user: Option<AccountRef>,
}

#[derive(Debug, Deserialize)]
struct AccountRef {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct Repository {
    links: HtmlLinks,
}

impl BitbucketPushPayload {
    fn into_event(self) -> Result<NormalizedEvent, String> {
        let change = self
            .push
            .changes
            .into_iter()
            .next()
            .ok_or_else(|| "push payload contains no changes".to_string())?;
        let commit = change
            .commits
            .into_iter()
            .next()
            .ok_or_else(|| "push payload contains no commits".to_string())?;

        let author = match commit.author.user {
            Some(user) => user.display_name,
            None => commit.author.raw.clone(),
        };
        let email = email_from_raw(&commit.author.raw);

        Ok(NormalizedEvent {
            event_type: EventType::Push,
            commit_hash: commit.hash,
            branch: change.new.name,
            src_branch: None,
            repo_url: self.repository.links.html.href,
            message: commit.message,
            author: author.clone(),
            email: Some(email),
            authored_date: commit.date.clone(),
            committer: Some(author),
            committed_date: Some(commit.date),
            url: commit.links.html.href,
            compare: Some(change.links.html.href),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct BitbucketPullRequestPayload {
    pullrequest: PullRequest,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    title: String,
    created_on: String,
    author: AccountRef,
    source: PrSource,
    destination: PrDestination,
}

#[derive(Debug, Deserialize)]
struct PrSource {
    branch: BranchRef,
    commit: PrCommit,
}

#[derive(Debug, Deserialize)]
struct PrDestination {
    branch: BranchRef,
    commit: PrCommit,
    repository: Repository,
}

#[derive(Debug, Deserialize)]
struct PrCommit {
    hash: String,
    links: HtmlLinks,
}

impl BitbucketPullRequestPayload {
    fn into_event(self) -> Result<NormalizedEvent, String> {
        let pr = self.pullrequest;
        let repo_url = pr.destination.repository.links.html.href;
        let compare = format!(
            "{repo_url}/branches/compare/{}..{}",
            pr.source.commit.hash, pr.destination.commit.hash
        );

        Ok(NormalizedEvent {
            event_type: EventType::PullRequest,
            commit_hash: pr.source.commit.hash,
            branch: pr.destination.branch.name,
            src_branch: Some(pr.source.branch.name),
            repo_url,
            message: pr.title,
            author: pr.author.display_name,
            email: None,
            authored_date: pr.created_on,
            committer: None,
            committed_date: None,
            url: pr.source.commit.links.html.href,
            compare: Some(compare),
        })
    }
}
