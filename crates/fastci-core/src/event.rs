//! Normalized webhook event types.

use serde::{Deserialize, Serialize};

/// Webhook event kind accepted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Push,
    PullRequest,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Push => write!(f, "push"),
            EventType::PullRequest => write!(f, "pull_request"),
        }
    }
}

/// Provider-agnostic representation of an accepted webhook.
///
/// `event_type` and `commit_hash` are present in every event that reaches
/// the queue; normalization fails instead of producing a partial event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub event_type: EventType,
    pub commit_hash: String,
    /// Destination/target branch.
    pub branch: String,
    /// Source branch, set only for pull requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src_branch: Option<String>,
    pub repo_url: String,
    pub message: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub authored_date: String,
    pub committer: Option<String>,
    pub committed_date: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare: Option<String>,
}

impl NormalizedEvent {
    /// Ref the clone stage must check out. The source branch of a pull
    /// request takes precedence over the destination branch.
    pub fn checkout_ref(&self) -> &str {
        match (self.event_type, &self.src_branch) {
            (EventType::PullRequest, Some(src)) => src,
            _ => &self.branch,
        }
    }

    /// Image tag derived from the commit hash.
    pub fn image_tag(&self) -> &str {
        &self.commit_hash[..self.commit_hash.len().min(6)]
    }
}
