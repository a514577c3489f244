//! Provider adapters: payload normalization and published IP ranges.

pub mod bitbucket;
pub mod github;
pub mod ranges;

use axum::http::HeaderMap;
use fastci_core::NormalizedEvent;
use url::Url;

const GITHUB_EVENT_HEADER: &str = "X-GitHub-Event";
const BITBUCKET_EVENT_HEADER: &str = "X-Event-Key";

/// Webhook source provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Github,
    Bitbucket,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Github => write!(f, "github"),
            Provider::Bitbucket => write!(f, "bitbucket"),
        }
    }
}

impl Provider {
    /// Sniff the provider from the request user-agent. Bitbucket announces
    /// itself (`Bitbucket-Webhooks/2.0`); anything else is taken for
    /// GitHub.
    pub fn from_user_agent(user_agent: &str) -> Self {
        if user_agent.to_ascii_lowercase().contains("bitbucket") {
            Provider::Bitbucket
        } else {
            Provider::Github
        }
    }
}

/// Normalize a raw webhook payload into the internal event shape.
///
/// Dispatches on the provider's event header and rejects any event kind
/// other than a push or a newly created pull request.
pub fn normalize(
    provider: Provider,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<NormalizedEvent, String> {
    let event = match provider {
        Provider::Github => {
            let event_type = headers
                .get(GITHUB_EVENT_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| format!("missing {GITHUB_EVENT_HEADER} header"))?;
            github::normalize(event_type, body)?
        }
        Provider::Bitbucket => {
            let event_key = headers
                .get(BITBUCKET_EVENT_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| format!("missing {BITBUCKET_EVENT_HEADER} header"))?;
            bitbucket::normalize(event_key, body)?
        }
    };

    Url::parse(&event.repo_url)
        .map_err(|e| format!("repository url {} is not valid: {e}", event.repo_url))?;
    Ok(event)
}
