//! Webhook gateway configuration.

use crate::{ConfigResult, DEFAULT_QUEUE_DIR, parse_opt, parse_or, required};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

const GITHUB_META_URL: &str = "https://api.github.com/meta";
const BITBUCKET_RANGES_URL: &str = "https://ip-ranges.atlassian.com";

/// Everything the webhook gateway needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    pub queue_dir: PathBuf,
    /// Path-embedded identifier a caller must present.
    pub trigger_id: String,
    /// The single branch builds are triggered for.
    pub trigger_branch: String,
    /// Shared webhook secret; signature checking is skipped when the
    /// caller presents no signature header.
    pub secret: Option<String>,
    /// Operator override: when set, this exact address is the entire
    /// source allow-list and provider IP ranges are never fetched.
    pub source_override: Option<IpAddr>,
    pub github_meta_url: String,
    pub bitbucket_ranges_url: String,
}

impl GatewayConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable source. Tests
    /// pass a map-backed closure instead of mutating the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        Ok(Self {
            listen_addr: parse_or(
                &lookup,
                "FASTCI_LISTEN_ADDR",
                SocketAddr::from(([0, 0, 0, 0], 8021)),
            )?,
            queue_dir: lookup("FASTCI_QUEUE_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_QUEUE_DIR)),
            trigger_id: required(&lookup, "FASTCI_TRIGGER_ID")?,
            trigger_branch: required(&lookup, "FASTCI_TRIGGER_BRANCH")?,
            secret: lookup("FASTCI_TRIGGER_SECRET").filter(|v| !v.is_empty()),
            source_override: parse_opt(&lookup, "FASTCI_SOURCE_OVERRIDE")?,
            github_meta_url: lookup("FASTCI_GITHUB_META_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| GITHUB_META_URL.to_string()),
            bitbucket_ranges_url: lookup("FASTCI_BITBUCKET_RANGES_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| BITBUCKET_RANGES_URL.to_string()),
        })
    }
}
