//! Contracts for the external build tools.
//!
//! The orchestrator never shells out directly; it talks to git and the
//! image toolchain through these traits, so the pipeline can be exercised
//! against recording fakes. Every invocation resolves to a [`ToolReport`]
//! rather than an error: a failing tool is a normal pipeline outcome.

use async_trait::async_trait;
use std::time::Duration;

/// Classified end state of an external tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    /// The tool ran to completion with the given exit code.
    Exited { code: i32 },
    /// The tool was killed after exceeding its allotted time.
    TimedOut { after: Duration },
    /// The tool binary could not be found on the host.
    NotFound { tool: String },
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolStatus::Exited { code } => write!(f, "exit code {code}"),
            ToolStatus::TimedOut { after } => {
                write!(f, "timed out after {}s", after.as_secs())
            }
            ToolStatus::NotFound { tool } => write!(f, "tool not found: {tool}"),
        }
    }
}

/// Result of one external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolReport {
    pub status: ToolStatus,
    pub log: String,
}

impl ToolReport {
    pub fn exited(code: i32, log: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::Exited { code },
            log: log.into(),
        }
    }

    pub fn timed_out(after: Duration, log: impl Into<String>) -> Self {
        Self {
            status: ToolStatus::TimedOut { after },
            log: log.into(),
        }
    }

    pub fn not_found(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        let log = format!("could not locate {tool} on this host");
        Self {
            status: ToolStatus::NotFound { tool },
            log,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.status, ToolStatus::Exited { code: 0 })
    }
}

/// What the clone stage needs to materialize a working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSpec {
    pub repo_url: String,
    pub commit_hash: String,
    /// Branch to clone; already resolved to the pull-request source branch
    /// when applicable.
    pub branch: String,
}

/// Clones repositories into the build directory.
#[async_trait]
pub trait GitClient: Send + Sync {
    /// Clone the repository at the given branch and check out the commit.
    async fn clone_repo(&self, spec: &CheckoutSpec) -> ToolReport;
}

/// Builds, pushes and scans container images.
#[async_trait]
pub trait ImageTool: Send + Sync {
    /// Build the image from `dockerfile`, tagging both the commit tag and
    /// `latest`.
    async fn build(&self, dockerfile: &str, tag: &str) -> ToolReport;

    /// Authenticate to the registry and push the commit-tagged image.
    async fn push(&self, tag: &str) -> ToolReport;

    /// Scan the commit-tagged image. Reports `NotFound` when the scanner
    /// is missing from the host.
    async fn scan(&self, tag: &str) -> ToolReport;
}
