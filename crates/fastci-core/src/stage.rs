//! Per-stage result records for the build pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage role identifiers, as they appear in run reports.
pub mod role {
    pub const LOAD: &str = "github/webhook_read";
    pub const CLONE: &str = "git/clone_code";
    pub const TEST: &str = "docker/unit_test";
    pub const BUILD: &str = "docker/build";
    pub const PUSH: &str = "docker/push";
    pub const SCAN: &str = "security/scan";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    InProgress,
    Completed,
    Failed,
}

/// Outcome record for one pipeline stage.
///
/// A record starts in progress and transitions to completed or failed
/// exactly once; the finishing methods consume the in-progress value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub role: String,
    pub human_description: String,
    pub status: StageStatus,
    pub start_time: DateTime<Utc>,
    pub log: String,
}

impl StageResult {
    /// Start a stage record in the in-progress state.
    pub fn begin(role: &str, human_description: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            human_description: human_description.into(),
            status: StageStatus::InProgress,
            start_time: Utc::now(),
            log: String::new(),
        }
    }

    pub fn complete(mut self, log: impl Into<String>) -> Self {
        debug_assert_eq!(self.status, StageStatus::InProgress);
        self.status = StageStatus::Completed;
        self.log = log.into();
        self
    }

    pub fn fail(mut self, log: impl Into<String>) -> Self {
        debug_assert_eq!(self.status, StageStatus::InProgress);
        self.status = StageStatus::Failed;
        self.log = log.into();
        self
    }

    pub fn failed(&self) -> bool {
        self.status == StageStatus::Failed
    }
}
