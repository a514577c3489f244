//! The build pipeline: load → clone → test → build → push → scan.
//!
//! Stages run in a fixed order and the first failure ends the run; the
//! report keeps every stage result produced up to that point.

use crate::queue::BuildQueue;
use fastci_config::BuilderConfig;
use fastci_core::stage::role;
use fastci_core::{
    CheckoutSpec, GitClient, ImageTool, NormalizedEvent, StageResult, ToolReport,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed,
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Succeeded => write!(f, "successful"),
            RunOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one pipeline run, with partial stage results on failure.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub stages: Vec<StageResult>,
    /// The job event, when it could be loaded at all.
    pub event: Option<NormalizedEvent>,
}

/// Executes the fixed build pipeline for one job at a time.
pub struct BuildPipeline {
    config: Arc<BuilderConfig>,
    git: Arc<dyn GitClient>,
    image: Arc<dyn ImageTool>,
}

impl BuildPipeline {
    pub fn new(
        config: Arc<BuilderConfig>,
        git: Arc<dyn GitClient>,
        image: Arc<dyn ImageTool>,
    ) -> Self {
        Self { config, git, image }
    }

    /// Drain one job from the queue, if any, and run it to completion.
    pub async fn run_next(&self, queue: &BuildQueue) -> Option<RunReport> {
        let path = match queue.peek_oldest().await {
            Ok(Some(path)) => path,
            Ok(None) => return None,
            Err(e) => {
                error!(error = %e, "could not read the build queue");
                return None;
            }
        };
        info!(path = %path.display(), "picked up build job");
        Some(self.run_job(queue, &path).await)
    }

    async fn run_job(&self, queue: &BuildQueue, path: &Path) -> RunReport {
        let mut stages = Vec::new();

        // Load.
        let stage = StageResult::begin(role::LOAD, "loading webhook information");
        let event = match self.load(queue, path).await {
            Ok(event) => {
                stages.push(stage.complete("webhook payload loaded and read successfully"));
                event
            }
            Err(msg) => {
                stages.push(stage.fail(msg));
                return RunReport {
                    outcome: RunOutcome::Failed,
                    stages,
                    event: None,
                };
            }
        };

        let outcome = self.run_stages(&event, &mut stages).await;
        RunReport {
            outcome,
            stages,
            event: Some(event),
        }
    }

    async fn load(&self, queue: &BuildQueue, path: &Path) -> Result<NormalizedEvent, String> {
        let contents = queue
            .consume(path)
            .await
            .map_err(|e| format!("could not read job file {}: {e}", path.display()))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("could not parse job file {}: {e}", path.display()))
    }

    async fn run_stages(
        &self,
        event: &NormalizedEvent,
        stages: &mut Vec<StageResult>,
    ) -> RunOutcome {
        let tag = event.image_tag();

        // Clone.
        let stage = StageResult::begin(
            role::CLONE,
            format!("git clone of {} commit {}", event.repo_url, event.commit_hash),
        );
        let report = self
            .git
            .clone_repo(&CheckoutSpec {
                repo_url: event.repo_url.clone(),
                commit_hash: event.commit_hash.clone(),
                branch: event.checkout_ref().to_string(),
            })
            .await;
        if record(stages, stage, report) {
            return RunOutcome::Failed;
        }

        // Test, only when a test Dockerfile is configured and present.
        if let Some(test_dockerfile) = &self.config.test_dockerfile {
            if self.config.build_dir.join(test_dockerfile).is_file() {
                let stage = StageResult::begin(
                    role::TEST,
                    format!("test of code with {test_dockerfile}"),
                );
                let report = self.image.build(test_dockerfile, tag).await;
                if record(stages, stage, report) {
                    return RunOutcome::Failed;
                }
            } else {
                debug!(%test_dockerfile, "test dockerfile not in clone, skipping test stage");
            }
        }

        // Build.
        let stage = StageResult::begin(
            role::BUILD,
            format!("building of image with {}", self.config.dockerfile),
        );
        let report = self.image.build(&self.config.dockerfile, tag).await;
        if record(stages, stage, report) {
            return RunOutcome::Failed;
        }

        // Push.
        let stage = StageResult::begin(role::PUSH, "pushing of image");
        let report = self.image.push(tag).await;
        if record(stages, stage, report) {
            return RunOutcome::Failed;
        }

        // Scan, only when the marker file opted the repository in. A
        // missing scanner fails the stage rather than skipping it.
        if self.config.build_dir.join(&self.config.scan_marker).exists() {
            let stage = StageResult::begin(role::SCAN, "scanning of image");
            let report = self.image.scan(tag).await;
            if record(stages, stage, report) {
                return RunOutcome::Failed;
            }
        }

        RunOutcome::Succeeded
    }
}

/// Fold a tool report into a stage record; true means the pipeline stops.
fn record(stages: &mut Vec<StageResult>, stage: StageResult, report: ToolReport) -> bool {
    let stage = if report.success() {
        stage.complete(report.log)
    } else {
        let log = if report.log.is_empty() {
            report.status.to_string()
        } else {
            format!("{}\n{}", report.status, report.log)
        };
        stage.fail(log)
    };
    let failed = stage.failed();
    if failed {
        error!(role = %stage.role, log = %stage.log, "stage failed");
    } else {
        info!(role = %stage.role, "stage completed");
    }
    stages.push(stage);
    failed
}
