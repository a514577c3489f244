//! The builder daemon loop.

use crate::orchestrator::{BuildPipeline, RunReport};
use crate::queue::BuildQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Polls the queue and runs one pipeline per tick until told to stop.
///
/// Exactly one worker instance may drain a queue; the write-once,
/// read-once-then-delete file discipline depends on it.
pub struct Worker {
    queue: Arc<BuildQueue>,
    pipeline: BuildPipeline,
    poll_interval: Duration,
    shutdown: watch::Receiver<bool>,
}

impl Worker {
    pub fn new(
        queue: Arc<BuildQueue>,
        pipeline: BuildPipeline,
        poll_interval: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            queue,
            pipeline,
            poll_interval,
            shutdown,
        }
    }

    /// Run the daemon loop. Returns once the shutdown signal fires; an
    /// in-flight job always runs to completion first.
    pub async fn run(mut self) {
        info!(queue = %self.queue.dir().display(), "starting build worker");

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            if let Some(report) = self.pipeline.run_next(&self.queue).await {
                log_report(&report);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = self.shutdown.changed() => {
                    // A closed channel means the process is going away.
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("build worker stopped");
    }
}

fn log_report(report: &RunReport) {
    for stage in &report.stages {
        info!(
            role = %stage.role,
            status = ?stage.status,
            description = %stage.human_description,
            "stage result"
        );
    }
    match &report.event {
        Some(event) => info!(
            outcome = %report.outcome,
            commit = %event.commit_hash,
            branch = %event.branch,
            "build run finished"
        ),
        None => info!(outcome = %report.outcome, "build run finished"),
    }
}
