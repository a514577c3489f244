//! fastci build daemon.
//!
//! Single consumer of the build queue: discards stale jobs on startup,
//! then polls for new jobs and runs each through the build pipeline.

use fastci_config::BuilderConfig;
use fastci_executor::{DockerImageTool, ShellGitClient};
use fastci_scheduler::{BuildPipeline, BuildQueue, Worker};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(BuilderConfig::from_env()?);
    let queue = Arc::new(BuildQueue::new(&config.queue_dir)?);

    // Jobs surviving a previous crashed run are discarded, not replayed.
    let discarded = queue.clear().await?;
    if discarded > 0 {
        info!(discarded, "cleared stale jobs from the queue");
    }

    let git = Arc::new(ShellGitClient::new(&config));
    let image = Arc::new(DockerImageTool::new(&config));
    let pipeline = BuildPipeline::new(config.clone(), git, image);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    Worker::new(queue, pipeline, config.poll_interval, shutdown_rx)
        .run()
        .await;

    Ok(())
}
