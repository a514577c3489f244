//! Image build, push and scan through the docker and trivy CLIs.

use crate::CommandRunner;
use async_trait::async_trait;
use fastci_config::BuilderConfig;
use fastci_core::{ImageTool, ToolReport};
use std::path::PathBuf;
use tracing::info;

/// Drives the docker CLI for builds and pushes and the trivy CLI for
/// image scans.
pub struct DockerImageTool {
    build_dir: PathBuf,
    registry_uri: String,
    registry_login: String,
    scan_tool: PathBuf,
    build_runner: CommandRunner,
    push_runner: CommandRunner,
    scan_runner: CommandRunner,
}

impl DockerImageTool {
    pub fn new(config: &BuilderConfig) -> Self {
        Self {
            build_dir: config.build_dir.clone(),
            registry_uri: config.registry_uri.clone(),
            registry_login: config.registry_login.clone(),
            scan_tool: config.scan_tool.clone(),
            build_runner: CommandRunner::new(config.build_timeout),
            push_runner: CommandRunner::new(config.push_timeout),
            scan_runner: CommandRunner::new(config.scan_timeout),
        }
    }

    fn image(&self, tag: &str) -> String {
        format!("{}:{}", self.registry_uri, tag)
    }
}

#[async_trait]
impl ImageTool for DockerImageTool {
    async fn build(&self, dockerfile: &str, tag: &str) -> ToolReport {
        let commit_image = self.image(tag);
        let latest_image = self.image("latest");
        info!(image = %commit_image, %dockerfile, "building image");
        let script = format!(
            "docker build -t {commit_image} . -f {dockerfile} && \
             docker build -t {latest_image} . -f {dockerfile}"
        );
        self.build_runner.shell(Some(&self.build_dir), &script).await
    }

    async fn push(&self, tag: &str) -> ToolReport {
        let image = self.image(tag);
        info!(%image, "pushing image to registry");
        let script = format!("{} && docker push {image}", self.registry_login);
        self.push_runner.shell(None, &script).await
    }

    async fn scan(&self, tag: &str) -> ToolReport {
        if !self.scan_tool.exists() {
            return ToolReport::not_found(self.scan_tool.display().to_string());
        }
        let image = self.image(tag);
        info!(%image, "scanning image");
        let tool = self.scan_tool.display().to_string();
        self.scan_runner.program(None, &tool, &[&image], &[]).await
    }
}
