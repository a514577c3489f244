//! Repository checkout through the git CLI.

use crate::CommandRunner;
use async_trait::async_trait;
use fastci_config::BuilderConfig;
use fastci_core::{CheckoutSpec, GitClient, ToolReport};
use std::path::PathBuf;
use tracing::info;

/// Clones repositories into the build directory with the git CLI,
/// optionally authenticating with an SSH deploy key.
pub struct ShellGitClient {
    build_dir: PathBuf,
    deploy_key: Option<PathBuf>,
    runner: CommandRunner,
}

impl ShellGitClient {
    pub fn new(config: &BuilderConfig) -> Self {
        Self {
            build_dir: config.build_dir.clone(),
            deploy_key: config.deploy_key.clone(),
            runner: CommandRunner::new(config.clone_timeout),
        }
    }

    fn ssh_env(&self) -> Vec<(&'static str, String)> {
        match &self.deploy_key {
            Some(key) => vec![(
                "GIT_SSH_COMMAND",
                format!("ssh -i {} -o StrictHostKeyChecking=no", key.display()),
            )],
            None => Vec::new(),
        }
    }

    async fn reset_build_dir(&self) -> std::io::Result<()> {
        match tokio::fs::remove_dir_all(&self.build_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        if let Some(parent) = self.build_dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl GitClient for ShellGitClient {
    async fn clone_repo(&self, spec: &CheckoutSpec) -> ToolReport {
        info!(
            repo_url = %spec.repo_url,
            branch = %spec.branch,
            commit = %spec.commit_hash,
            "cloning repository"
        );

        if let Err(e) = self.reset_build_dir().await {
            return ToolReport::exited(
                -1,
                format!("could not reset build dir {}: {e}", self.build_dir.display()),
            );
        }

        let env = self.ssh_env();
        let dest = self.build_dir.display().to_string();
        let clone = self
            .runner
            .program(
                None,
                "git",
                &["clone", "--branch", &spec.branch, &spec.repo_url, &dest],
                &env,
            )
            .await;
        if !clone.success() {
            return clone;
        }

        let checkout = self
            .runner
            .program(
                Some(&self.build_dir),
                "git",
                &["checkout", &spec.commit_hash],
                &env,
            )
            .await;

        let mut log = clone.log;
        if !log.is_empty() && !checkout.log.is_empty() {
            log.push('\n');
        }
        log.push_str(&checkout.log);
        ToolReport {
            status: checkout.status,
            log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastci_core::ToolStatus;
    use std::time::Duration;

    fn config(build_dir: PathBuf) -> BuilderConfig {
        BuilderConfig {
            queue_dir: PathBuf::from("/tmp/unused"),
            build_dir,
            deploy_key: None,
            registry_uri: "registry.test/widget".to_string(),
            registry_login: "true".to_string(),
            dockerfile: "Dockerfile".to_string(),
            test_dockerfile: None,
            build_timeout: Duration::from_secs(5),
            clone_timeout: Duration::from_secs(5),
            push_timeout: Duration::from_secs(5),
            scan_timeout: Duration::from_secs(5),
            scan_marker: ".fastci/security_scan".to_string(),
            scan_tool: PathBuf::from("/usr/local/bin/trivy"),
            poll_interval: Duration::from_secs(1),
        }
    }

    #[test]
    fn ssh_env_is_set_only_with_a_deploy_key() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path().join("build"));
        assert!(ShellGitClient::new(&cfg).ssh_env().is_empty());

        cfg.deploy_key = Some(PathBuf::from("/var/keys/deploy.pem"));
        let env = ShellGitClient::new(&cfg).ssh_env();
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].0, "GIT_SSH_COMMAND");
        assert!(env[0].1.contains("/var/keys/deploy.pem"));
    }

    #[tokio::test]
    async fn clone_failure_reports_the_git_error() {
        let dir = tempfile::tempdir().unwrap();
        let client = ShellGitClient::new(&config(dir.path().join("build")));
        let report = client
            .clone_repo(&CheckoutSpec {
                repo_url: dir.path().join("no-such-repo").display().to_string(),
                commit_hash: "abcdef0".to_string(),
                branch: "main".to_string(),
            })
            .await;
        assert!(!report.success());
        assert!(!matches!(report.status, ToolStatus::TimedOut { .. }));
    }
}
