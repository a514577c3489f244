//! Timeout-aware process execution.

use fastci_core::ToolReport;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Runs external processes, capturing combined output and classifying the
/// outcome as exited, timed out or tool-not-found.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Run a program directly with the given arguments.
    pub async fn program(
        &self,
        dir: Option<&Path>,
        program: &str,
        args: &[&str],
        env: &[(&str, String)],
    ) -> ToolReport {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        for (key, value) in env {
            cmd.env(key, value);
        }
        self.run(program, cmd).await
    }

    /// Run an operator-supplied script through `sh -c`. Tool lookup
    /// failures inside the script surface as a non-zero exit, not as
    /// `NotFound`.
    pub async fn shell(&self, dir: Option<&Path>, script: &str) -> ToolReport {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        self.run("sh", cmd).await
    }

    async fn run(&self, program: &str, mut cmd: Command) -> ToolReport {
        debug!(%program, timeout_secs = self.timeout.as_secs(), "running external tool");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ToolReport::not_found(program);
            }
            Err(e) => {
                return ToolReport::exited(-1, format!("could not spawn {program}: {e}"));
            }
        };

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr);
                if !stderr.is_empty() {
                    if !log.is_empty() {
                        log.push('\n');
                    }
                    log.push_str(&stderr);
                }
                ToolReport::exited(output.status.code().unwrap_or(-1), log)
            }
            Ok(Err(e)) => ToolReport::exited(-1, format!("could not collect {program} output: {e}")),
            // kill_on_drop reaps the abandoned child.
            Err(_) => ToolReport::timed_out(
                self.timeout,
                format!("{program} exceeded its {}s limit", self.timeout.as_secs()),
            ),
        }
    }
}
