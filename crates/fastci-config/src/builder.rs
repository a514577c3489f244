//! Build daemon configuration.

use crate::{ConfigResult, DEFAULT_QUEUE_DIR, parse_or, required};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BUILD_DIR: &str = "/var/tmp/docker/build";
const DEFAULT_SCAN_TOOL: &str = "/usr/local/bin/trivy";
const DEFAULT_SCAN_MARKER: &str = ".fastci/security_scan";
const DEFAULT_BUILD_TIMEOUT_SECS: u64 = 1800;

// Clone, push and scan are bounded by the fixed limits the tools were
// tuned for; only the image build is operator-configurable.
const CLONE_TIMEOUT: Duration = Duration::from_secs(300);
const PUSH_TIMEOUT: Duration = Duration::from_secs(300);
const SCAN_TIMEOUT: Duration = Duration::from_secs(1800);

/// Everything the build daemon needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    pub queue_dir: PathBuf,
    /// Directory the repository is checked out into and images are built
    /// from.
    pub build_dir: PathBuf,
    /// SSH deploy key used for cloning, when the repository needs one.
    pub deploy_key: Option<PathBuf>,
    /// Image repository URI images are tagged with and pushed to.
    pub registry_uri: String,
    /// Shell command that authenticates the docker client to the
    /// registry (e.g. an ECR login one-liner).
    pub registry_login: String,
    pub dockerfile: String,
    /// Optional test Dockerfile; the test stage runs only when this is
    /// set and the file exists in the clone.
    pub test_dockerfile: Option<String>,
    pub build_timeout: Duration,
    pub clone_timeout: Duration,
    pub push_timeout: Duration,
    pub scan_timeout: Duration,
    /// Marker file (relative to the clone) that enables the scan stage.
    pub scan_marker: String,
    /// Scanner binary location checked before the scan stage runs.
    pub scan_tool: PathBuf,
    pub poll_interval: Duration,
}

impl BuilderConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let build_timeout_secs = parse_or(
            &lookup,
            "FASTCI_BUILD_TIMEOUT",
            DEFAULT_BUILD_TIMEOUT_SECS,
        )?;

        Ok(Self {
            queue_dir: path_or(&lookup, "FASTCI_QUEUE_DIR", DEFAULT_QUEUE_DIR),
            build_dir: path_or(&lookup, "FASTCI_BUILD_DIR", DEFAULT_BUILD_DIR),
            deploy_key: lookup("FASTCI_DEPLOY_KEY")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            registry_uri: required(&lookup, "FASTCI_REGISTRY_URI")?,
            registry_login: required(&lookup, "FASTCI_REGISTRY_LOGIN")?,
            dockerfile: lookup("FASTCI_DOCKERFILE")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "Dockerfile".to_string()),
            test_dockerfile: lookup("FASTCI_TEST_DOCKERFILE").filter(|v| !v.is_empty()),
            build_timeout: Duration::from_secs(build_timeout_secs),
            clone_timeout: CLONE_TIMEOUT,
            push_timeout: PUSH_TIMEOUT,
            scan_timeout: SCAN_TIMEOUT,
            scan_marker: lookup("FASTCI_SCAN_MARKER")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| DEFAULT_SCAN_MARKER.to_string()),
            scan_tool: path_or(&lookup, "FASTCI_SCAN_TOOL", DEFAULT_SCAN_TOOL),
            poll_interval: Duration::from_secs(1),
        })
    }
}

fn path_or(lookup: &impl Fn(&str) -> Option<String>, var: &str, default: &str) -> PathBuf {
    lookup(var)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    fn minimal() -> Vec<(&'static str, &'static str)> {
        vec![
            ("FASTCI_REGISTRY_URI", "123.dkr.ecr.test/widget"),
            ("FASTCI_REGISTRY_LOGIN", "aws ecr get-login-password | docker login"),
        ]
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let config = BuilderConfig::from_lookup(lookup_from(&minimal())).unwrap();
        assert_eq!(config.queue_dir, PathBuf::from(DEFAULT_QUEUE_DIR));
        assert_eq!(config.build_dir, PathBuf::from(DEFAULT_BUILD_DIR));
        assert_eq!(config.dockerfile, "Dockerfile");
        assert!(config.test_dockerfile.is_none());
        assert_eq!(config.build_timeout, Duration::from_secs(1800));
        assert_eq!(config.push_timeout, Duration::from_secs(300));
        assert_eq!(config.scan_marker, ".fastci/security_scan");
    }

    #[test]
    fn registry_settings_are_required() {
        let err = BuilderConfig::from_lookup(lookup_from(&[(
            "FASTCI_REGISTRY_URI",
            "123.dkr.ecr.test/widget",
        )]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingVar("FASTCI_REGISTRY_LOGIN")
        ));
    }

    #[test]
    fn build_timeout_is_configurable_in_seconds() {
        let mut pairs = minimal();
        pairs.push(("FASTCI_BUILD_TIMEOUT", "90"));
        let config = BuilderConfig::from_lookup(lookup_from(&pairs)).unwrap();
        assert_eq!(config.build_timeout, Duration::from_secs(90));

        let mut pairs = minimal();
        pairs.push(("FASTCI_BUILD_TIMEOUT", "ninety"));
        assert!(BuilderConfig::from_lookup(lookup_from(&pairs)).is_err());
    }
}
