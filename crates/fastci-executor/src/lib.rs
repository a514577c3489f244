//! External tool invocation for fastci.
//!
//! Implements the collaborator contracts from `fastci-core::tools`:
//! - [`CommandRunner`]: timeout-aware process execution with combined
//!   output capture
//! - [`ShellGitClient`]: repository checkout through the git CLI
//! - [`DockerImageTool`]: image build/push/scan through the docker and
//!   trivy CLIs

pub mod command;
pub mod git;
pub mod image;

pub use command::CommandRunner;
pub use git::ShellGitClient;
pub use image::DockerImageTool;
