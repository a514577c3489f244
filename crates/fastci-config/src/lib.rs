//! Process configuration for fastci.
//!
//! Both binaries build their configuration struct exactly once at startup
//! and pass it by reference into the gateway and builder constructors;
//! nothing else in the system reads the environment.

pub mod builder;
pub mod error;
pub mod gateway;

pub use builder::BuilderConfig;
pub use error::{ConfigError, ConfigResult};
pub use gateway::GatewayConfig;

/// Default location of the filesystem build queue, shared by both
/// processes.
pub const DEFAULT_QUEUE_DIR: &str = "/var/tmp/docker/fastest-ci/queue";

pub(crate) fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> ConfigResult<String> {
    lookup(var)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::MissingVar(var))
}

pub(crate) fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            message: e.to_string(),
        }),
    }
}

pub(crate) fn parse_opt<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> ConfigResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var,
                message: e.to_string(),
            }),
    }
}
