//! Activity monitor error type
//!
//! [`MonitorError`] covers everything that can go wrong inside the monitor.
//! `From<MonitorError> for AgentwatchError` lets callers propagate with `?`.

use agentwatch_core::error::{AgentwatchError, ConfigError, RuntimeError};

/// Activity monitor domain error
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Docker API call failed
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// Docker socket unreachable
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// Container is gone (expected for terminal events)
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    /// Invalid monitor setting
    #[error("config error: {field}: {reason}")]
    Config {
        /// Setting name
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// Activity channel failure
    #[error("channel error: {0}")]
    Channel(String),

    /// `start` was called twice
    #[error("monitor already started")]
    AlreadyStarted,

    /// The monitor was shut down
    #[error("monitor stopped")]
    Stopped,
}

impl From<MonitorError> for AgentwatchError {
    fn from(err: MonitorError) -> Self {
        match err {
            MonitorError::DockerApi(msg) | MonitorError::Channel(msg) => {
                AgentwatchError::Runtime(RuntimeError::Api(msg))
            }
            MonitorError::DockerConnection(msg) => {
                AgentwatchError::Runtime(RuntimeError::Connection(msg))
            }
            MonitorError::ContainerNotFound(id) => {
                AgentwatchError::Runtime(RuntimeError::NotFound(id))
            }
            MonitorError::Config { field, reason } => {
                AgentwatchError::Config(ConfigError::InvalidValue { field, reason })
            }
            MonitorError::AlreadyStarted => {
                AgentwatchError::Runtime(RuntimeError::Api("monitor already started".to_owned()))
            }
            MonitorError::Stopped => AgentwatchError::Runtime(RuntimeError::Stopped),
        }
    }
}
