//! Lifecycle notifier error type
//!
//! `From<NotifierError> for AgentwatchError` lets callers propagate with `?`.

use agentwatch_core::error::{AgentwatchError, ClusterError, ConfigError};

/// Lifecycle notifier domain error
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    /// Instance metadata service failure
    #[error("instance metadata error: {0}")]
    Metadata(String),

    /// ECS API call failed
    #[error("ecs api error: {0}")]
    ClusterApi(String),

    /// This host was never matched to a container instance
    #[error("container instance not resolved for cluster '{cluster}'")]
    IdentityUnresolved {
        /// Cluster the lookup ran against
        cluster: String,
    },

    /// The cluster does not exist
    #[error("cluster not found: {0}")]
    ClusterNotFound(String),

    /// Invalid notifier setting
    #[error("config error: {field}: {reason}")]
    Config {
        /// Setting name
        field: String,
        /// Why it was rejected
        reason: String,
    },
}

impl From<NotifierError> for AgentwatchError {
    fn from(err: NotifierError) -> Self {
        match err {
            NotifierError::Metadata(msg) => AgentwatchError::Cluster(ClusterError::Metadata(msg)),
            NotifierError::ClusterApi(msg) => AgentwatchError::Cluster(ClusterError::Api(msg)),
            NotifierError::IdentityUnresolved { cluster } => {
                AgentwatchError::Cluster(ClusterError::IdentityUnresolved(cluster))
            }
            NotifierError::ClusterNotFound(name) => {
                AgentwatchError::Cluster(ClusterError::ClusterNotFound(name))
            }
            NotifierError::Config { field, reason } => {
                AgentwatchError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}
