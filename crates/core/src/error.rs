//! Error types, one enum per failure domain.

/// Top-level agentwatch error.
#[derive(Debug, thiserror::Error)]
pub enum AgentwatchError {
    /// Configuration problem
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Container runtime failure
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Cluster control-plane failure
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A value is out of range or otherwise invalid
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Container runtime errors
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Runtime daemon unreachable
    #[error("runtime connection failed: {0}")]
    Connection(String),

    /// Runtime API call failed
    #[error("runtime api error: {0}")]
    Api(String),

    /// Container no longer exists
    #[error("container not found: {0}")]
    NotFound(String),

    /// The monitor was already shut down
    #[error("monitor stopped")]
    Stopped,
}

/// Cluster control-plane errors
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Platform metadata service failure
    #[error("instance metadata error: {0}")]
    Metadata(String),

    /// Control-plane API call failed
    #[error("cluster api error: {0}")]
    Api(String),

    /// This host's node reference was never resolved
    #[error("container instance not resolved for cluster '{0}'")]
    IdentityUnresolved(String),

    /// Cluster name does not resolve
    #[error("cluster not found: {0}")]
    ClusterNotFound(String),
}
