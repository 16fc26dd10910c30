#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod probe;
pub mod types;

// --- Re-exports ---

pub use error::{AgentwatchError, ClusterError, ConfigError, RuntimeError};

pub use config::AgentwatchConfig;

pub use event::{ActivityAction, ActivityEvent, short_id};

pub use probe::ActivityProbe;

pub use types::{ContainerDetails, ContainerSummary};
