#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`MonitorError`)
//! - [`config`]: Monitor configuration (`ActivityMonitorConfig`, builder)
//! - [`classifier`]: Build-agent heuristic (`classify`, `is_tracked_workload`)
//! - [`filter`]: Exclusion rules (`ExclusionFilter`)
//! - [`docker`]: Docker API abstraction (`DockerClient` trait, `BollardDockerClient`)
//! - [`monitor`]: Activity detection (`ActivityMonitor`, `WorkloadInventory`)
//!
//! # Architecture
//!
//! ```text
//! Docker events --> ExclusionFilter --> inspect --> classifier
//!                                                      |
//!                                        ActivityEvent --mpsc(bounded)--> consumer
//! ```

pub mod classifier;
pub mod config;
pub mod docker;
pub mod error;
pub mod filter;
pub mod monitor;

// --- Public API Re-exports ---

pub use classifier::{MatchedRule, classify, is_tracked_workload};

pub use config::{ActivityMonitorConfig, ActivityMonitorConfigBuilder};

pub use error::MonitorError;

pub use filter::{ExclusionFilter, ExclusionRule};

pub use docker::{BollardDockerClient, DockerClient, RuntimeEvent, RuntimeEventStream};

pub use monitor::{ActivityMonitor, WorkloadInventory};
