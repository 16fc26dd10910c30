#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error type (`NotifierError`)
//! - [`config`]: Notifier configuration (`LifecycleNotifierConfig`, builder)
//! - [`cluster`]: Control-plane value types (`ClusterInfo`, `NodeAttribute`, `NodeStatus`)
//! - [`ecs`]: ECS API abstraction (`ClusterApi` trait, `EcsClusterClient`)
//! - [`metadata`]: Instance identity (`InstanceMetadata` trait, `ImdsInstanceMetadata`)
//! - [`notifier`]: `LifecycleNotifier`
//!
//! # Architecture
//!
//! ```text
//! ActivityProbe --tick--> LifecycleNotifier --PutAttributes--> ECS
//! ActivityEvent --------> notify_activity()
//! ```

pub mod cluster;
pub mod config;
pub mod ecs;
pub mod error;
pub mod metadata;
pub mod notifier;

// --- Public API Re-exports ---

pub use cluster::{
    ACTIVITY_ATTRIBUTE, ClusterInfo, ContainerInstanceRef, LAST_CHECK_ATTRIBUTE, NodeAttribute,
    NodeStatus,
};

pub use config::{LifecycleNotifierConfig, LifecycleNotifierConfigBuilder};

pub use ecs::{ClusterApi, EcsClusterClient, load_aws_config};

pub use error::NotifierError;

pub use metadata::{ImdsInstanceMetadata, InstanceMetadata};

pub use notifier::LifecycleNotifier;
