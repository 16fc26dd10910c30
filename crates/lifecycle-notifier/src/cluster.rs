//! Control-plane value types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Attribute carrying `active` / `inactive`.
pub const ACTIVITY_ATTRIBUTE: &str = "azure-agent-activity";

/// Attribute carrying the last check time in seconds since the epoch.
pub const LAST_CHECK_ATTRIBUTE: &str = "azure-agent-last-check";

/// A registered compute node as described by the control plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInstanceRef {
    /// Cluster-scoped node reference (container instance ARN)
    pub arn: String,
    /// Backing EC2 instance, if reported
    pub ec2_instance_id: Option<String>,
}

/// One key/value attribute set on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAttribute {
    pub name: String,
    pub value: String,
    /// Node reference the attribute applies to
    pub target_id: String,
}

impl NodeAttribute {
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            target_id: target_id.into(),
        }
    }
}

/// Administrative state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Protected, keeps receiving work
    Active,
    /// Eligible for reclamation
    Draining,
}

impl NodeStatus {
    /// Status for a protection toggle.
    pub fn from_protection(enabled: bool) -> Self {
        if enabled { Self::Active } else { Self::Draining }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Draining => "DRAINING",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only cluster facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub name: String,
    pub status: String,
    pub running_tasks_count: i32,
    pub pending_tasks_count: i32,
    pub active_services_count: i32,
}

impl ClusterInfo {
    /// The facts as a JSON object keyed by their camelCase names.
    pub fn as_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("name".to_owned(), Value::from(self.name.clone()));
        map.insert("status".to_owned(), Value::from(self.status.clone()));
        map.insert(
            "runningTasksCount".to_owned(),
            Value::from(self.running_tasks_count),
        );
        map.insert(
            "pendingTasksCount".to_owned(),
            Value::from(self.pending_tasks_count),
        );
        map.insert(
            "activeServicesCount".to_owned(),
            Value::from(self.active_services_count),
        );
        map
    }
}

impl fmt::Display for ClusterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): running={} pending={} services={}",
            self.name,
            self.status,
            self.running_tasks_count,
            self.pending_tasks_count,
            self.active_services_count
        )
    }
}
