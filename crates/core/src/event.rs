//! Activity events -- the unit of work flowing out of the monitor.
//!
//! An [`ActivityEvent`] is built once, when a runtime occurrence has passed
//! the exclusion filter and the classifier, and is immutable from then on.
//! It lives only in flight on the bounded activity channel.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Length of the truncated container ID carried by events.
pub const SHORT_ID_LEN: usize = 12;

/// Truncates a container ID to its short stable prefix.
///
/// IDs shorter than [`SHORT_ID_LEN`] are returned whole.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// What happened to a tracked workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    /// Found running during the inventory pass
    Running,
    /// Container created
    Create,
    /// Container started
    Start,
    /// Container stopped
    Stop,
    /// Container killed
    Kill,
    /// Container process exited
    Die,
    /// A command was exec'd inside the container
    ExecStart,
}

impl ActivityAction {
    /// Maps a runtime event verb onto the allow-list.
    ///
    /// The runtime reports exec events as `exec_start: <command>`, so only
    /// the part before the first `:` is compared. `Running` is never
    /// produced here; it belongs to the inventory pass.
    pub fn from_runtime_action(action: &str) -> Option<Self> {
        let verb = action.split(':').next().unwrap_or_default().trim();
        match verb {
            "create" => Some(Self::Create),
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            "kill" => Some(Self::Kill),
            "die" => Some(Self::Die),
            "exec_start" => Some(Self::ExecStart),
            _ => None,
        }
    }

    /// Runtime verb for this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Create => "create",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Kill => "kill",
            Self::Die => "die",
            Self::ExecStart => "exec_start",
        }
    }

    /// Terminal actions may legitimately refer to containers that are gone.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stop | Self::Kill | Self::Die)
    }

    /// Actions that warrant an immediate activity push to the controller.
    pub fn triggers_notification(&self) -> bool {
        matches!(self, Self::Start | Self::ExecStart)
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One relevant runtime occurrence for a tracked workload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Container ID truncated to [`SHORT_ID_LEN`]
    pub container_id: String,
    /// Container display name
    pub container_name: String,
    /// Image reference
    pub image: String,
    /// Action kind
    pub action: ActivityAction,
    /// Event-source time (inventory pass: observation time)
    pub timestamp: SystemTime,
    /// Always true for emitted events; filtering happens before emission
    pub is_tracked: bool,
}

impl ActivityEvent {
    /// Builds a tracked-workload event, truncating the container ID.
    pub fn new(
        container_id: &str,
        container_name: impl Into<String>,
        image: impl Into<String>,
        action: ActivityAction,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            container_id: short_id(container_id).to_owned(),
            container_name: container_name.into(),
            image: image.into(),
            action,
            timestamp,
            is_tracked: true,
        }
    }
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} [{}]",
            self.action, self.container_name, self.container_id
        )
    }
}
