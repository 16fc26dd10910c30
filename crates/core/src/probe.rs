//! Activity probe trait -- the seam between the monitor and the heartbeat.

use std::future::Future;

use crate::error::AgentwatchError;

/// Point-in-time answer to "is any tracked workload running on this host?".
///
/// Implementations must query the live runtime rather than any buffered
/// event state, so the answer holds even when nobody drains the activity
/// channel.
pub trait ActivityProbe: Send + Sync + 'static {
    /// Returns whether at least one tracked workload is currently running.
    fn has_active_workloads(&self)
    -> impl Future<Output = Result<bool, AgentwatchError>> + Send;
}
