//! Activity monitor -- Docker event stream watcher and workload inventory
//!
//! [`ActivityMonitor`] enumerates running build-agent containers at start,
//! then follows the Docker event stream and pushes an [`ActivityEvent`] for
//! every relevant lifecycle change onto a bounded channel.
//!
//! [`WorkloadInventory`] answers "is a build agent running right now?" by
//! querying Docker directly. It is cheap to clone and is what the heartbeat
//! holds, so it never depends on anyone draining the activity channel.
//!
//! # Lifecycle
//!
//! ```text
//! new() --> start() --> [streaming] --> shutdown()
//!              |                            |
//!        inventory pass             cancel + await task,
//!        + subscribe(since)         release client, close channel
//! ```

use std::sync::Arc;
use std::time::SystemTime;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use agentwatch_core::error::AgentwatchError;
use agentwatch_core::event::{ActivityAction, ActivityEvent, short_id};
use agentwatch_core::probe::ActivityProbe;
use agentwatch_core::types::ContainerDetails;

use crate::classifier::classify;
use crate::config::ActivityMonitorConfig;
use crate::docker::{DockerClient, RuntimeEvent, RuntimeEventStream};
use crate::error::MonitorError;
use crate::filter::ExclusionFilter;

/// Live view of tracked workloads on this host.
pub struct WorkloadInventory<D: DockerClient> {
    docker: Arc<D>,
    filter: Arc<ExclusionFilter>,
}

impl<D: DockerClient> Clone for WorkloadInventory<D> {
    fn clone(&self) -> Self {
        Self {
            docker: Arc::clone(&self.docker),
            filter: Arc::clone(&self.filter),
        }
    }
}

impl<D: DockerClient> WorkloadInventory<D> {
    /// Creates an inventory over `docker` honoring `filter`.
    pub fn new(docker: Arc<D>, filter: Arc<ExclusionFilter>) -> Self {
        Self { docker, filter }
    }

    /// Running containers that are tracked build agents.
    ///
    /// Containers that vanish or fail to inspect mid-enumeration are skipped.
    ///
    /// # Errors
    ///
    /// Fails only if the running-container listing itself fails.
    pub async fn running_workloads(&self) -> Result<Vec<ContainerDetails>, MonitorError> {
        self.scan(false).await
    }

    async fn scan(&self, stop_at_first: bool) -> Result<Vec<ContainerDetails>, MonitorError> {
        let containers = self.docker.list_containers().await?;
        let mut tracked = Vec::new();

        for container in containers {
            if self
                .filter
                .is_excluded(&container.id, &container.name, &container.image)
            {
                continue;
            }

            let details = match self.docker.inspect_container(&container.id).await {
                Ok(details) => details,
                Err(MonitorError::ContainerNotFound(_)) => {
                    debug!(
                        container_id = short_id(&container.id),
                        "container exited during enumeration"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(
                        container_id = short_id(&container.id),
                        error = %e,
                        "failed to inspect container, skipping"
                    );
                    continue;
                }
            };

            if let Some(rule) = classify(&details) {
                debug!(
                    container_id = short_id(&details.id),
                    container_name = %details.name,
                    rule = ?rule,
                    "tracked workload running"
                );
                tracked.push(details);
                if stop_at_first {
                    break;
                }
            }
        }

        Ok(tracked)
    }
}

impl<D: DockerClient> ActivityProbe for WorkloadInventory<D> {
    async fn has_active_workloads(&self) -> Result<bool, AgentwatchError> {
        Ok(!self.scan(true).await?.is_empty())
    }
}

/// Monitor lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorState {
    Initialized,
    Streaming,
    Stopped,
}

/// Build-agent activity monitor
pub struct ActivityMonitor<D: DockerClient> {
    config: ActivityMonitorConfig,
    docker: Option<Arc<D>>,
    inventory: Option<WorkloadInventory<D>>,
    activity_tx: Option<mpsc::Sender<ActivityEvent>>,
    activity_rx: Option<mpsc::Receiver<ActivityEvent>>,
    cancel: CancellationToken,
    stream_task: Option<JoinHandle<()>>,
    state: MonitorState,
}

impl<D: DockerClient> ActivityMonitor<D> {
    /// Creates a monitor and its bounded activity channel.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Config` if the configuration is invalid.
    pub fn new(docker: Arc<D>, config: ActivityMonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;

        let filter = Arc::new(config.exclusion_filter());
        let (activity_tx, activity_rx) = mpsc::channel(config.channel_capacity);

        Ok(Self {
            inventory: Some(WorkloadInventory::new(Arc::clone(&docker), filter)),
            docker: Some(docker),
            config,
            activity_tx: Some(activity_tx),
            activity_rx: Some(activity_rx),
            cancel: CancellationToken::new(),
            stream_task: None,
            state: MonitorState::Initialized,
        })
    }

    /// Runs the inventory pass and starts following the event stream.
    ///
    /// Inventory results are emitted as `Running` events ahead of any live
    /// event. The subscription replays from `now - event_lookback`.
    ///
    /// # Errors
    ///
    /// - `MonitorError::AlreadyStarted` on a second call
    /// - `MonitorError::Stopped` after shutdown
    /// - Docker errors from the running-container listing
    pub async fn start(&mut self) -> Result<(), MonitorError> {
        match self.state {
            MonitorState::Streaming => return Err(MonitorError::AlreadyStarted),
            MonitorState::Stopped => return Err(MonitorError::Stopped),
            MonitorState::Initialized => {}
        }

        let docker = self.docker.as_ref().ok_or(MonitorError::Stopped)?;
        let inventory = self.inventory.as_ref().ok_or(MonitorError::Stopped)?;
        let activity_tx = self.activity_tx.clone().ok_or(MonitorError::Stopped)?;

        info!("starting activity monitor");

        let observed_at = SystemTime::now();
        let running = inventory.running_workloads().await?;
        info!(tracked = running.len(), "initial workload inventory loaded");

        let initial: Vec<ActivityEvent> = running
            .into_iter()
            .map(|details| {
                ActivityEvent::new(
                    &details.id,
                    details.name,
                    details.image,
                    ActivityAction::Running,
                    observed_at,
                )
            })
            .collect();

        let since = observed_at
            .checked_sub(self.config.event_lookback())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let stream = docker.events(since);
        debug!(
            lookback_secs = self.config.event_lookback_secs,
            "subscribed to docker events"
        );

        let docker = Arc::clone(docker);
        let filter = Arc::clone(&inventory.filter);
        let cancel = self.cancel.clone();

        self.stream_task = Some(tokio::spawn(async move {
            for event in initial {
                if !deliver(&activity_tx, &cancel, event).await {
                    return;
                }
            }
            consume_events(docker, filter, stream, activity_tx, cancel).await;
        }));

        self.state = MonitorState::Streaming;
        info!("activity monitor started");
        Ok(())
    }

    /// Running containers that are tracked build agents.
    pub async fn running_workloads(&self) -> Result<Vec<ContainerDetails>, MonitorError> {
        self.inventory
            .as_ref()
            .ok_or(MonitorError::Stopped)?
            .running_workloads()
            .await
    }

    /// Whether at least one tracked build agent is running right now.
    pub async fn has_active_workloads(&self) -> Result<bool, MonitorError> {
        let inventory = self.inventory.as_ref().ok_or(MonitorError::Stopped)?;
        Ok(!inventory.scan(true).await?.is_empty())
    }

    /// Cloneable probe handle for the heartbeat; `None` after shutdown.
    pub fn inventory(&self) -> Option<WorkloadInventory<D>> {
        self.inventory.clone()
    }

    /// Takes the activity receiver. Only the first call returns `Some`.
    pub fn activity_receiver(&mut self) -> Option<mpsc::Receiver<ActivityEvent>> {
        self.activity_rx.take()
    }

    /// Whether the event-stream task is still running.
    pub fn is_streaming(&self) -> bool {
        self.stream_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Current state name.
    pub fn state_name(&self) -> &'static str {
        match self.state {
            MonitorState::Initialized => "initialized",
            MonitorState::Streaming => "streaming",
            MonitorState::Stopped => "stopped",
        }
    }

    /// Stops the event-stream task and closes the activity channel.
    ///
    /// Waits for the task to exit, including one blocked on a full channel.
    /// Calling it again is a no-op.
    pub async fn shutdown(&mut self) {
        if self.state == MonitorState::Stopped {
            return;
        }

        info!("stopping activity monitor");
        self.cancel.cancel();

        if let Some(task) = self.stream_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "event stream task ended abnormally");
            }
        }

        self.inventory = None;
        self.activity_tx = None;
        self.docker = None;
        self.state = MonitorState::Stopped;
        info!("activity monitor stopped");
    }
}

/// Sends one event, giving up when cancelled or when the receiver is gone.
async fn deliver(
    tx: &mpsc::Sender<ActivityEvent>,
    cancel: &CancellationToken,
    event: ActivityEvent,
) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        result = tx.send(event) => {
            if result.is_err() {
                debug!("activity receiver dropped, stopping event stream");
            }
            result.is_ok()
        }
    }
}

async fn consume_events<D: DockerClient>(
    docker: Arc<D>,
    filter: Arc<ExclusionFilter>,
    mut stream: RuntimeEventStream,
    tx: mpsc::Sender<ActivityEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("event stream cancelled");
                return;
            }
            next = stream.next() => match next {
                Some(Ok(event)) => {
                    if let Some(activity) = classify_runtime_event(docker.as_ref(), &filter, event).await {
                        if !deliver(&tx, &cancel, activity).await {
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "docker event stream failed, live activity detection stopped");
                    return;
                }
                None => {
                    info!("docker event stream ended");
                    return;
                }
            }
        }
    }
}

/// Turns one raw runtime event into an activity event, if it is relevant.
async fn classify_runtime_event<D: DockerClient>(
    docker: &D,
    filter: &ExclusionFilter,
    event: RuntimeEvent,
) -> Option<ActivityEvent> {
    if !event.is_container() {
        return None;
    }

    let action = ActivityAction::from_runtime_action(&event.action)?;

    if !filter.is_empty() {
        if let (Some(name), Some(image)) = (event.attribute("name"), event.attribute("image")) {
            if filter.is_excluded(&event.actor_id, name, image) {
                return None;
            }
        }
    }

    let details = match docker.inspect_container(&event.actor_id).await {
        Ok(details) => details,
        Err(MonitorError::ContainerNotFound(_)) if action.is_terminal() => {
            debug!(
                container_id = short_id(&event.actor_id),
                action = %action,
                "container already removed"
            );
            return None;
        }
        Err(e) => {
            warn!(
                container_id = short_id(&event.actor_id),
                action = %action,
                error = %e,
                "failed to inspect container for event"
            );
            return None;
        }
    };

    if filter.is_excluded(&details.id, &details.name, &details.image) {
        return None;
    }

    let rule = classify(&details)?;
    debug!(
        container_id = short_id(&details.id),
        action = %action,
        rule = ?rule,
        "tracked workload event"
    );

    Some(ActivityEvent::new(
        &details.id,
        details.name,
        details.image,
        action,
        event.time,
    ))
}
