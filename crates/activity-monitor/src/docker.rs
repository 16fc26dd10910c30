//! Docker API abstraction for testability.
//!
//! The [`DockerClient`] trait covers the three runtime operations the monitor
//! needs: enumerate running containers, inspect one container, and subscribe
//! to the lifecycle event stream. Production code uses
//! [`BollardDockerClient`]; unit tests use `MockDockerClient`.
//!
//! ```text
//!   ActivityMonitor / WorkloadInventory
//!                 |
//!          DockerClient (trait)
//!            |           |
//!         Bollard       Mock
//!            |
//!      Docker daemon
//! ```
//!
//! # Examples
//!
//! ```ignore
//! use agentwatch_monitor::{BollardDockerClient, DockerClient};
//!
//! let client = BollardDockerClient::connect_local()?;
//! let containers = client.list_containers().await?;
//! # Ok::<(), agentwatch_monitor::MonitorError>(())
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures::StreamExt;
use futures::stream::BoxStream;

use agentwatch_core::types::{ContainerDetails, ContainerSummary};

use crate::error::MonitorError;

/// Event category Docker uses for container lifecycle events.
pub const CONTAINER_EVENT_TYPE: &str = "container";

/// Stream of runtime events, owned by whoever consumes it.
pub type RuntimeEventStream = BoxStream<'static, Result<RuntimeEvent, MonitorError>>;

/// One raw lifecycle event as delivered by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEvent {
    /// Event category (`container`, `network`, `image`, ...)
    pub category: String,
    /// Verb, possibly with a suffix (`exec_start: sh -c ...`)
    pub action: String,
    /// ID of the object the event refers to
    pub actor_id: String,
    /// Actor attributes (`name`, `image`, labels)
    pub attributes: HashMap<String, String>,
    /// Event-source time
    pub time: SystemTime,
}

impl RuntimeEvent {
    /// Creates an event with no attributes.
    pub fn new(
        category: impl Into<String>,
        action: impl Into<String>,
        actor_id: impl Into<String>,
        time: SystemTime,
    ) -> Self {
        Self {
            category: category.into(),
            action: action.into(),
            actor_id: actor_id.into(),
            attributes: HashMap::new(),
            time,
        }
    }

    /// Creates a container event stamped with the current time.
    pub fn container(action: impl Into<String>, actor_id: impl Into<String>) -> Self {
        Self::new(CONTAINER_EVENT_TYPE, action, actor_id, SystemTime::now())
    }

    /// Adds an actor attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Whether this is a container lifecycle event.
    pub fn is_container(&self) -> bool {
        self.category == CONTAINER_EVENT_TYPE
    }

    /// Looks up an actor attribute.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Validates a container ID before it reaches the Docker API.
///
/// Docker container IDs are 64-character hex strings (or shorter prefixes).
fn validate_container_id(id: &str) -> Result<(), MonitorError> {
    if id.is_empty() || id.len() > 64 {
        return Err(MonitorError::DockerApi(format!(
            "invalid container ID: length {} (must be 1-64)",
            id.len()
        )));
    }
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MonitorError::DockerApi(
            "invalid container ID: contains non-hex characters".to_owned(),
        ));
    }
    Ok(())
}

/// Trait abstracting Docker API operations.
///
/// # Error Handling
///
/// - **404 on inspect**: `MonitorError::ContainerNotFound`
/// - **Connection errors**: `MonitorError::DockerConnection`
/// - **Everything else**: `MonitorError::DockerApi`
pub trait DockerClient: Send + Sync + 'static {
    /// Lists running containers only.
    fn list_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerSummary>, MonitorError>> + Send;

    /// Inspects one container, including its environment and labels.
    ///
    /// # Errors
    ///
    /// - `MonitorError::ContainerNotFound`: container does not exist (404)
    /// - `MonitorError::DockerApi`: invalid ID or other API errors
    fn inspect_container(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<ContainerDetails, MonitorError>> + Send;

    /// Subscribes to lifecycle events, replaying from `since`.
    ///
    /// The stream ends or yields an error when the subscription breaks; it is
    /// not re-established.
    fn events(&self, since: SystemTime) -> RuntimeEventStream;
}

/// Production Docker client backed by `bollard`.
pub struct BollardDockerClient {
    docker: Arc<bollard::Docker>,
}

impl BollardDockerClient {
    /// Connects to Docker using the platform's default local socket.
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::DockerConnection` if the client cannot be built.
    pub fn connect_local() -> Result<Self, MonitorError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            MonitorError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to Docker using a specific socket path.
    pub fn connect_with_socket(socket_path: &str) -> Result<Self, MonitorError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    MonitorError::DockerConnection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects using `socket_path`, or the local defaults when it is empty.
    pub fn connect(socket_path: &str) -> Result<Self, MonitorError> {
        if socket_path.is_empty() {
            Self::connect_local()
        } else {
            Self::connect_with_socket(socket_path)
        }
    }
}

fn event_time(time: Option<i64>, time_nano: Option<i64>) -> SystemTime {
    if let Some(nanos) = time_nano.and_then(|n| u64::try_from(n).ok()).filter(|n| *n > 0) {
        return SystemTime::UNIX_EPOCH + Duration::from_nanos(nanos);
    }
    match time.and_then(|t| u64::try_from(t).ok()).filter(|t| *t > 0) {
        Some(secs) => SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        None => SystemTime::now(),
    }
}

fn convert_event(message: bollard::models::EventMessage) -> RuntimeEvent {
    let (actor_id, attributes) = message
        .actor
        .map(|actor| {
            (
                actor.id.unwrap_or_default(),
                actor.attributes.unwrap_or_default(),
            )
        })
        .unwrap_or_default();

    RuntimeEvent {
        category: message.typ.map(|t| t.to_string()).unwrap_or_default(),
        action: message.action.unwrap_or_default(),
        actor_id,
        attributes,
        time: event_time(message.time, message.time_nano),
    }
}

impl DockerClient for BollardDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, MonitorError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| MonitorError::DockerApi(format!("list containers failed: {e}")))?;

        Ok(containers
            .into_iter()
            .map(|container| ContainerSummary {
                id: container.id.unwrap_or_default(),
                name: container
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_owned())
                    .unwrap_or_default(),
                image: container.image.unwrap_or_default(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, MonitorError> {
        validate_container_id(id)?;

        let details = self.docker.inspect_container(id, None).await.map_err(|e| match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => MonitorError::ContainerNotFound(id.to_owned()),
            other => MonitorError::DockerApi(format!("inspect container failed: {other}")),
        })?;

        let config = details.config.unwrap_or_default();
        Ok(ContainerDetails {
            id: details.id.unwrap_or_else(|| id.to_owned()),
            name: details
                .name
                .map(|n| n.trim_start_matches('/').to_owned())
                .unwrap_or_default(),
            image: config.image.unwrap_or_default(),
            env: config.env.unwrap_or_default(),
            labels: config.labels.unwrap_or_default(),
        })
    }

    fn events(&self, since: SystemTime) -> RuntimeEventStream {
        use bollard::system::EventsOptions;

        let mut filters = HashMap::new();
        filters.insert("type".to_owned(), vec![CONTAINER_EVENT_TYPE.to_owned()]);

        let options = EventsOptions::<String> {
            since: Some(chrono::DateTime::<chrono::Utc>::from(since)),
            until: None,
            filters,
        };

        self.docker
            .events(Some(options))
            .map(|item| {
                item.map(convert_event)
                    .map_err(|e| MonitorError::DockerApi(format!("event stream failed: {e}")))
            })
            .boxed()
    }
}

/// Mock Docker client for unit tests.
///
/// `running` containers are listed and inspectable; `stopped` ones are only
/// inspectable. Events are fed through [`MockDockerClient::push_event`].
#[cfg(test)]
pub struct MockDockerClient {
    running: std::sync::Mutex<Vec<ContainerDetails>>,
    stopped: Vec<ContainerDetails>,
    fail_list: bool,
    fail_inspect: bool,
    event_tx: std::sync::Mutex<
        Option<tokio::sync::mpsc::UnboundedSender<Result<RuntimeEvent, MonitorError>>>,
    >,
    event_rx: std::sync::Mutex<
        Option<tokio::sync::mpsc::UnboundedReceiver<Result<RuntimeEvent, MonitorError>>>,
    >,
    since: std::sync::Mutex<Option<SystemTime>>,
    inspect_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl Default for MockDockerClient {
    fn default() -> Self {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        Self {
            running: std::sync::Mutex::new(Vec::new()),
            stopped: Vec::new(),
            fail_list: false,
            fail_inspect: false,
            event_tx: std::sync::Mutex::new(Some(tx)),
            event_rx: std::sync::Mutex::new(Some(rx)),
            since: std::sync::Mutex::new(None),
            inspect_calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }
}

#[cfg(test)]
impl MockDockerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_running(self, containers: Vec<ContainerDetails>) -> Self {
        *self.running.lock().unwrap() = containers;
        self
    }

    pub fn with_stopped(mut self, containers: Vec<ContainerDetails>) -> Self {
        self.stopped = containers;
        self
    }

    pub fn with_failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    pub fn with_failing_inspect(mut self) -> Self {
        self.fail_inspect = true;
        self
    }

    /// Replaces the running set, e.g. to simulate a container exiting.
    pub fn set_running(&self, containers: Vec<ContainerDetails>) {
        *self.running.lock().unwrap() = containers;
    }

    pub fn push_event(&self, event: RuntimeEvent) {
        self.push(Ok(event));
    }

    pub fn push_error(&self, error: MonitorError) {
        self.push(Err(error));
    }

    fn push(&self, item: Result<RuntimeEvent, MonitorError>) {
        if let Some(tx) = self.event_tx.lock().unwrap().as_ref() {
            let _ = tx.send(item);
        }
    }

    /// Ends the event stream once buffered items are consumed.
    pub fn close_events(&self) {
        self.event_tx.lock().unwrap().take();
    }

    pub fn subscribed_since(&self) -> Option<SystemTime> {
        *self.since.lock().unwrap()
    }

    pub fn inspect_calls(&self) -> usize {
        self.inspect_calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl DockerClient for MockDockerClient {
    async fn list_containers(&self) -> Result<Vec<ContainerSummary>, MonitorError> {
        if self.fail_list {
            return Err(MonitorError::DockerApi("mock list failure".to_owned()));
        }
        Ok(self
            .running
            .lock()
            .unwrap()
            .iter()
            .map(ContainerDetails::summary)
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerDetails, MonitorError> {
        self.inspect_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_inspect {
            return Err(MonitorError::DockerApi("mock inspect failure".to_owned()));
        }
        let running = self.running.lock().unwrap();
        running
            .iter()
            .chain(self.stopped.iter())
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| MonitorError::ContainerNotFound(id.to_owned()))
    }

    fn events(&self, since: SystemTime) -> RuntimeEventStream {
        *self.since.lock().unwrap() = Some(since);
        match self.event_rx.lock().unwrap().take() {
            Some(rx) => futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            })
            .boxed(),
            None => futures::stream::pending().boxed(),
        }
    }
}
