//! Component wiring and lifecycle management.
//!
//! The [`Orchestrator`] owns the activity monitor and, when enabled, the
//! lifecycle notifier. It connects the monitor's activity channel to the
//! notifier and runs until SIGINT or SIGTERM.
//!
//! # Startup Order
//!
//! 1. Activity monitor (inventory pass, event subscription)
//! 2. Cluster info probe (informational only)
//! 3. Heartbeat (queries the monitor's inventory)
//! 4. Activity consumer (drains the channel, pushes start events)
//!
//! # Shutdown Order
//!
//! 1. Notifier stop token, then await the heartbeat
//! 2. Monitor shutdown (closes the activity channel)
//! 3. Await the consumer, which exits once the channel is drained

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use agentwatch_core::config::{AgentwatchConfig, NotifierConfig};
use agentwatch_core::event::ActivityEvent;
use agentwatch_monitor::{ActivityMonitor, ActivityMonitorConfig, BollardDockerClient, DockerClient};
use agentwatch_notifier::{
    ClusterApi, EcsClusterClient, ImdsInstanceMetadata, LifecycleNotifier,
    LifecycleNotifierConfig, NotifierError, load_aws_config,
};

/// Background tasks spawned by [`Orchestrator::start`].
pub struct RunningTasks {
    heartbeat: Option<JoinHandle<()>>,
    consumer: JoinHandle<()>,
}

impl RunningTasks {
    /// Whether a heartbeat task was spawned.
    pub fn has_heartbeat(&self) -> bool {
        self.heartbeat.is_some()
    }
}

/// The daemon orchestrator.
pub struct Orchestrator<D: DockerClient, C: ClusterApi> {
    config: AgentwatchConfig,
    monitor: ActivityMonitor<D>,
    notifier: Option<Arc<LifecycleNotifier<C>>>,
}

impl Orchestrator<BollardDockerClient, EcsClusterClient> {
    /// Builds the production components from a validated configuration.
    ///
    /// A notifier that cannot be built is logged and skipped; the daemon
    /// then runs monitor-only.
    ///
    /// # Errors
    ///
    /// Returns an error if Docker cannot be reached or the monitor
    /// configuration is invalid.
    pub async fn build(config: AgentwatchConfig) -> Result<Self> {
        let docker = BollardDockerClient::connect(&config.monitor.docker_socket)
            .context("failed to create docker client")?;
        let monitor = ActivityMonitor::new(
            Arc::new(docker),
            ActivityMonitorConfig::from_core(&config.monitor),
        )
        .context("failed to build activity monitor")?;

        let notifier = if config.notifier.enabled {
            match build_notifier(&config.notifier).await {
                Ok(notifier) => Some(Arc::new(notifier)),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to build ECS notifier, continuing monitor-only");
                    None
                }
            }
        } else {
            tracing::info!("ECS notifier disabled, running monitor-only");
            None
        };

        Ok(Self::from_parts(config, monitor, notifier))
    }
}

async fn build_notifier(
    config: &NotifierConfig,
) -> Result<LifecycleNotifier<EcsClusterClient>, NotifierError> {
    let notifier_config = LifecycleNotifierConfig::from_core(config);
    tracing::info!(
        cluster = %notifier_config.cluster,
        region = %notifier_config.region,
        heartbeat_secs = notifier_config.heartbeat_interval_secs,
        "initializing ECS notifier"
    );

    let sdk_config = load_aws_config(&notifier_config.region).await;
    let client = EcsClusterClient::new(&sdk_config);
    LifecycleNotifier::new(client, &ImdsInstanceMetadata::new(), notifier_config).await
}

impl<D: DockerClient, C: ClusterApi> Orchestrator<D, C> {
    /// Assembles an orchestrator from already-built components.
    pub fn from_parts(
        config: AgentwatchConfig,
        monitor: ActivityMonitor<D>,
        notifier: Option<Arc<LifecycleNotifier<C>>>,
    ) -> Self {
        Self {
            config,
            monitor,
            notifier,
        }
    }

    /// Effective configuration.
    pub fn config(&self) -> &AgentwatchConfig {
        &self.config
    }

    pub fn monitor(&self) -> &ActivityMonitor<D> {
        &self.monitor
    }

    pub fn notifier(&self) -> Option<&Arc<LifecycleNotifier<C>>> {
        self.notifier.as_ref()
    }

    /// Starts the monitor and spawns the heartbeat and the activity consumer.
    ///
    /// # Errors
    ///
    /// Fails if the monitor cannot start. Cluster info failures are logged.
    pub async fn start(&mut self) -> Result<RunningTasks> {
        let activity_rx = self
            .monitor
            .activity_receiver()
            .context("activity receiver already taken")?;

        self.monitor
            .start()
            .await
            .context("failed to start activity monitor")?;

        let mut heartbeat = None;
        if let Some(notifier) = &self.notifier {
            match notifier.get_cluster_info().await {
                Ok(info) => tracing::info!(cluster = %info, "connected to ECS cluster"),
                Err(e) => tracing::warn!(error = %e, "failed to get cluster info"),
            }

            if let Some(probe) = self.monitor.inventory() {
                heartbeat = Some(notifier.spawn_heartbeat(probe));
            }
        }

        let consumer = tokio::spawn(consume_activity(activity_rx, self.notifier.clone()));

        tracing::info!(
            notifier = self.notifier.is_some(),
            "agentwatch running"
        );
        Ok(RunningTasks {
            heartbeat,
            consumer,
        })
    }

    /// Stops every component in shutdown order.
    pub async fn stop(&mut self, tasks: RunningTasks) {
        if let Some(notifier) = &self.notifier {
            notifier.stop();
        }
        if let Some(heartbeat) = tasks.heartbeat {
            if let Err(e) = heartbeat.await {
                tracing::warn!(error = %e, "heartbeat task ended abnormally");
            }
        }

        self.monitor.shutdown().await;

        if let Err(e) = tasks.consumer.await {
            tracing::warn!(error = %e, "activity consumer ended abnormally");
        }
        tracing::info!("agentwatch stopped");
    }

    /// Starts everything and blocks until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if startup fails or signal handlers cannot be
    /// installed.
    pub async fn run(&mut self) -> Result<()> {
        let tasks = self.start().await?;

        let signal = match wait_for_shutdown_signal().await {
            Ok(signal) => signal,
            Err(e) => {
                self.stop(tasks).await;
                return Err(e);
            }
        };
        tracing::info!(signal = signal, "shutdown signal received");

        self.stop(tasks).await;
        Ok(())
    }
}

/// Drains the activity channel until it closes.
///
/// Every event is logged; start and exec-start events are pushed to the
/// notifier immediately.
pub async fn consume_activity<C: ClusterApi>(
    mut activity_rx: mpsc::Receiver<ActivityEvent>,
    notifier: Option<Arc<LifecycleNotifier<C>>>,
) {
    while let Some(event) = activity_rx.recv().await {
        tracing::info!(
            container_id = %event.container_id,
            container_name = %event.container_name,
            image = %event.image,
            action = %event.action,
            "activity event"
        );

        if !event.action.triggers_notification() {
            continue;
        }
        if let Some(notifier) = &notifier {
            if let Err(e) = notifier.notify_activity(&event).await {
                tracing::warn!(
                    container_id = %event.container_id,
                    error = %e,
                    "failed to push activity signal"
                );
            }
        }
    }
    tracing::debug!("activity channel closed, consumer exiting");
}

/// Waits for SIGTERM or SIGINT and returns the signal's name.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
