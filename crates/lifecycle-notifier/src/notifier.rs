//! Lifecycle notifier -- activity signals, heartbeat and protection toggle
//!
//! [`LifecycleNotifier`] resolves which container instance this host is,
//! once, at construction. Resolution is best-effort: when it fails the
//! notifier still works, activity signals become no-ops and the protection
//! toggle reports [`NotifierError::IdentityUnresolved`].

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use agentwatch_core::event::ActivityEvent;
use agentwatch_core::probe::ActivityProbe;

use crate::cluster::{
    ACTIVITY_ATTRIBUTE, ClusterInfo, LAST_CHECK_ATTRIBUTE, NodeAttribute, NodeStatus,
};
use crate::config::LifecycleNotifierConfig;
use crate::ecs::ClusterApi;
use crate::error::NotifierError;
use crate::metadata::InstanceMetadata;

/// ECS lifecycle notifier
pub struct LifecycleNotifier<C: ClusterApi> {
    client: C,
    config: LifecycleNotifierConfig,
    container_instance_arn: Option<String>,
    stop: CancellationToken,
}

impl<C: ClusterApi> LifecycleNotifier<C> {
    /// Creates a notifier and resolves this host's container instance.
    ///
    /// # Errors
    ///
    /// Only an invalid configuration fails; resolution failures are logged.
    pub async fn new<M: InstanceMetadata>(
        client: C,
        metadata: &M,
        config: LifecycleNotifierConfig,
    ) -> Result<Self, NotifierError> {
        config.validate()?;

        let mut notifier = Self {
            client,
            config,
            container_instance_arn: None,
            stop: CancellationToken::new(),
        };

        match notifier.resolve_identity(metadata).await {
            Ok(arn) => {
                info!(
                    cluster = %notifier.config.cluster,
                    container_instance = %arn,
                    "resolved ECS container instance"
                );
                notifier.container_instance_arn = Some(arn);
            }
            Err(e) => {
                warn!(
                    cluster = %notifier.config.cluster,
                    error = %e,
                    "failed to resolve ECS container instance, activity signals disabled"
                );
            }
        }

        Ok(notifier)
    }

    async fn resolve_identity<M: InstanceMetadata>(
        &self,
        metadata: &M,
    ) -> Result<String, NotifierError> {
        let cluster = self.config.cluster.as_str();
        if cluster.is_empty() {
            return Err(NotifierError::Config {
                field: "cluster".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        let instance_id = metadata.instance_id().await?;
        debug!(instance_id = %instance_id, "instance identity from metadata");

        let arns = self.client.list_container_instances(cluster).await?;
        if arns.is_empty() {
            return Err(NotifierError::ClusterApi(format!(
                "no container instances registered in cluster '{cluster}'"
            )));
        }

        self.client
            .describe_container_instances(cluster, &arns)
            .await?
            .into_iter()
            .find(|i| i.ec2_instance_id.as_deref() == Some(instance_id.as_str()))
            .map(|i| i.arn)
            .ok_or_else(|| {
                NotifierError::ClusterApi(format!(
                    "no container instance for EC2 instance {instance_id} in cluster '{cluster}'"
                ))
            })
    }

    /// Cluster this notifier reports to.
    pub fn cluster(&self) -> &str {
        &self.config.cluster
    }

    /// Resolved container instance ARN, if any.
    pub fn container_instance_arn(&self) -> Option<&str> {
        self.container_instance_arn.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.container_instance_arn.is_some()
    }

    /// Publishes the activity state and last-check time on this node.
    ///
    /// A no-op when the node identity is unresolved.
    pub async fn send_activity_signal(&self, has_activity: bool) -> Result<(), NotifierError> {
        let Some(arn) = self.container_instance_arn.as_deref() else {
            debug!("container instance not resolved, skipping activity signal");
            return Ok(());
        };

        let status = if has_activity { "active" } else { "inactive" };
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let attributes = [
            NodeAttribute::new(ACTIVITY_ATTRIBUTE, status, arn),
            NodeAttribute::new(LAST_CHECK_ATTRIBUTE, timestamp.to_string(), arn),
        ];
        self.client
            .put_attributes(&self.config.cluster, &attributes)
            .await?;

        info!(status, timestamp, "activity signal sent");
        Ok(())
    }

    /// Immediately signals activity for a just-observed event.
    pub async fn notify_activity(&self, event: &ActivityEvent) -> Result<(), NotifierError> {
        info!(
            action = %event.action,
            container_name = %event.container_name,
            container_id = %event.container_id,
            "build agent activity"
        );
        self.send_activity_signal(true).await
    }

    /// Runs the heartbeat until [`stop`](Self::stop) is called.
    ///
    /// The first tick fires one interval after the call. Probe and signal
    /// failures are logged and the loop carries on.
    pub async fn run_heartbeat<P: ActivityProbe>(&self, probe: &P) {
        let period = self.config.heartbeat_interval();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = period.as_secs(), "starting heartbeat");

        loop {
            tokio::select! {
                biased;
                () = self.stop.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                () = self.stop.cancelled() => break,
                () = self.heartbeat_tick(probe) => {}
            }
        }

        info!("heartbeat stopped");
    }

    async fn heartbeat_tick<P: ActivityProbe>(&self, probe: &P) {
        match probe.has_active_workloads().await {
            Ok(active) => {
                if let Err(e) = self.send_activity_signal(active).await {
                    warn!(error = %e, "failed to send activity signal");
                }
            }
            Err(e) => warn!(error = %e, "failed to check for active workloads"),
        }
    }

    /// Spawns [`run_heartbeat`](Self::run_heartbeat) on the runtime.
    pub fn spawn_heartbeat<P: ActivityProbe>(self: &Arc<Self>, probe: P) -> JoinHandle<()> {
        let notifier = Arc::clone(self);
        tokio::spawn(async move { notifier.run_heartbeat(&probe).await })
    }

    /// Protects (`ACTIVE`) or releases (`DRAINING`) this node.
    ///
    /// # Errors
    ///
    /// `NotifierError::IdentityUnresolved` when the node was never resolved.
    pub async fn set_protection_enabled(&self, enabled: bool) -> Result<(), NotifierError> {
        let arn = self
            .container_instance_arn
            .as_deref()
            .ok_or_else(|| NotifierError::IdentityUnresolved {
                cluster: self.config.cluster.clone(),
            })?;

        let status = NodeStatus::from_protection(enabled);
        self.client
            .update_instance_state(&self.config.cluster, arn, status)
            .await?;

        info!(enabled, status = %status, "instance protection updated");
        Ok(())
    }

    /// Describes the configured cluster.
    pub async fn get_cluster_info(&self) -> Result<ClusterInfo, NotifierError> {
        self.client
            .describe_cluster(&self.config.cluster)
            .await?
            .ok_or_else(|| NotifierError::ClusterNotFound(self.config.cluster.clone()))
    }

    /// Stops the heartbeat. Later calls have no effect.
    pub fn stop(&self) {
        if !self.stop.is_cancelled() {
            debug!("stopping lifecycle notifier");
        }
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LifecycleNotifierConfigBuilder;
    use crate::ecs::MockClusterApi;
    use crate::metadata::MockInstanceMetadata;
    use agentwatch_core::error::{AgentwatchError, RuntimeError};
    use agentwatch_core::event::ActivityAction;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    const NODE_ARN: &str = "arn:aws:ecs:us-east-1:123456789012:container-instance/ci/0a1b";

    #[derive(Default)]
    struct ProbeState {
        active: AtomicBool,
        failing: AtomicBool,
        calls: AtomicUsize,
    }

    /// Probe with a switchable answer that counts queries.
    #[derive(Clone, Default)]
    struct TestProbe(Arc<ProbeState>);

    impl std::ops::Deref for TestProbe {
        type Target = ProbeState;

        fn deref(&self) -> &ProbeState {
            &self.0
        }
    }

    impl ActivityProbe for TestProbe {
        async fn has_active_workloads(&self) -> Result<bool, AgentwatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(RuntimeError::Connection("docker unavailable".to_owned()).into());
            }
            Ok(self.active.load(Ordering::SeqCst))
        }
    }

    fn config() -> LifecycleNotifierConfig {
        LifecycleNotifierConfigBuilder::new()
            .cluster("ci")
            .heartbeat_interval_secs(30)
            .build()
            .unwrap()
    }

    fn api() -> MockClusterApi {
        MockClusterApi::new()
            .with_instance("arn:aws:ecs:us-east-1:123456789012:container-instance/ci/ffff", "i-other")
            .with_instance(NODE_ARN, "i-0abc")
    }

    async fn resolved() -> LifecycleNotifier<MockClusterApi> {
        LifecycleNotifier::new(api(), &MockInstanceMetadata::instance("i-0abc"), config())
            .await
            .unwrap()
    }

    async fn unresolved() -> LifecycleNotifier<MockClusterApi> {
        LifecycleNotifier::new(api(), &MockInstanceMetadata::unreachable(), config())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn resolves_matching_container_instance() {
        let notifier = resolved().await;
        assert!(notifier.is_resolved());
        assert_eq!(notifier.container_instance_arn(), Some(NODE_ARN));
        assert_eq!(notifier.cluster(), "ci");
    }

    #[tokio::test]
    async fn unmatched_instance_stays_unresolved() {
        let notifier =
            LifecycleNotifier::new(api(), &MockInstanceMetadata::instance("i-missing"), config())
                .await
                .unwrap();
        assert!(!notifier.is_resolved());
    }

    #[tokio::test]
    async fn empty_cluster_skips_lookup() {
        let config = LifecycleNotifierConfigBuilder::new().build().unwrap();
        let notifier =
            LifecycleNotifier::new(api(), &MockInstanceMetadata::instance("i-0abc"), config)
                .await
                .unwrap();
        assert!(!notifier.is_resolved());
        assert_eq!(notifier.client.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn list_failure_stays_unresolved() {
        let api = MockClusterApi {
            fail_list: true,
            ..api()
        };
        let notifier =
            LifecycleNotifier::new(api, &MockInstanceMetadata::instance("i-0abc"), config())
                .await
                .unwrap();
        assert!(!notifier.is_resolved());
    }

    #[tokio::test]
    async fn invalid_config_fails_construction() {
        let config = LifecycleNotifierConfig {
            heartbeat_interval_secs: 0,
            ..config()
        };
        let result =
            LifecycleNotifier::new(api(), &MockInstanceMetadata::instance("i-0abc"), config).await;
        assert!(matches!(result, Err(NotifierError::Config { .. })));
    }

    #[tokio::test]
    async fn activity_signal_sets_both_attributes() {
        let notifier = resolved().await;
        notifier.send_activity_signal(true).await.unwrap();

        let attrs = notifier.client.last_put().unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "azure-agent-activity");
        assert_eq!(attrs[0].value, "active");
        assert_eq!(attrs[0].target_id, NODE_ARN);
        assert_eq!(attrs[1].name, "azure-agent-last-check");
        assert!(attrs[1].value.parse::<u64>().unwrap() > 1_600_000_000);

        notifier.send_activity_signal(false).await.unwrap();
        assert_eq!(notifier.client.last_put().unwrap()[0].value, "inactive");
    }

    #[tokio::test]
    async fn activity_signal_reports_api_failure() {
        let api = MockClusterApi {
            fail_put: true,
            ..api()
        };
        let notifier =
            LifecycleNotifier::new(api, &MockInstanceMetadata::instance("i-0abc"), config())
                .await
                .unwrap();
        assert!(matches!(
            notifier.send_activity_signal(true).await,
            Err(NotifierError::ClusterApi(_))
        ));
    }

    #[tokio::test]
    async fn unresolved_signal_is_noop() {
        let notifier = unresolved().await;
        notifier.send_activity_signal(true).await.unwrap();
        notifier.send_activity_signal(false).await.unwrap();
        assert_eq!(notifier.client.put_count(), 0);
    }

    #[tokio::test]
    async fn notify_activity_always_signals_active() {
        let notifier = resolved().await;
        let event = ActivityEvent::new(
            "0123456789abcdef",
            "agent-1",
            "vsts-agent:1",
            ActivityAction::ExecStart,
            SystemTime::now(),
        );
        notifier.notify_activity(&event).await.unwrap();
        assert_eq!(notifier.client.last_put().unwrap()[0].value, "active");
    }

    #[tokio::test]
    async fn protection_toggle_updates_state() {
        let notifier = resolved().await;
        notifier.set_protection_enabled(false).await.unwrap();
        notifier.set_protection_enabled(true).await.unwrap();

        let calls = notifier.client.state_calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                (NODE_ARN.to_owned(), NodeStatus::Draining),
                (NODE_ARN.to_owned(), NodeStatus::Active),
            ]
        );
    }

    #[tokio::test]
    async fn unresolved_protection_toggle_fails() {
        let notifier = unresolved().await;
        let err = notifier.set_protection_enabled(true).await.unwrap_err();
        assert!(matches!(err, NotifierError::IdentityUnresolved { ref cluster } if cluster == "ci"));
        assert!(notifier.client.state_calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn cluster_info_found() {
        let info = ClusterInfo {
            name: "ci".to_owned(),
            status: "ACTIVE".to_owned(),
            running_tasks_count: 3,
            pending_tasks_count: 0,
            active_services_count: 1,
        };
        let notifier = LifecycleNotifier::new(
            api().with_cluster_info(info.clone()),
            &MockInstanceMetadata::unreachable(),
            config(),
        )
        .await
        .unwrap();
        assert_eq!(notifier.get_cluster_info().await.unwrap(), info);
    }

    #[tokio::test]
    async fn cluster_info_missing() {
        let notifier = resolved().await;
        assert!(matches!(
            notifier.get_cluster_info().await,
            Err(NotifierError::ClusterNotFound(ref c)) if c == "ci"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_reports_probe_state_each_tick() {
        let notifier = Arc::new(resolved().await);
        let probe = TestProbe::default();
        probe.active.store(true, Ordering::SeqCst);

        let handle = notifier.spawn_heartbeat(probe.clone());

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(notifier.client.put_count(), 1);
        assert_eq!(notifier.client.last_put().unwrap()[0].value, "active");

        probe.active.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(notifier.client.put_count(), 2);
        assert_eq!(notifier.client.last_put().unwrap()[0].value, "inactive");

        notifier.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_survives_probe_failures() {
        let notifier = Arc::new(resolved().await);
        let probe = TestProbe::default();
        probe.failing.store(true, Ordering::SeqCst);

        let handle = notifier.spawn_heartbeat(probe.clone());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.client.put_count(), 0);

        probe.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(notifier.client.put_count(), 1);
        assert!(!handle.is_finished());

        notifier.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_survives_signal_failures() {
        let api = MockClusterApi {
            fail_put: true,
            ..api()
        };
        let notifier = Arc::new(
            LifecycleNotifier::new(api, &MockInstanceMetadata::instance("i-0abc"), config())
                .await
                .unwrap(),
        );
        let probe = TestProbe::default();
        let handle = notifier.spawn_heartbeat(probe.clone());

        tokio::time::sleep(Duration::from_secs(91)).await;
        assert_eq!(notifier.client.put_count(), 3);
        assert!(!handle.is_finished());

        notifier.stop();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_heartbeat_between_ticks() {
        let notifier = Arc::new(resolved().await);
        let probe = TestProbe::default();
        let handle = notifier.spawn_heartbeat(probe.clone());

        tokio::time::sleep(Duration::from_secs(5)).await;
        notifier.stop();
        notifier.stop();
        assert!(notifier.is_stopped());

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unresolved_heartbeat_makes_no_calls() {
        let notifier = Arc::new(unresolved().await);
        let probe = TestProbe::default();
        probe.active.store(true, Ordering::SeqCst);
        let handle = notifier.spawn_heartbeat(probe.clone());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        assert_eq!(notifier.client.put_count(), 0);

        notifier.stop();
        handle.await.unwrap();
    }
}
