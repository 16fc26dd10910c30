//! ECS API abstraction for testability.
//!
//! [`ClusterApi`] covers the control-plane calls the notifier makes.
//! Production code uses [`EcsClusterClient`]; unit tests use `MockClusterApi`.
//!
//! # Error Handling
//!
//! Every SDK failure becomes `NotifierError::ClusterApi` with the full error
//! context; partial failures reported in a successful response are errors
//! too.

use std::future::Future;

use aws_sdk_ecs::error::DisplayErrorContext;
use aws_sdk_ecs::types::{Attribute, ContainerInstanceStatus, TargetType};

use crate::cluster::{ClusterInfo, ContainerInstanceRef, NodeAttribute, NodeStatus};
use crate::error::NotifierError;

/// DescribeContainerInstances accepts at most this many ARNs per call.
const DESCRIBE_BATCH_SIZE: usize = 100;

/// Trait abstracting ECS control-plane operations.
pub trait ClusterApi: Send + Sync + 'static {
    /// Lists every container instance ARN registered in `cluster`.
    fn list_container_instances(
        &self,
        cluster: &str,
    ) -> impl Future<Output = Result<Vec<String>, NotifierError>> + Send;

    /// Describes container instances, reporting their EC2 instance IDs.
    fn describe_container_instances(
        &self,
        cluster: &str,
        arns: &[String],
    ) -> impl Future<Output = Result<Vec<ContainerInstanceRef>, NotifierError>> + Send;

    /// Sets attributes on container instances.
    fn put_attributes(
        &self,
        cluster: &str,
        attributes: &[NodeAttribute],
    ) -> impl Future<Output = Result<(), NotifierError>> + Send;

    /// Changes the administrative state of one container instance.
    fn update_instance_state(
        &self,
        cluster: &str,
        arn: &str,
        status: NodeStatus,
    ) -> impl Future<Output = Result<(), NotifierError>> + Send;

    /// Describes a cluster; `None` when it does not exist.
    fn describe_cluster(
        &self,
        cluster: &str,
    ) -> impl Future<Output = Result<Option<ClusterInfo>, NotifierError>> + Send;
}

/// Loads the shared AWS configuration for `region`.
///
/// Credentials come from the default provider chain (environment, profile,
/// instance role).
pub async fn load_aws_config(region: &str) -> aws_config::SdkConfig {
    aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_sdk_ecs::config::Region::new(region.to_owned()))
        .load()
        .await
}

/// Production ECS client backed by `aws-sdk-ecs`.
#[derive(Clone)]
pub struct EcsClusterClient {
    client: aws_sdk_ecs::Client,
}

impl EcsClusterClient {
    /// Creates a client from a loaded AWS configuration.
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_ecs::Client::new(config),
        }
    }
}

fn api_error<E>(operation: &str, err: E) -> NotifierError
where
    E: std::error::Error + Send + Sync + 'static,
{
    NotifierError::ClusterApi(format!("{operation} failed: {}", DisplayErrorContext(err)))
}

impl ClusterApi for EcsClusterClient {
    async fn list_container_instances(&self, cluster: &str) -> Result<Vec<String>, NotifierError> {
        let mut arns = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_container_instances()
                .cluster(cluster)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| api_error("list container instances", e))?;

            arns.extend(output.container_instance_arns().iter().cloned());

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_owned()),
                _ => break,
            }
        }

        Ok(arns)
    }

    async fn describe_container_instances(
        &self,
        cluster: &str,
        arns: &[String],
    ) -> Result<Vec<ContainerInstanceRef>, NotifierError> {
        let mut instances = Vec::with_capacity(arns.len());

        for batch in arns.chunks(DESCRIBE_BATCH_SIZE) {
            let output = self
                .client
                .describe_container_instances()
                .cluster(cluster)
                .set_container_instances(Some(batch.to_vec()))
                .send()
                .await
                .map_err(|e| api_error("describe container instances", e))?;

            instances.extend(output.container_instances().iter().filter_map(|instance| {
                instance
                    .container_instance_arn()
                    .map(|arn| ContainerInstanceRef {
                        arn: arn.to_owned(),
                        ec2_instance_id: instance.ec2_instance_id().map(str::to_owned),
                    })
            }));
        }

        Ok(instances)
    }

    async fn put_attributes(
        &self,
        cluster: &str,
        attributes: &[NodeAttribute],
    ) -> Result<(), NotifierError> {
        let mut request = self.client.put_attributes().cluster(cluster);

        for attribute in attributes {
            let attribute = Attribute::builder()
                .name(&attribute.name)
                .value(&attribute.value)
                .target_type(TargetType::ContainerInstance)
                .target_id(&attribute.target_id)
                .build()
                .map_err(|e| api_error("build attribute", e))?;
            request = request.attributes(attribute);
        }

        request
            .send()
            .await
            .map_err(|e| api_error("put attributes", e))?;
        Ok(())
    }

    async fn update_instance_state(
        &self,
        cluster: &str,
        arn: &str,
        status: NodeStatus,
    ) -> Result<(), NotifierError> {
        let status = match status {
            NodeStatus::Active => ContainerInstanceStatus::Active,
            NodeStatus::Draining => ContainerInstanceStatus::Draining,
        };

        let output = self
            .client
            .update_container_instances_state()
            .cluster(cluster)
            .container_instances(arn)
            .status(status)
            .send()
            .await
            .map_err(|e| api_error("update container instances state", e))?;

        if let Some(failure) = output.failures().first() {
            return Err(NotifierError::ClusterApi(format!(
                "update container instances state failed for {}: {}",
                failure.arn().unwrap_or(arn),
                failure.reason().unwrap_or("unknown reason")
            )));
        }

        Ok(())
    }

    async fn describe_cluster(&self, cluster: &str) -> Result<Option<ClusterInfo>, NotifierError> {
        let output = self
            .client
            .describe_clusters()
            .clusters(cluster)
            .send()
            .await
            .map_err(|e| api_error("describe clusters", e))?;

        Ok(output.clusters().first().map(|c| ClusterInfo {
            name: c.cluster_name().unwrap_or(cluster).to_owned(),
            status: c.status().unwrap_or_default().to_owned(),
            running_tasks_count: c.running_tasks_count(),
            pending_tasks_count: c.pending_tasks_count(),
            active_services_count: c.active_services_count(),
        }))
    }
}

/// Recording ECS mock for unit tests.
#[cfg(test)]
#[derive(Default)]
pub struct MockClusterApi {
    pub instances: Vec<ContainerInstanceRef>,
    pub cluster_info: Option<ClusterInfo>,
    pub fail_list: bool,
    pub fail_put: bool,
    pub list_calls: std::sync::atomic::AtomicUsize,
    pub put_calls: std::sync::Mutex<Vec<Vec<NodeAttribute>>>,
    pub state_calls: std::sync::Mutex<Vec<(String, NodeStatus)>>,
}

#[cfg(test)]
impl MockClusterApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(mut self, arn: &str, ec2_instance_id: &str) -> Self {
        self.instances.push(ContainerInstanceRef {
            arn: arn.to_owned(),
            ec2_instance_id: Some(ec2_instance_id.to_owned()),
        });
        self
    }

    pub fn with_cluster_info(mut self, info: ClusterInfo) -> Self {
        self.cluster_info = Some(info);
        self
    }

    pub fn put_count(&self) -> usize {
        self.put_calls.lock().unwrap().len()
    }

    pub fn last_put(&self) -> Option<Vec<NodeAttribute>> {
        self.put_calls.lock().unwrap().last().cloned()
    }
}

#[cfg(test)]
impl ClusterApi for MockClusterApi {
    async fn list_container_instances(&self, _cluster: &str) -> Result<Vec<String>, NotifierError> {
        self.list_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if self.fail_list {
            return Err(NotifierError::ClusterApi("mock list failure".to_owned()));
        }
        Ok(self.instances.iter().map(|i| i.arn.clone()).collect())
    }

    async fn describe_container_instances(
        &self,
        _cluster: &str,
        arns: &[String],
    ) -> Result<Vec<ContainerInstanceRef>, NotifierError> {
        Ok(self
            .instances
            .iter()
            .filter(|i| arns.contains(&i.arn))
            .cloned()
            .collect())
    }

    async fn put_attributes(
        &self,
        _cluster: &str,
        attributes: &[NodeAttribute],
    ) -> Result<(), NotifierError> {
        self.put_calls.lock().unwrap().push(attributes.to_vec());
        if self.fail_put {
            return Err(NotifierError::ClusterApi("mock put failure".to_owned()));
        }
        Ok(())
    }

    async fn update_instance_state(
        &self,
        _cluster: &str,
        arn: &str,
        status: NodeStatus,
    ) -> Result<(), NotifierError> {
        self.state_calls
            .lock()
            .unwrap()
            .push((arn.to_owned(), status));
        Ok(())
    }

    async fn describe_cluster(&self, _cluster: &str) -> Result<Option<ClusterInfo>, NotifierError> {
        Ok(self.cluster_info.clone())
    }
}
