//! Host identity from the platform metadata service.

use std::future::Future;

use crate::error::NotifierError;

const INSTANCE_ID_PATH: &str = "/latest/meta-data/instance-id";

/// Source of this host's platform instance ID.
pub trait InstanceMetadata: Send + Sync {
    fn instance_id(&self) -> impl Future<Output = Result<String, NotifierError>> + Send;
}

/// EC2 instance metadata service (IMDSv2) client.
pub struct ImdsInstanceMetadata {
    client: aws_config::imds::Client,
}

impl ImdsInstanceMetadata {
    pub fn new() -> Self {
        Self {
            client: aws_config::imds::Client::builder().build(),
        }
    }
}

impl Default for ImdsInstanceMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceMetadata for ImdsInstanceMetadata {
    async fn instance_id(&self) -> Result<String, NotifierError> {
        let value = self
            .client
            .get(INSTANCE_ID_PATH)
            .await
            .map_err(|e| NotifierError::Metadata(format!("failed to get instance ID: {e}")))?;

        let id: &str = value.as_ref();
        let id = id.trim();
        if id.is_empty() {
            return Err(NotifierError::Metadata("empty instance ID".to_owned()));
        }
        Ok(id.to_owned())
    }
}

/// Fixed-answer metadata mock for unit tests.
#[cfg(test)]
pub struct MockInstanceMetadata(pub Result<String, String>);

#[cfg(test)]
impl MockInstanceMetadata {
    pub fn instance(id: &str) -> Self {
        Self(Ok(id.to_owned()))
    }

    pub fn unreachable() -> Self {
        Self(Err("connection timed out".to_owned()))
    }
}

#[cfg(test)]
impl InstanceMetadata for MockInstanceMetadata {
    async fn instance_id(&self) -> Result<String, NotifierError> {
        self.0.clone().map_err(NotifierError::Metadata)
    }
}
