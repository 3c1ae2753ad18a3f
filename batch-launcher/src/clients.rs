//! Service client construction.

use std::sync::Arc;

use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use batch_launcher_config::Config;
use batch_launcher_notify::{Publisher, SnsPublisher};
use batch_launcher_queue::{AwsBatchClient, BatchClient};
use tokio::sync::Semaphore;

/// Concurrent requests allowed through one client.
pub const MAX_POOL_CONNECTIONS: usize = 100;
/// Attempts per request, the first one included.
pub const MAX_ATTEMPTS: u32 = 10;

/// How credentials are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Ambient credentials of the function's execution role.
    Lambda,
    /// The configured named profile.
    Standalone,
}

/// Load shared SDK settings: region, retry policy and, outside Lambda, the profile.
pub async fn load_sdk_config(config: &Config, mode: SessionMode) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws.region.clone()))
        .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS));

    if mode == SessionMode::Standalone {
        loader = loader.profile_name(&config.aws.profile);
    }

    loader.load().await
}

/// Builds the clients an invocation talks to.
///
/// Called only after configuration has been validated, so a failed
/// validation never constructs a client.
pub trait ClientFactory: Send + Sync {
    type Batch: BatchClient;
    type Publisher: Publisher;

    fn batch_client(&self) -> Self::Batch;
    fn publisher(&self) -> Self::Publisher;
}

/// Factory for the AWS Batch and SNS clients.
///
/// Every client it builds draws from the same per-service permit pool, so
/// the in-flight bound holds across invocations of a warm process.
#[derive(Debug, Clone)]
pub struct AwsClients {
    sdk: SdkConfig,
    batch_permits: Arc<Semaphore>,
    publish_permits: Arc<Semaphore>,
}

impl AwsClients {
    pub fn from_sdk_config(sdk: SdkConfig) -> Self {
        Self {
            sdk,
            batch_permits: Arc::new(Semaphore::new(MAX_POOL_CONNECTIONS)),
            publish_permits: Arc::new(Semaphore::new(MAX_POOL_CONNECTIONS)),
        }
    }

    pub async fn load(config: &Config, mode: SessionMode) -> Self {
        Self::from_sdk_config(load_sdk_config(config, mode).await)
    }
}

impl ClientFactory for AwsClients {
    type Batch = AwsBatchClient;
    type Publisher = SnsPublisher;

    fn batch_client(&self) -> AwsBatchClient {
        AwsBatchClient::with_permits(
            aws_sdk_batch::Client::new(&self.sdk),
            Arc::clone(&self.batch_permits),
        )
    }

    fn publisher(&self) -> SnsPublisher {
        SnsPublisher::with_permits(
            aws_sdk_sns::Client::new(&self.sdk),
            Arc::clone(&self.publish_permits),
        )
    }
}
