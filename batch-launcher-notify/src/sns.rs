use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_sns::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tokio::sync::Semaphore;

use crate::{NotifyError, PublishReceipt, Publisher};

/// Publisher backed by Amazon SNS.
///
/// At most `max_in_flight` publishes run concurrently through the
/// publisher's permit pool, which clones and [`SnsPublisher::with_permits`]
/// callers share.
#[derive(Clone)]
pub struct SnsPublisher {
    client: aws_sdk_sns::Client,
    permits: Arc<Semaphore>,
}

impl fmt::Debug for SnsPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnsPublisher")
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl SnsPublisher {
    #[must_use]
    pub fn new(client: aws_sdk_sns::Client, max_in_flight: usize) -> Self {
        Self::with_permits(client, Arc::new(Semaphore::new(max_in_flight.max(1))))
    }

    /// Draw publish permits from a pool shared with other publishers.
    #[must_use]
    pub fn with_permits(client: aws_sdk_sns::Client, permits: Arc<Semaphore>) -> Self {
        Self { client, permits }
    }

    #[inline]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl Publisher for SnsPublisher {
    async fn publish(&self, topic_arn: &str, message: String) -> Result<PublishReceipt, NotifyError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| NotifyError::Unavailable)?;

        let output = self
            .client
            .publish()
            .topic_arn(topic_arn)
            .message(message)
            .send()
            .await
            .map_err(classify)?;

        Ok(PublishReceipt {
            message_id: output.message_id().map(str::to_owned),
        })
    }
}

fn classify<E, R>(err: SdkError<E, R>) -> NotifyError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    match err.as_service_error() {
        Some(service) => NotifyError::Client {
            code: service.code().unwrap_or("Unknown").to_owned(),
            message: service.message().unwrap_or_default().to_owned(),
        },
        None => NotifyError::Transport(DisplayErrorContext(&err).to_string()),
    }
}
