//! AWS Batch implementation of [`BatchClient`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_batch::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::client::BatchClient;
use crate::error::BatchError;
use crate::types::{SubmitJobOutput, SubmitJobRequest};

/// Batch client backed by the AWS SDK.
///
/// At most `max_in_flight` requests are sent concurrently through the
/// client's permit pool, which clones and [`AwsBatchClient::with_permits`]
/// callers share.
/// Retries of transient failures are left to the SDK's retry configuration.
#[derive(Clone)]
pub struct AwsBatchClient {
    client: aws_sdk_batch::Client,
    permits: Arc<Semaphore>,
}

impl fmt::Debug for AwsBatchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsBatchClient")
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl AwsBatchClient {
    pub fn new(client: aws_sdk_batch::Client, max_in_flight: usize) -> Self {
        Self::with_permits(client, Arc::new(Semaphore::new(max_in_flight.max(1))))
    }

    /// Draw request permits from a pool shared with other clients.
    pub fn with_permits(client: aws_sdk_batch::Client, permits: Arc<Semaphore>) -> Self {
        Self { client, permits }
    }

    #[inline]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

#[async_trait]
impl BatchClient for AwsBatchClient {
    async fn submit_job(&self, request: SubmitJobRequest) -> Result<SubmitJobOutput, BatchError> {
        let parameters = request.decoded_parameters()?;
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BatchError::Unavailable)?;

        let output = self
            .client
            .submit_job()
            .job_name(&request.job_name)
            .job_queue(&request.job_queue)
            .job_definition(&request.job_definition)
            .set_parameters(parameters)
            .send()
            .await
            .map_err(classify)?;

        debug!(job_id = output.job_id(), "batch service accepted job");

        Ok(SubmitJobOutput {
            job_arn: output.job_arn().map(str::to_owned),
            job_id: output.job_id().to_owned(),
        })
    }
}

/// Service error responses are client errors; everything else is transport.
fn classify<E, R>(err: SdkError<E, R>) -> BatchError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: fmt::Debug + Send + Sync + 'static,
{
    match err.as_service_error() {
        Some(service) => BatchError::Client {
            code: service.code().unwrap_or("Unknown").to_owned(),
            message: service.message().unwrap_or_default().to_owned(),
        },
        None => BatchError::Transport(DisplayErrorContext(&err).to_string()),
    }
}
