//! Batch client seam and the submit operation.

use async_trait::async_trait;
use tracing::info;

use crate::error::BatchError;
use crate::types::{SubmitJobOutput, SubmitJobRequest};

/// Anything able to hand a job to the batch service.
#[async_trait]
pub trait BatchClient: Send + Sync {
    /// Submit one job and return the identifiers assigned to it.
    async fn submit_job(&self, request: SubmitJobRequest) -> Result<SubmitJobOutput, BatchError>;
}

#[async_trait]
impl<C: BatchClient + ?Sized> BatchClient for std::sync::Arc<C> {
    async fn submit_job(&self, request: SubmitJobRequest) -> Result<SubmitJobOutput, BatchError> {
        (**self).submit_job(request).await
    }
}

/// Submit a job to `job_queue`.
///
/// An absent or empty `parameters` string is left off the request entirely;
/// otherwise it is JSON-encoded once more and attached.
pub async fn submit_batch_job<C>(
    client: &C,
    job_queue: &str,
    job_name: &str,
    job_definition_name: &str,
    parameters: Option<&str>,
) -> Result<SubmitJobOutput, BatchError>
where
    C: BatchClient + ?Sized,
{
    info!(
        job_definition_name,
        job_queue,
        job_name,
        parameters = parameters.unwrap_or_default(),
        "Submitting batch job"
    );

    let mut request = SubmitJobRequest::new(job_queue, job_name, job_definition_name);
    if let Some(raw) = parameters.filter(|p| !p.is_empty()) {
        request = request.with_parameters(raw);
    }

    client.submit_job(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        requests: Mutex<Vec<SubmitJobRequest>>,
    }

    #[async_trait]
    impl BatchClient for RecordingClient {
        async fn submit_job(
            &self,
            request: SubmitJobRequest,
        ) -> Result<SubmitJobOutput, BatchError> {
            self.requests.lock().unwrap().push(request);
            Ok(SubmitJobOutput {
                job_arn: Some("test arn".into()),
                job_id: "test id".into(),
            })
        }
    }

    struct RejectingClient;

    #[async_trait]
    impl BatchClient for RejectingClient {
        async fn submit_job(&self, _: SubmitJobRequest) -> Result<SubmitJobOutput, BatchError> {
            Err(BatchError::client("ClientException", "job queue does not exist"))
        }
    }

    #[tokio::test]
    async fn submits_without_parameters() {
        let client = RecordingClient::default();
        let output = submit_batch_job(&client, "test/job_queue", "test job", "test/job_definition", None)
            .await
            .expect("submit");

        assert_eq!(output.job_id, "test id");
        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0],
            SubmitJobRequest::new("test/job_queue", "test job", "test/job_definition")
        );
    }

    #[tokio::test]
    async fn empty_parameters_are_omitted() {
        let client = RecordingClient::default();
        submit_batch_job(&client, "q", "n", "d", Some("")).await.unwrap();
        assert_eq!(client.requests.lock().unwrap()[0].parameters, None);
    }

    #[tokio::test]
    async fn parameters_are_re_encoded() {
        let client = RecordingClient::default();
        let parameters = r#"{"test_key": "test_value"}"#;
        submit_batch_job(&client, "q", "n", "d", Some(parameters)).await.unwrap();

        let sent = client.requests.lock().unwrap()[0].parameters.clone().unwrap();
        assert_eq!(sent, serde_json::to_string(parameters).unwrap());
    }

    #[tokio::test]
    async fn client_errors_are_returned() {
        let err = submit_batch_job(&RejectingClient, "q", "n", "d", None)
            .await
            .unwrap_err();
        match err {
            BatchError::Client { message, .. } => assert_eq!(message, "job queue does not exist"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
