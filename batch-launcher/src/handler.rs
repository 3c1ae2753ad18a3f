//! One invocation: resolve configuration, submit the job, alert on rejection.

use batch_launcher_config::{load_config_with, Config, LaunchArgs};
use batch_launcher_notify::{build_error_payload, send_notification, JobFailure, PublishReceipt};
use batch_launcher_queue::{submit_batch_job, BatchError, SubmitJobOutput};
use serde_json::Value;
use tracing::{error, info, info_span, Instrument};

use crate::clients::ClientFactory;
use crate::error::LauncherError;
use crate::logging::LogControl;

/// How an invocation ended without failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The job was accepted.
    Submitted(SubmitJobOutput),
    /// The job was rejected and the rejection was published to the alert topic.
    Notified {
        error_message: String,
        receipt: PublishReceipt,
    },
}

/// Submit the configured job for `event`.
///
/// A missing alert topic or job target fails before any client is built.
/// A rejection by the batch service is published to the alert topic and the
/// invocation still succeeds; every other error is returned.
pub async fn handle_event<F>(
    config: &Config,
    clients: &F,
    event: &Value,
) -> Result<InvocationOutcome, LauncherError>
where
    F: ClientFactory + ?Sized,
{
    let span = info_span!(
        "invocation",
        environment = %config.logging.environment,
        application = %config.logging.application,
    );
    process(config, clients, event).instrument(span).await
}

async fn process<F>(
    config: &Config,
    clients: &F,
    event: &Value,
) -> Result<InvocationOutcome, LauncherError>
where
    F: ClientFactory + ?Sized,
{
    info!(sns_event = %event, mode = "handler", "SNS Event");

    let topic = config.monitoring.require_topic()?;
    let target = config.batch.require_target()?;

    let batch = clients.batch_client();
    let publisher = clients.publisher();

    let result = submit_batch_job(
        &batch,
        target.job_queue,
        target.job_name,
        target.job_definition_name,
        config.batch.parameters_json.as_deref(),
    )
    .await;

    match result {
        Ok(output) => {
            info!(
                job_arn = output.job_arn.as_deref().unwrap_or("-"),
                job_id = %output.job_id,
                job_queue = target.job_queue,
                job_name = target.job_name,
                job_definition_name = target.job_definition_name,
                "Batch job submitted successfully"
            );
            Ok(InvocationOutcome::Submitted(output))
        }
        Err(BatchError::Client { code, message }) => {
            error!(
                error_code = %code,
                error_message = %message,
                job_queue = target.job_queue,
                job_name = target.job_name,
                job_definition_name = target.job_definition_name,
                "Error occurred submitting batch job"
            );

            let failure = JobFailure {
                job_queue: target.job_queue,
                job_name: target.job_name,
                job_definition_name: target.job_definition_name,
                error_message: &message,
            };
            let payload = build_error_payload(
                &failure,
                &config.monitoring.severity,
                &config.monitoring.notification_type,
                config.monitoring.slack_channel_override.as_deref(),
            );
            let receipt = send_notification(&publisher, &payload, topic, &failure).await?;

            Ok(InvocationOutcome::Notified {
                error_message: message,
                receipt,
            })
        }
        Err(other) => Err(other.into()),
    }
}

/// Resolve configuration through `lookup`, apply its log level and handle `event`.
pub async fn run_invocation<L, F>(
    args: &LaunchArgs,
    lookup: L,
    log: &LogControl,
    clients: &F,
    event: &Value,
) -> Result<InvocationOutcome, LauncherError>
where
    L: Fn(&str) -> Option<String>,
    F: ClientFactory + ?Sized,
{
    let config = load_config_with(args, lookup)?;
    log.apply(config.logging.level)?;
    handle_event(&config, clients, event).await
}
