//! Error notifications for failed batch submissions.
//!
//! A [`NotificationPayload`] is the message consumed by the chat-ops
//! integration subscribed to the monitoring topic. It is serialized to JSON
//! and handed to a [`Publisher`].

use std::borrow::Cow;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

mod sns;

pub use sns::SnsPublisher;

/// Sender label shown by the chat integration.
pub const SENDER_LABEL: &str = "AWS Batch Job Error";
/// Title of every submission failure notification.
pub const TITLE_TEXT: &str = "Error starting batch job";

/// One key/value line rendered under the notification title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomElement {
    pub key: String,
    pub value: String,
}

impl CustomElement {
    #[must_use]
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Message published to the monitoring topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub severity: String,
    pub notification_type: String,
    pub slack_username: String,
    pub title_text: String,
    pub custom_elements: Vec<CustomElement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_channel_override: Option<String>,
}

impl NotificationPayload {
    /// Build a payload with no elements and no channel override.
    #[must_use]
    pub fn new<S, T, U>(severity: S, notification_type: T, title_text: U) -> Self
    where
        S: Into<String>,
        T: Into<String>,
        U: Into<String>,
    {
        Self {
            severity: severity.into(),
            notification_type: notification_type.into(),
            slack_username: SENDER_LABEL.to_owned(),
            title_text: title_text.into(),
            custom_elements: Vec::new(),
            slack_channel_override: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_elements(mut self, elements: Vec<CustomElement>) -> Self {
        self.custom_elements = elements;
        self
    }

    /// Route the notification to a specific channel. Empty names are ignored.
    #[inline]
    #[must_use]
    pub fn with_channel_override(mut self, channel: Option<&str>) -> Self {
        self.slack_channel_override = channel
            .filter(|c| !c.trim().is_empty())
            .map(str::to_owned);
        self
    }

    /// Serialize to the message body sent to the topic.
    pub fn to_message(&self) -> Result<String, NotifyError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A submission the batch service rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobFailure<'a> {
    pub job_queue: &'a str,
    pub job_name: &'a str,
    pub job_definition_name: &'a str,
    pub error_message: &'a str,
}

/// Last `/`-separated segment of a queue identifier.
///
/// `arn:aws:batch:eu-west-2:000000000000:job-queue/reconciliation` becomes
/// `reconciliation`; a value without `/` is returned unchanged.
#[inline]
#[must_use]
pub fn queue_display_name(job_queue: &str) -> &str {
    job_queue.rsplit('/').next().unwrap_or(job_queue)
}

/// The four display elements, in the order the chat integration renders them.
pub fn custom_elements(failure: &JobFailure<'_>) -> Vec<CustomElement> {
    info!(
        job_name = failure.job_name,
        error_message = failure.error_message,
        job_queue = failure.job_queue,
        job_definition_name = failure.job_definition_name,
        "Generating custom elements"
    );

    vec![
        CustomElement::new("Job name", failure.job_name),
        CustomElement::new("Job queue", queue_display_name(failure.job_queue)),
        CustomElement::new("Job definition name", failure.job_definition_name),
        CustomElement::new("Error", failure.error_message),
    ]
}

/// Build the notification for a rejected submission.
pub fn build_error_payload(
    failure: &JobFailure<'_>,
    severity: &str,
    notification_type: &str,
    slack_channel_override: Option<&str>,
) -> NotificationPayload {
    let payload = NotificationPayload::new(severity, notification_type, TITLE_TEXT)
        .with_elements(custom_elements(failure))
        .with_channel_override(slack_channel_override);

    info!(
        payload = %payload_for_log(&payload),
        error_message = failure.error_message,
        job_queue = failure.job_queue,
        job_name = failure.job_name,
        job_definition_name = failure.job_definition_name,
        "Generated monitoring SNS error payload"
    );

    payload
}

#[inline]
fn payload_for_log(payload: &NotificationPayload) -> Cow<'static, str> {
    match payload.to_message() {
        Ok(json) => Cow::Owned(json),
        Err(_) => Cow::Borrowed("<unserializable payload>"),
    }
}

/// Acknowledgement returned by the topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    pub message_id: Option<String>,
}

/// Anything able to publish a message body to a topic.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic_arn: &str, message: String) -> Result<PublishReceipt, NotifyError>;
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
    async fn publish(&self, topic_arn: &str, message: String) -> Result<PublishReceipt, NotifyError> {
        (**self).publish(topic_arn, message).await
    }
}

/// Serialize `payload` and publish it to `topic_arn`.
pub async fn send_notification<P>(
    publisher: &P,
    payload: &NotificationPayload,
    topic_arn: &str,
    failure: &JobFailure<'_>,
) -> Result<PublishReceipt, NotifyError>
where
    P: Publisher + ?Sized,
{
    let message = payload.to_message()?;

    info!(
        payload = %message,
        sns_topic_arn = topic_arn,
        job_queue = failure.job_queue,
        job_name = failure.job_name,
        job_definition_name = failure.job_definition_name,
        "Publishing payload to SNS"
    );

    publisher.publish(topic_arn, message).await
}

/// Errors surfaced while publishing a notification.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum NotifyError {
    #[error("topic rejected the message ({code}): {message}")]
    Client { code: String, message: String },
    #[error("publish request failed: {0}")]
    Transport(String),
    #[error("failed to serialize notification: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("publisher is unavailable")]
    Unavailable,
}
