//! Error types for batch submission.

use thiserror::Error;

/// Errors that may occur while submitting a batch job.
///
/// Only [`BatchError::Client`] is a recognized rejection from the batch
/// service itself; callers that alert on failed submissions match on it and
/// let every other variant propagate.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("batch service rejected the request ({code}): {message}")]
    Client { code: String, message: String },

    #[error("batch service request failed: {0}")]
    Transport(String),

    #[error("invalid job parameters: {0}")]
    InvalidParameters(String),

    #[error("batch client is unavailable")]
    Unavailable,
}

impl BatchError {
    pub fn client(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Client {
            code: code.into(),
            message: message.into(),
        }
    }
}
