//! Core types for batch submission.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::BatchError;

/// A single submission to the batch service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub job_name: String,
    pub job_queue: String,
    pub job_definition: String,
    /// Parameters blob, already encoded by [`encode_parameters`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,
}

impl SubmitJobRequest {
    #[inline]
    pub fn new(
        job_queue: impl Into<String>,
        job_name: impl Into<String>,
        job_definition: impl Into<String>,
    ) -> Self {
        Self {
            job_name: job_name.into(),
            job_queue: job_queue.into(),
            job_definition: job_definition.into(),
            parameters: None,
        }
    }

    /// Attach a JSON parameters string, encoding it once more.
    #[inline]
    #[must_use]
    pub fn with_parameters(mut self, raw_json: &str) -> Self {
        self.parameters = Some(encode_parameters(raw_json));
        self
    }

    /// Recover the parameter map carried by the encoded blob.
    pub fn decoded_parameters(&self) -> Result<Option<HashMap<String, String>>, BatchError> {
        self.parameters
            .as_deref()
            .map(decode_parameters)
            .transpose()
    }
}

/// Identifiers returned by the batch service for an accepted job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitJobOutput {
    pub job_arn: Option<String>,
    pub job_id: String,
}

/// Encode a JSON parameters string as a JSON string literal.
///
/// The blob sent downstream is the input serialized once more, so
/// `{"a": "b"}` becomes `"{\"a\": \"b\"}"`.
#[inline]
pub fn encode_parameters(raw_json: &str) -> String {
    Value::String(raw_json.to_owned()).to_string()
}

/// Reverse [`encode_parameters`] into the string map the batch API accepts.
///
/// Non-string values are kept as their JSON text.
pub fn decode_parameters(blob: &str) -> Result<HashMap<String, String>, BatchError> {
    let inner: String = serde_json::from_str(blob)
        .map_err(|e| BatchError::InvalidParameters(format!("outer encoding: {}", e)))?;
    let value: Value = serde_json::from_str(&inner)
        .map_err(|e| BatchError::InvalidParameters(format!("inner document: {}", e)))?;

    let Value::Object(map) = value else {
        return Err(BatchError::InvalidParameters(
            "parameters must be a JSON object".into(),
        ));
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}
