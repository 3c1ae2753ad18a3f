//! Batch job submission for the launcher.
//!
//! # Architecture
//!
//! - [`BatchClient`] - The seam through which jobs reach the batch service
//! - [`AwsBatchClient`] - AWS Batch implementation with bounded in-flight requests
//! - [`submit_batch_job`] - Builds a [`SubmitJobRequest`] and submits it
//! - [`BatchError`] - Submission failures; `BatchError::Client` is the
//!   recognized rejection from the service
//!
//! # Example
//!
//! ```rust,no_run
//! use batch_launcher_queue::{submit_batch_job, AwsBatchClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let sdk = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
//!     let client = AwsBatchClient::new(aws_sdk_batch::Client::new(&sdk), 100);
//!
//!     let output = submit_batch_job(
//!         &client,
//!         "arn:aws:batch:eu-west-2:000000000000:job-queue/reconciliation",
//!         "reconciliation",
//!         "reconciliation-def",
//!         Some(r#"{"date": "2024-01-01"}"#),
//!     )
//!     .await
//!     .unwrap();
//!     println!("Submitted job: {}", output.job_id);
//! }
//! ```

mod aws;
mod client;
mod error;
mod types;

pub use aws::AwsBatchClient;
pub use client::{submit_batch_job, BatchClient};
pub use error::BatchError;
pub use types::{decode_parameters, encode_parameters, SubmitJobOutput, SubmitJobRequest};

// Re-export async_trait for convenience when implementing BatchClient
pub use async_trait::async_trait;
