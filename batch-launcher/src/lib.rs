//! Batch job launcher.
//!
//! Resolves its configuration from arguments and the environment, submits
//! one batch job per invocation and publishes a notification to the
//! monitoring topic when the batch service rejects the submission.

pub mod clients;
pub mod error;
pub mod handler;
pub mod logging;
pub mod standalone;

pub use clients::{AwsClients, ClientFactory, SessionMode};
pub use error::LauncherError;
pub use handler::{handle_event, run_invocation, InvocationOutcome};
pub use logging::{install_tracing, LogControl};
