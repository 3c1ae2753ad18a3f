use std::path::PathBuf;

use thiserror::Error;

use batch_launcher_config::ConfigError;
use batch_launcher_notify::NotifyError;
use batch_launcher_queue::BatchError;

/// Top-level error for one invocation.
///
/// Anything that reaches the caller fails the invocation; the only error the
/// handler recovers from is a `BatchError::Client`, which never surfaces here.
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("batch submission failed: {0}")]
    Batch(#[from] BatchError),
    #[error("notification failed: {0}")]
    Notify(#[from] NotifyError),
    #[error("invalid event document: {0}")]
    Event(#[from] serde_json::Error),
    #[error("failed to read event document {}: {source}", path.display())]
    EventFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("logging setup failed: {0}")]
    Logging(String),
}
