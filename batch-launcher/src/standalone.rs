//! Running the handler outside Lambda against an event document on disk.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::error::LauncherError;

/// Event document used when no path is given.
pub const DEFAULT_EVENT_PATH: &str = "resources/event.json";

/// Read and parse the event document at `path`.
pub fn read_event_file(path: &Path) -> Result<Value, LauncherError> {
    let raw = std::fs::read_to_string(path).map_err(|source| LauncherError::EventFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Log the working directory the event path is resolved against.
pub fn log_working_directory() {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    info!(cwd = %cwd.display(), "Running standalone invocation");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_event_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"detail-type": "Glue Job State Change", "detail": {{"state": "SUCCEEDED"}}}}"#)
            .unwrap();

        let event = read_event_file(file.path()).unwrap();
        assert_eq!(event["detail"]["state"], "SUCCEEDED");
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        match read_event_file(&path) {
            Err(LauncherError::EventFile { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn malformed_document_is_an_event_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        assert!(matches!(
            read_event_file(file.path()),
            Err(LauncherError::Event(_))
        ));
    }
}
