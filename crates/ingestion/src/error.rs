//! Error types for the ingestion crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use snow_common::DataSource;
use thiserror::Error;
use transforms::TransformError;

use crate::catalog::TaskId;

/// Errors that can occur during an ingest run.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read config from '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML in '{path}': {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(transparent)]
    Common(#[from] snow_common::CommonError),

    #[error(transparent)]
    Schema(#[from] schema::SchemaError),

    #[error("Unknown task '{0}'")]
    UnknownTask(String),

    #[error("Task '{task}' does not belong to {data_source}; expected one of: {}", .valid.join(", "))]
    TaskNotInSource {
        task: TaskId,
        data_source: DataSource,
        valid: Vec<&'static str>,
    },

    #[error("Tasks '{first}' and '{second}' in {data_source} both write to '{destination}'")]
    DuplicateDestination {
        data_source: DataSource,
        destination: PathBuf,
        first: TaskId,
        second: TaskId,
    },

    #[error("Another {data_source} ingest is running (lock file '{path}' exists); remove it if no ingest is running")]
    LockHeld {
        data_source: DataSource,
        path: PathBuf,
    },

    #[error("Failed to {action} run lock '{path}': {source}")]
    Lock {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create staging directory in '{path}': {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task '{task}' failed for {data_source}: {error}")]
    TaskFailed {
        task: TaskId,
        data_source: DataSource,
        #[source]
        error: TransformError,
    },

    #[error("Task '{task}' for {data_source} did not finish within {}s", .timeout.as_secs())]
    TaskTimedOut {
        task: TaskId,
        data_source: DataSource,
        timeout: Duration,
    },

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Errors while swapping a staging directory into the live location.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Live path '{0}' exists but is not a directory")]
    LiveNotDirectory(PathBuf),

    #[error("Failed to move live directory '{live}' to backup '{backup}': {source}")]
    Backup {
        live: PathBuf,
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to promote staging '{staging}' to live '{live}': {source}. {}", recovery_hint(.live, .backup.as_deref()))]
    PromotionFailed {
        staging: PathBuf,
        live: PathBuf,
        backup: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },
}

fn recovery_hint(live: &Path, backup: Option<&Path>) -> String {
    match backup {
        Some(backup) => format!(
            "Live path is now absent; restore it manually by renaming '{}' to '{}'",
            backup.display(),
            live.display()
        ),
        None => "Nothing was live before this run".to_string(),
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_failed_names_backup() {
        let err = PublishError::PromotionFailed {
            staging: PathBuf::from("/wip/2024-01-15_x"),
            live: PathBuf::from("/live/snow-water-equivalent"),
            backup: Some(PathBuf::from("/backup/snow-water-equivalent/bkp-2024-01-15")),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        let message = err.to_string();
        assert!(message.contains("renaming '/backup/snow-water-equivalent/bkp-2024-01-15'"));
        assert!(message.contains("to '/live/snow-water-equivalent'"));
    }
}
