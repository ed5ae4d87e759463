use std::path::PathBuf;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("failed to read secret {path}: {source}")]
    Secret {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest: {0}")]
    Manifest(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("missing artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("training service error: {0}")]
    Service(String),

    #[error("log stream error: {0}")]
    LogStream(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors reported by an object store.
///
/// `NotFound` is the only recoverable kind; everything else aborts the run.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: s3://{bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("object storage request failed for s3://{bucket}/{key}: {message}")]
    Request { bucket: String, key: String, message: String },
}

impl StorageError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
