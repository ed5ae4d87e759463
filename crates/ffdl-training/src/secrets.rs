//! Single-line credential files.
//!
//! Each secret lives in its own file under a secrets directory (mounted at
//! `/app/secrets` in the pipeline container). Values may be wrapped in
//! single quotes.

use crate::error::{TrainingError, TrainingResult};
use std::path::{Path, PathBuf};

pub const DEFAULT_SECRETS_DIR: &str = "/app/secrets";

/// An opaque credential value. `Debug` never prints the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Read the first line of `path`, dropping the line terminator and any
/// surrounding single quotes.
pub fn load_secret(path: &Path) -> TrainingResult<Credential> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| TrainingError::Secret { path: path.to_path_buf(), source })?;

    let line = content.lines().next().unwrap_or_default();
    Ok(Credential::new(line.trim_matches('\'')))
}

/// Endpoint and key pair for the S3-compatible object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCredentials {
    pub endpoint_url: Credential,
    pub access_key_id: Credential,
    pub secret_access_key: Credential,
}

/// Buckets holding training input and receiving training output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Buckets {
    pub training_data: String,
    pub training_results: String,
}

/// Everything loaded from the secrets directory.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub storage: StorageCredentials,
    pub buckets: Buckets,
    pub ffdl_rest: Credential,
}

impl Secrets {
    pub fn load_from_dir(dir: &Path) -> TrainingResult<Self> {
        let read = |name: &str| -> TrainingResult<Credential> {
            let path: PathBuf = dir.join(name);
            load_secret(&path)
        };

        let endpoint_url = read("s3_url")?;
        let training_data = read("training_bucket")?;
        let training_results = read("result_bucket")?;
        let access_key_id = read("s3_access_key_id")?;
        let secret_access_key = read("s3_secret_access_key")?;
        let ffdl_rest = read("ffdl_rest")?;

        tracing::debug!(dir = %dir.display(), "Loaded secrets");

        Ok(Self {
            storage: StorageCredentials { endpoint_url, access_key_id, secret_access_key },
            buckets: Buckets {
                training_data: training_data.expose().to_string(),
                training_results: training_results.expose().to_string(),
            },
            ffdl_rest,
        })
    }
}
