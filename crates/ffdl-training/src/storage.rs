//! Object storage access and artifact download.

use crate::error::{StorageError, TrainingResult};
use crate::layout::WorkLayout;
use crate::secrets::StorageCredentials;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_S3_REGION: &str = "us-east-1";

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download `bucket/key` into `dest`, replacing any existing file.
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), StorageError>;
}

/// S3-compatible store (COS, MinIO, AWS) addressed path-style with static
/// credentials.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    #[must_use]
    pub fn new(credentials: &StorageCredentials, region: &str) -> Self {
        let creds = Credentials::new(
            credentials.access_key_id.expose(),
            credentials.secret_access_key.expose(),
            None,
            None,
            "ffdl-secrets",
        );
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .endpoint_url(credentials.endpoint_url.expose())
            .credentials_provider(creds)
            .force_path_style(true)
            .build();

        Self { client: aws_sdk_s3::Client::from_conf(config) }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), StorageError> {
        let request_failed = |message: String| StorageError::Request {
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };

        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) => {
                let not_found = err.as_service_error().is_some_and(|e| e.is_no_such_key())
                    || err.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if not_found {
                    return Err(StorageError::NotFound { bucket: bucket.to_string(), key: key.to_string() });
                }
                return Err(request_failed(aws_sdk_s3::error::DisplayErrorContext(&err).to_string()));
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| request_failed(format!("failed to read object body: {e}")))?
            .into_bytes();

        tokio::fs::write(dest, &bytes)
            .await
            .map_err(|e| request_failed(format!("failed to write {}: {e}", dest.display())))?;

        Ok(())
    }
}

/// Files that exist locally after [`ArtifactFetcher::fetch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedArtifacts {
    pub model_archive: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

/// Downloads the model definition and optional manifest override from the
/// training-data bucket into the work directory.
pub struct ArtifactFetcher {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    layout: WorkLayout,
}

impl ArtifactFetcher {
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>, bucket: String, layout: WorkLayout) -> Self {
        Self { store, bucket, layout }
    }

    /// A missing object is logged and skipped, for the model archive as well
    /// as the manifest, and any copy left in the work directory by an earlier
    /// run is removed. Any other storage failure aborts.
    pub async fn fetch(&self, model_key: &str, manifest_key: Option<&str>) -> TrainingResult<FetchedArtifacts> {
        let model_archive = self.fetch_one(model_key, self.layout.model_archive_path()).await?;
        if model_archive.is_none() {
            warn!(key = model_key, "Model definition not found; submission will fail without it");
        }

        let manifest = match manifest_key.filter(|k| !k.is_empty()) {
            Some(key) => self.fetch_one(key, self.layout.manifest_path()).await?,
            None => None,
        };

        Ok(FetchedArtifacts { model_archive, manifest })
    }

    async fn fetch_one(&self, key: &str, dest: PathBuf) -> TrainingResult<Option<PathBuf>> {
        match self.store.download(&self.bucket, key, &dest).await {
            Ok(()) => {
                info!(bucket = %self.bucket, key, dest = %dest.display(), "Downloaded object");
                Ok(Some(dest))
            }
            Err(e) if e.is_not_found() => {
                warn!(bucket = %self.bucket, key, "The object does not exist.");
                match tokio::fs::remove_file(&dest).await {
                    Ok(()) => debug!(path = %dest.display(), "Removed stale local copy"),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrainingError;
    use std::collections::HashMap;
    use tempfile::TempDir;

    /// In-memory store keyed by object key. Keys listed in `broken` fail with
    /// a non-recoverable error.
    #[derive(Default)]
    struct MemoryStore {
        objects: HashMap<String, Vec<u8>>,
        broken: Vec<String>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), StorageError> {
            if self.broken.iter().any(|k| k == key) {
                return Err(StorageError::Request {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    message: "access denied".to_string(),
                });
            }
            let bytes = self.objects.get(key).ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })?;
            std::fs::write(dest, bytes).unwrap();
            Ok(())
        }
    }

    fn fetcher(store: MemoryStore, temp: &TempDir) -> ArtifactFetcher {
        ArtifactFetcher::new(Arc::new(store), "tf-data".to_string(), WorkLayout::new(temp.path().to_path_buf()))
    }

    #[tokio::test]
    async fn test_fetch_model_and_manifest() {
        let temp = TempDir::new().unwrap();
        let mut store = MemoryStore::default();
        store.objects.insert("models/mnist.zip".to_string(), b"PK".to_vec());
        store.objects.insert("manifests/mnist.yml".to_string(), b"name: x".to_vec());

        let fetched = fetcher(store, &temp).fetch("models/mnist.zip", Some("manifests/mnist.yml")).await.unwrap();

        let model = fetched.model_archive.unwrap();
        assert_eq!(std::fs::read(&model).unwrap(), b"PK");
        assert!(model.ends_with("model.zip"));
        assert!(fetched.manifest.unwrap().ends_with("manifest.yml"));
    }

    #[tokio::test]
    async fn test_missing_manifest_does_not_abort() {
        let temp = TempDir::new().unwrap();
        let mut store = MemoryStore::default();
        store.objects.insert("models/mnist.zip".to_string(), b"PK".to_vec());

        let fetched = fetcher(store, &temp).fetch("models/mnist.zip", Some("manifests/missing.yml")).await.unwrap();

        assert!(fetched.model_archive.is_some());
        assert!(fetched.manifest.is_none());
    }

    #[tokio::test]
    async fn test_missing_model_is_logged_not_raised() {
        let temp = TempDir::new().unwrap();
        let fetched = fetcher(MemoryStore::default(), &temp).fetch("models/missing.zip", None).await.unwrap();

        assert_eq!(fetched, FetchedArtifacts::default());
        assert!(!temp.path().join("model.zip").exists());
    }

    #[tokio::test]
    async fn test_missing_objects_clear_stale_local_copies() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("model.zip"), b"STALE").unwrap();
        std::fs::write(temp.path().join("manifest.yml"), b"name: stale").unwrap();

        let fetched = fetcher(MemoryStore::default(), &temp)
            .fetch("models/missing.zip", Some("manifests/missing.yml"))
            .await
            .unwrap();

        assert_eq!(fetched, FetchedArtifacts::default());
        assert!(!temp.path().join("model.zip").exists());
        assert!(!temp.path().join("manifest.yml").exists());
    }

    #[tokio::test]
    async fn test_empty_manifest_key_is_not_requested() {
        let temp = TempDir::new().unwrap();
        let mut store = MemoryStore::default();
        store.objects.insert("m.zip".to_string(), b"PK".to_vec());
        store.broken.push(String::new());

        let fetched = fetcher(store, &temp).fetch("m.zip", Some("")).await.unwrap();
        assert!(fetched.manifest.is_none());
    }

    #[tokio::test]
    async fn test_other_storage_errors_are_fatal() {
        let temp = TempDir::new().unwrap();
        let mut store = MemoryStore::default();
        store.broken.push("models/mnist.zip".to_string());

        let err = fetcher(store, &temp).fetch("models/mnist.zip", None).await.unwrap_err();
        assert!(matches!(err, TrainingError::Storage(StorageError::Request { .. })));
    }
}
