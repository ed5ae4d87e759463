//! FfDL job manifest.
//!
//! A manifest is either synthesized from [`JobOptions`] or loaded from an
//! override file fetched from object storage. Either way the first data store
//! is rewritten with live credentials by [`inject_credentials`] before the
//! manifest is written out for submission.

use crate::error::{TrainingError, TrainingResult};
use crate::job::JobOptions;
use crate::secrets::{Buckets, StorageCredentials};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Keys this client does not model are kept here and written back unchanged.
pub type Extra = BTreeMap<String, serde_yaml::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    pub gpus: f64,
    pub cpus: f64,
    pub learners: u32,
    #[serde(deserialize_with = "scalar_string")]
    pub memory: String,
    pub data_stores: Vec<DataStore>,
    pub framework: Framework,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_metrics: Option<EvaluationMetrics>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStore {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_data: Option<Container>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub training_results: Option<Container>,
    #[serde(default)]
    pub connection: Connection,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Container {
    pub container: String,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Container {
    fn named(container: &str) -> Self {
        Self { container: container.to_string(), extra: Extra::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default)]
    pub auth_url: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub password: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Framework {
    pub name: String,
    #[serde(deserialize_with = "scalar_string")]
    pub version: String,
    pub command: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "in")]
    pub path: String,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Accept `version: 1.0` as well as `version: "1.0"`.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_yaml::Value::deserialize(deserializer)? {
        serde_yaml::Value::String(s) => Ok(s),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!("expected a scalar, found {other:?}"))),
    }
}

impl Manifest {
    /// Default manifest with a single `mount_cos` data store. Connection and
    /// bucket fields are left empty for [`inject_credentials`] to fill.
    #[must_use]
    pub fn from_options(options: &JobOptions) -> Self {
        Self {
            name: options.name.clone(),
            description: options.description.clone(),
            version: options.version.clone(),
            gpus: options.gpus,
            cpus: options.cpus,
            learners: options.learners,
            memory: options.memory.clone(),
            data_stores: vec![DataStore {
                id: "cos".to_string(),
                kind: "mount_cos".to_string(),
                training_data: Some(Container::default()),
                training_results: Some(Container::default()),
                connection: Connection::default(),
                extra: Extra::new(),
            }],
            framework: Framework {
                name: options.framework_name.clone(),
                version: options.framework_version.clone(),
                command: options.command.clone(),
                extra: Extra::new(),
            },
            evaluation_metrics: Some(EvaluationMetrics {
                kind: options.metric_type.clone(),
                path: options.metric_path.clone(),
                extra: Extra::new(),
            }),
            extra: Extra::new(),
        }
    }

    pub fn load(path: &Path) -> TrainingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = serde_yaml::from_str(&content)?;
        Ok(manifest)
    }

    pub fn to_yaml(&self) -> TrainingResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Write the manifest as block-style YAML, replacing any existing file.
    pub fn write(&self, path: &Path) -> TrainingResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}

/// Overwrite the first data store's connection and containers with the
/// live storage credentials and bucket names.
pub fn inject_credentials(
    mut manifest: Manifest,
    storage: &StorageCredentials,
    buckets: &Buckets,
) -> TrainingResult<Manifest> {
    let store = manifest
        .data_stores
        .first_mut()
        .ok_or_else(|| TrainingError::Manifest("manifest has no data_stores entry".to_string()))?;

    store.connection.auth_url = storage.endpoint_url.expose().to_string();
    store.connection.user_name = storage.access_key_id.expose().to_string();
    store.connection.password = storage.secret_access_key.expose().to_string();

    match store.training_data.as_mut() {
        Some(c) => c.container.clone_from(&buckets.training_data),
        None => store.training_data = Some(Container::named(&buckets.training_data)),
    }
    match store.training_results.as_mut() {
        Some(c) => c.container.clone_from(&buckets.training_results),
        None => store.training_results = Some(Container::named(&buckets.training_results)),
    }

    Ok(manifest)
}

/// Produce the manifest to submit: the override file if one was fetched,
/// otherwise the default built from `options`, with credentials injected.
pub fn build_manifest(
    options: &JobOptions,
    override_file: Option<&Path>,
    storage: &StorageCredentials,
    buckets: &Buckets,
) -> TrainingResult<Manifest> {
    let base = match override_file {
        Some(path) => {
            tracing::info!(path = %path.display(), "Using manifest override");
            Manifest::load(path)?
        }
        None => Manifest::from_options(options),
    };
    inject_credentials(base, storage, buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::Credential;
    use tempfile::TempDir;

    fn storage() -> StorageCredentials {
        StorageCredentials {
            endpoint_url: Credential::new("http://s3.local:9000"),
            access_key_id: Credential::new("access"),
            secret_access_key: Credential::new("secret"),
        }
    }

    fn buckets() -> Buckets {
        Buckets { training_data: "tf-data".to_string(), training_results: "tf-results".to_string() }
    }

    const OVERRIDE: &str = r#"
name: mnist
description: MNIST in TensorFlow
version: 1.0
gpus: 1
cpus: 2
learners: 1
memory: 2Gb
data_stores:
  - id: sl-internal-os
    type: mount_cos
    training_data:
      container: placeholder-data
    training_results:
      container: placeholder-results
    connection:
      auth_url: http://placeholder
      user_name: placeholder-user
      password: placeholder-password
framework:
  name: tensorflow
  version: "1.5.0-py3"
  command: python3 convolutional_network.py
evaluation_metrics:
  type: tensorboard
  in: "$JOB_STATE_DIR/logs/tb"
"#;

    fn assert_injected(manifest: &Manifest) {
        let store = &manifest.data_stores[0];
        assert_eq!(store.connection.auth_url, "http://s3.local:9000");
        assert_eq!(store.connection.user_name, "access");
        assert_eq!(store.connection.password, "secret");
        assert_eq!(store.training_data.as_ref().unwrap().container, "tf-data");
        assert_eq!(store.training_results.as_ref().unwrap().container, "tf-results");
    }

    #[test]
    fn test_default_manifest_carries_live_credentials() {
        let manifest = build_manifest(&JobOptions::default(), None, &storage(), &buckets()).unwrap();

        assert_eq!(manifest.name, "training job");
        assert_eq!(manifest.data_stores.len(), 1);
        assert_eq!(manifest.data_stores[0].id, "cos");
        assert_eq!(manifest.data_stores[0].kind, "mount_cos");
        assert_injected(&manifest);
    }

    #[test]
    fn test_override_placeholders_are_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.yml");
        std::fs::write(&path, OVERRIDE).unwrap();

        let manifest = build_manifest(&JobOptions::default(), Some(&path), &storage(), &buckets()).unwrap();

        assert_eq!(manifest.name, "mnist");
        assert_eq!(manifest.version, "1.0");
        assert_eq!(manifest.data_stores[0].id, "sl-internal-os");
        assert_injected(&manifest);
    }

    #[test]
    fn test_injection_is_idempotent() {
        let once = inject_credentials(Manifest::from_options(&JobOptions::default()), &storage(), &buckets()).unwrap();
        let twice = inject_credentials(once.clone(), &storage(), &buckets()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_injection_replaces_previous_credentials() {
        let mut manifest = Manifest::from_options(&JobOptions::default());
        manifest.data_stores[0].connection.password = "stale".to_string();
        manifest.data_stores[0].training_data = None;

        let manifest = inject_credentials(manifest, &storage(), &buckets()).unwrap();
        assert_injected(&manifest);
    }

    #[test]
    fn test_injection_requires_a_data_store() {
        let mut manifest = Manifest::from_options(&JobOptions::default());
        manifest.data_stores.clear();
        let err = inject_credentials(manifest, &storage(), &buckets()).unwrap_err();
        assert!(matches!(err, TrainingError::Manifest(_)));
    }

    #[test]
    fn test_written_manifest_is_block_style_and_keeps_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("in.yml");
        let out = dir.path().join("out.yml");
        std::fs::write(&src, format!("{OVERRIDE}job_monitor:\n  enabled: true\n")).unwrap();

        let manifest = build_manifest(&JobOptions::default(), Some(&src), &storage(), &buckets()).unwrap();
        manifest.write(&out).unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("data_stores:\n- id: sl-internal-os"));
        assert!(written.contains("  connection:\n    auth_url: http://s3.local:9000"));
        assert!(written.contains("in: $JOB_STATE_DIR/logs/tb"));
        assert!(!written.contains('{'));

        let reloaded = Manifest::load(&out).unwrap();
        assert!(reloaded.extra.contains_key("job_monitor"));
        assert_eq!(reloaded, manifest);
    }
}
