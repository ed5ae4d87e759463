//! FfDL REST client.
//!
//! This module provides the `TrainingService` seam used by the status poller
//! and its HTTP implementation against the FfDL `/v1/models` API.

use crate::error::{TrainingError, TrainingResult};
use crate::job::{JobId, TrainingStatus};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, error, info};

/// API version pinned by the FfDL REST service.
pub const DEFAULT_API_VERSION: &str = "2017-02-13";

#[async_trait]
pub trait TrainingService: Send + Sync {
    /// Submit a manifest and model archive, returning the new job's id.
    async fn submit(&self, manifest: &Path, model_archive: &Path) -> TrainingResult<JobId>;

    /// Current `training.training_status.status` of a job.
    async fn status(&self, job_id: &JobId) -> TrainingResult<TrainingStatus>;
}

/// Static identity headers sent with every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAuth {
    pub authorization: String,
    pub user_info: String,
}

impl Default for ServiceAuth {
    fn default() -> Self {
        Self {
            authorization: "test".to_string(),
            user_info: "bluemix-instance-id=test-user".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SubmitResponse {
    model_id: JobId,
}

#[derive(Deserialize)]
struct ModelDetails {
    training: TrainingDetails,
}

#[derive(Deserialize)]
struct TrainingDetails {
    training_status: TrainingStatusDetails,
}

#[derive(Deserialize)]
struct TrainingStatusDetails {
    status: TrainingStatus,
}

/// HTTP client for the FfDL REST API.
#[derive(Debug, Clone)]
pub struct FfdlClient {
    /// Base URL, e.g. `http://ffdl-restapi:8080`.
    base_url: String,
    api_version: String,
    auth: ServiceAuth,
    client: Client,
}

impl FfdlClient {
    #[must_use]
    pub fn new(base_url: &str, auth: ServiceAuth) -> Self {
        Self::with_api_version(base_url, auth, DEFAULT_API_VERSION)
    }

    #[must_use]
    pub fn with_api_version(base_url: &str, auth: ServiceAuth, api_version: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            auth,
            client: Client::new(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .query(&[("version", self.api_version.as_str())])
            .header("accept", "application/json")
            .header("Authorization", &self.auth.authorization)
            .header("X-Watson-Userinfo", &self.auth.user_info)
    }

    async fn file_part(path: &Path, file_name: &str) -> TrainingResult<Part> {
        if !path.exists() {
            return Err(TrainingError::MissingArtifact(path.to_path_buf()));
        }
        let bytes = tokio::fs::read(path).await?;
        Ok(Part::bytes(bytes).file_name(file_name.to_string()))
    }
}

#[async_trait]
impl TrainingService for FfdlClient {
    async fn submit(&self, manifest: &Path, model_archive: &Path) -> TrainingResult<JobId> {
        let form = Form::new()
            .part("manifest", Self::file_part(manifest, "manifest.yml").await?)
            .part("model_definition", Self::file_part(model_archive, "model.zip").await?);

        let response = self
            .request(reqwest::Method::POST, "/v1/models")
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, base_url = %self.base_url, "Failed to reach FfDL");
                e
            })?;

        let status = response.status();
        let body = response.text().await?;
        println!("{body}");
        debug!(%status, "FfDL submit response");

        let parsed: SubmitResponse = serde_json::from_str(&body).map_err(|e| {
            TrainingError::Service(format!("unexpected submit response ({status}): {e}"))
        })?;

        info!(job_id = %parsed.model_id, "Training job submitted");
        Ok(parsed.model_id)
    }

    async fn status(&self, job_id: &JobId) -> TrainingResult<TrainingStatus> {
        let path = format!("/v1/models/{job_id}");
        let response = self.request(reqwest::Method::GET, &path).send().await?;

        let status = response.status();
        let body = response.text().await?;
        let details: ModelDetails = serde_json::from_str(&body).map_err(|e| {
            TrainingError::Service(format!("unexpected status response for {job_id} ({status}): {e}"))
        })?;

        Ok(details.training.training_status.status)
    }
}
