use serde::{Deserialize, Deserializer, Serialize};

/// Identifier issued by FfDL for a submitted training job.
///
/// The service has returned both strings and integers here, so both are
/// accepted and held as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(i64),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => Self(s),
            Raw::Number(n) => Self(n.to_string()),
        })
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// `training.training_status.status` as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TrainingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    /// Any status this client does not act on (DOWNLOADING, STORING, ...).
    Other(String),
}

impl TrainingStatus {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for TrainingStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => Self::Pending,
            "PROCESSING" => Self::Processing,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<TrainingStatus> for String {
    fn from(value: TrainingStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resources, framework and metrics for a job built without a manifest
/// override.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOptions {
    pub name: String,
    pub description: String,
    pub version: String,
    pub gpus: f64,
    pub cpus: f64,
    pub learners: u32,
    pub memory: String,
    pub framework_name: String,
    pub framework_version: String,
    pub command: String,
    pub metric_type: String,
    pub metric_path: String,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            name: "training job".to_string(),
            description: "Training ML/DL model".to_string(),
            version: "1.0".to_string(),
            gpus: 0.0,
            cpus: 1.0,
            learners: 1,
            memory: "1Gb".to_string(),
            framework_name: "tensorflow".to_string(),
            framework_version: "latest".to_string(),
            command: "echo command not defined".to_string(),
            metric_type: "tensorboard".to_string(),
            metric_path: "$JOB_STATE_DIR/logs/tb".to_string(),
        }
    }
}
