//! Command type definitions shared between main.rs and tests.

use clap::Args;
use ffdl_training::JobOptions;

/// Object keys and job settings for a training launch.
///
/// Flag names keep the snake_case spelling used by existing pipeline
/// definitions; kebab-case aliases are accepted too.
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Object storage bucket file path for the training model definition
    #[arg(long = "model_def_file_path", alias = "model-def-file-path")]
    pub model_def_file_path: String,

    /// Object storage bucket file path for the FfDL manifest
    #[arg(long = "manifest_file_path", alias = "manifest-file-path", default_value = "")]
    pub manifest_file_path: String,

    /// Name of the training job
    #[arg(long = "training_job_name", alias = "training-job-name", default_value = "training job")]
    pub job_name: String,

    /// Description of the training job
    #[arg(long = "training_job_description", alias = "training-job-description", default_value = "Training ML/DL model")]
    pub job_description: String,

    /// Version of the training job
    #[arg(long = "training_job_version", alias = "training-job-version", default_value = "1.0")]
    pub job_version: String,

    /// Number of GPUs for the training job
    #[arg(long = "training_job_gpus", alias = "training-job-gpus", default_value_t = 0.0)]
    pub gpus: f64,

    /// Number of CPUs for the training job
    #[arg(long = "training_job_cpus", alias = "training-job-cpus", default_value_t = 1.0)]
    pub cpus: f64,

    /// Number of learners for the training job
    #[arg(long = "training_job_learners", alias = "training-job-learners", default_value_t = 1)]
    pub learners: u32,

    /// Amount of memory for the training job
    #[arg(long = "training_job_memory", alias = "training-job-memory", default_value = "1Gb")]
    pub memory: String,

    /// ML/DL framework name for the training job
    #[arg(long = "training_job_framework_name", alias = "training-job-framework-name", default_value = "tensorflow")]
    pub framework_name: String,

    /// ML/DL framework version for the training job
    #[arg(long = "training_job_framework_version", alias = "training-job-framework-version", default_value = "latest")]
    pub framework_version: String,

    /// Execution command for the training job
    #[arg(
        long = "training_job_command",
        aliases = ["training-job-command", "training_job_framework_command"],
        default_value = "echo command not defined"
    )]
    pub command: String,

    /// Metric storing type for the training job
    #[arg(long = "training_job_metric_type", alias = "training-job-metric-type", default_value = "tensorboard")]
    pub metric_type: String,

    /// Metric storing path for the training job
    #[arg(long = "training_job_metric_path", alias = "training-job-metric-path", default_value = "$JOB_STATE_DIR/logs/tb")]
    pub metric_path: String,
}

impl TrainArgs {
    /// Manifest key to fetch, if one was given.
    pub fn manifest_key(&self) -> Option<&str> {
        Some(self.manifest_file_path.as_str()).filter(|k| !k.is_empty())
    }

    pub fn job_options(&self) -> JobOptions {
        JobOptions {
            name: self.job_name.clone(),
            description: self.job_description.clone(),
            version: self.job_version.clone(),
            gpus: self.gpus,
            cpus: self.cpus,
            learners: self.learners,
            memory: self.memory.clone(),
            framework_name: self.framework_name.clone(),
            framework_version: self.framework_version.clone(),
            command: self.command.clone(),
            metric_type: self.metric_type.clone(),
            metric_path: self.metric_path.clone(),
        }
    }
}
