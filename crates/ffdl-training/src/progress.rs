use crate::job::{JobId, TrainingStatus};
use colored::Colorize;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Submitted { job_id: JobId },
    Status { job_id: JobId, status: TrainingStatus },
    LogLine { job_id: JobId, line: String },
    LogsStalled { job_id: JobId, idle_reads: u32 },
    Completed { job_id: JobId },
    Failed { job_id: JobId },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

#[derive(Debug, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Submitted { job_id } => {
                println!("Training job {} has started, please visit the FfDL UI for more details", job_id.0.cyan());
            }
            ProgressEvent::Status { status, .. } => println!("Training Status: {}", status.as_str().bold()),
            ProgressEvent::LogLine { line, .. } => println!("{line}"),
            ProgressEvent::LogsStalled { job_id, idle_reads } => {
                println!("{}", format!("[{job_id}] no log output after {idle_reads} reads, re-checking status").dimmed());
            }
            ProgressEvent::Completed { job_id } => println!("{}", format!("Training job {job_id} completed").green()),
            ProgressEvent::Failed { .. } => println!("{}", "Training failed. Exiting...".red()),
        }
    }
}
