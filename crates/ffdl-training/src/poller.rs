//! Job status polling.
//!
//! The poller is a small state machine driven by the status FfDL reports:
//!
//! | status        | transition   | after                   |
//! |---------------|--------------|-------------------------|
//! | `COMPLETED`   | `Complete`   | write marker, exit 0    |
//! | `FAILED`      | `Fail`       | exit 1                  |
//! | `PROCESSING`  | `StreamLogs` | sleep, poll again       |
//! | anything else | `Wait`       | sleep, poll again       |
//!
//! While streaming, the log follower is read one line at a time until the
//! child exits or `idle_limit` consecutive reads come back empty.

use crate::client::TrainingService;
use crate::error::TrainingResult;
use crate::job::{JobId, TrainingStatus};
use crate::logs::LogFollower;
use crate::progress::{ProgressEvent, ProgressSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Complete,
    Fail,
    StreamLogs,
    Wait,
}

impl Transition {
    #[must_use]
    pub fn for_status(status: &TrainingStatus) -> Self {
        match status {
            TrainingStatus::Completed => Self::Complete,
            TrainingStatus::Failed => Self::Fail,
            TrainingStatus::Processing => Self::StreamLogs,
            TrainingStatus::Pending | TrainingStatus::Other(_) => Self::Wait,
        }
    }
}

/// How a polled job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Completed { job_id: JobId },
    Failed { job_id: JobId },
}

impl PollOutcome {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Completed { .. } => 0,
            Self::Failed { .. } => 1,
        }
    }
}

/// Why a log streaming pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Exited,
    Stalled,
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub poll_interval: Duration,
    pub idle_delay: Duration,
    pub idle_limit: u32,
    /// Where the job id is written as JSON once the job completes.
    pub result_path: PathBuf,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            idle_delay: Duration::from_secs(5),
            idle_limit: 5,
            result_path: PathBuf::from(crate::layout::DEFAULT_RESULT_PATH),
        }
    }
}

pub struct StatusPoller {
    service: Arc<dyn TrainingService>,
    logs: Arc<dyn LogFollower>,
    config: PollerConfig,
}

impl StatusPoller {
    #[must_use]
    pub fn new(service: Arc<dyn TrainingService>, logs: Arc<dyn LogFollower>, config: PollerConfig) -> Self {
        Self { service, logs, config }
    }

    /// Poll until the job reaches a terminal status. Transport and parse
    /// errors are returned as-is.
    pub async fn run(&self, job_id: &JobId, progress: &dyn ProgressSink) -> TrainingResult<PollOutcome> {
        loop {
            let status = self.service.status(job_id).await?;
            let transition = Transition::for_status(&status);
            debug!(job_id = %job_id, %status, ?transition, "Polled training status");
            progress.on_event(ProgressEvent::Status { job_id: job_id.clone(), status });

            match transition {
                Transition::Complete => {
                    self.write_result(job_id)?;
                    info!(job_id = %job_id, path = %self.config.result_path.display(), "Training completed");
                    progress.on_event(ProgressEvent::Completed { job_id: job_id.clone() });
                    return Ok(PollOutcome::Completed { job_id: job_id.clone() });
                }
                Transition::Fail => {
                    warn!(job_id = %job_id, "Training failed");
                    progress.on_event(ProgressEvent::Failed { job_id: job_id.clone() });
                    return Ok(PollOutcome::Failed { job_id: job_id.clone() });
                }
                Transition::StreamLogs => {
                    self.stream_logs(job_id, progress).await?;
                }
                Transition::Wait => {}
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Relay log lines until the follower exits or stays silent for more
    /// than `idle_limit` consecutive reads.
    pub async fn stream_logs(&self, job_id: &JobId, progress: &dyn ProgressSink) -> TrainingResult<StreamEnd> {
        let mut stream = self.logs.follow(job_id).await?;
        let mut idle_reads = 0u32;

        loop {
            if let Some(line) = stream.next_line().await? {
                idle_reads = 0;
                progress.on_event(ProgressEvent::LogLine { job_id: job_id.clone(), line: line.trim().to_string() });
                continue;
            }
            if stream.has_exited()? {
                return Ok(StreamEnd::Exited);
            }

            idle_reads += 1;
            tokio::time::sleep(self.config.idle_delay).await;
            if idle_reads > self.config.idle_limit {
                progress.on_event(ProgressEvent::LogsStalled { job_id: job_id.clone(), idle_reads });
                return Ok(StreamEnd::Stalled);
            }
        }
    }

    fn write_result(&self, job_id: &JobId) -> TrainingResult<()> {
        if let Some(parent) = self.config.result_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config.result_path, serde_json::to_string(job_id)?)?;
        Ok(())
    }
}
