//! Log streaming through the FfDL command-line tool.
//!
//! The CLI reads its endpoint and identity from `DLAAS_*` variables. They are
//! set on the child process only; the launcher's own environment is never
//! modified.

use crate::error::{TrainingError, TrainingResult};
use crate::job::JobId;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, info};

pub const DEFAULT_LOG_CLI_URL: &str = "https://github.com/IBM/FfDL/raw/master/cli/bin/ffdl-linux";

/// A running log stream for one job.
#[async_trait]
pub trait LogStream: Send {
    /// Next line of output, or `None` if nothing arrived in time or the
    /// stream has reached end of file.
    async fn next_line(&mut self) -> TrainingResult<Option<String>>;

    /// Whether the producer has exited.
    fn has_exited(&mut self) -> TrainingResult<bool>;
}

#[async_trait]
pub trait LogFollower: Send + Sync {
    async fn follow(&self, job_id: &JobId) -> TrainingResult<Box<dyn LogStream>>;
}

/// Everything the FfDL CLI needs to follow a job's logs.
#[derive(Debug, Clone)]
pub struct LogFollowerConfig {
    pub binary: PathBuf,
    pub rest_url: String,
    pub username: String,
    pub password: String,
    /// How long a single read waits for a line before reporting none.
    pub read_window: Duration,
}

/// Runs `<binary> logs <id> --follow`.
#[derive(Debug, Clone)]
pub struct CliLogFollower {
    config: LogFollowerConfig,
}

impl CliLogFollower {
    #[must_use]
    pub fn new(config: LogFollowerConfig) -> Self {
        Self { config }
    }

    fn command(&self, job_id: &JobId) -> Command {
        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("logs")
            .arg(&job_id.0)
            .arg("--follow")
            .env("DLAAS_URL", &self.config.rest_url)
            .env("DLAAS_USERNAME", &self.config.username)
            .env("DLAAS_PASSWORD", &self.config.password)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        cmd
    }
}

#[async_trait]
impl LogFollower for CliLogFollower {
    async fn follow(&self, job_id: &JobId) -> TrainingResult<Box<dyn LogStream>> {
        let mut child = self.command(job_id).spawn().map_err(|e| {
            TrainingError::LogStream(format!("failed to spawn {}: {e}", self.config.binary.display()))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TrainingError::LogStream("failed to get stdout handle".to_string()))?;

        debug!(job_id = %job_id, binary = %self.config.binary.display(), "Following job logs");
        Ok(Box::new(ProcessLogStream {
            child,
            lines: BufReader::new(stdout).lines(),
            read_window: self.config.read_window,
            eof: false,
        }))
    }
}

/// Line reader over a child's stdout. The child is left running when the
/// stream is dropped.
pub struct ProcessLogStream {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    read_window: Duration,
    eof: bool,
}

#[async_trait]
impl LogStream for ProcessLogStream {
    async fn next_line(&mut self) -> TrainingResult<Option<String>> {
        if self.eof {
            return Ok(None);
        }
        match tokio::time::timeout(self.read_window, self.lines.next_line()).await {
            Ok(Ok(Some(line))) => Ok(Some(line)),
            Ok(Ok(None)) => {
                self.eof = true;
                Ok(None)
            }
            Ok(Err(e)) => Err(TrainingError::LogStream(format!("failed to read log output: {e}"))),
            Err(_elapsed) => Ok(None),
        }
    }

    fn has_exited(&mut self) -> TrainingResult<bool> {
        Ok(self.child.try_wait()?.is_some())
    }
}

/// Fetch the FfDL CLI from `url` into `dest` and mark it executable.
pub async fn download_log_cli(url: &str, dest: &Path) -> TrainingResult<()> {
    let bytes = reqwest::get(url).await?.error_for_status()?.bytes().await?;
    tokio::fs::write(dest, &bytes).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(dest, std::fs::Permissions::from_mode(0o755)).await?;
    }

    info!(url, dest = %dest.display(), size = bytes.len(), "Downloaded FfDL CLI");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn script(temp: &TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = temp.path().join("ffdl");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn config(binary: PathBuf) -> LogFollowerConfig {
        LogFollowerConfig {
            binary,
            rest_url: "http://ffdl:8080".to_string(),
            username: "test-user".to_string(),
            password: "test".to_string(),
            read_window: Duration::from_secs(5),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_follow_passes_arguments_and_credentials() {
        let temp = TempDir::new().unwrap();
        let binary = script(&temp, r#"echo "$1 $2 $3"; echo "$DLAAS_URL $DLAAS_USERNAME $DLAAS_PASSWORD""#);
        let follower = CliLogFollower::new(config(binary));

        let mut stream = follower.follow(&JobId("training-7".to_string())).await.unwrap();
        assert_eq!(stream.next_line().await.unwrap().as_deref(), Some("logs training-7 --follow"));
        assert_eq!(stream.next_line().await.unwrap().as_deref(), Some("http://ffdl:8080 test-user test"));
        assert_eq!(stream.next_line().await.unwrap(), None);
        assert!(std::env::var("DLAAS_URL").is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stream_reports_exit() {
        let temp = TempDir::new().unwrap();
        let follower = CliLogFollower::new(config(script(&temp, "exit 0")));

        let mut stream = follower.follow(&JobId("j".to_string())).await.unwrap();
        assert_eq!(stream.next_line().await.unwrap(), None);
        let mut exited = false;
        for _ in 0..50 {
            if stream.has_exited().unwrap() {
                exited = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(exited);
    }

    #[tokio::test]
    async fn test_follow_missing_binary_is_error() {
        let temp = TempDir::new().unwrap();
        let follower = CliLogFollower::new(config(temp.path().join("missing")));
        let err = follower.follow(&JobId("j".to_string())).await.err().unwrap();
        assert!(matches!(err, TrainingError::LogStream(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_download_log_cli_marks_executable() {
        use std::os::unix::fs::PermissionsExt;

        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/cli/bin/ffdl-linux")
            .with_status(200)
            .with_body("#!/bin/sh\n")
            .create_async()
            .await;

        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("ffdl");
        let url = format!("{}/cli/bin/ffdl-linux", server.url());
        download_log_cli(&url, &dest).await.unwrap();

        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[tokio::test]
    async fn test_download_log_cli_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/missing").with_status(404).create_async().await;

        let temp = TempDir::new().unwrap();
        let url = format!("{}/missing", server.url());
        let err = download_log_cli(&url, &temp.path().join("ffdl")).await.unwrap_err();
        assert!(matches!(err, TrainingError::Http(_)));
    }
}
