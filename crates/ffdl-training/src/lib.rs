//! FfDL Training
//!
//! Building blocks for launching a training job on FfDL:
//! - Loading single-line credentials (`Secrets`)
//! - Fetching the model definition and manifest override (`ArtifactFetcher`)
//! - Building the job manifest and injecting credentials (`build_manifest`)
//! - Submitting and polling jobs over REST (`FfdlClient`, `StatusPoller`)
//! - Following job logs through the FfDL CLI (`CliLogFollower`)

pub mod client;
pub mod error;
pub mod job;
pub mod layout;
pub mod logs;
pub mod manifest;
pub mod poller;
pub mod progress;
pub mod secrets;
pub mod storage;

pub use client::{FfdlClient, ServiceAuth, TrainingService, DEFAULT_API_VERSION};
pub use error::{StorageError, TrainingError, TrainingResult};
pub use job::{JobId, JobOptions, TrainingStatus};
pub use layout::{WorkLayout, DEFAULT_RESULT_PATH};
pub use logs::{download_log_cli, CliLogFollower, LogFollower, LogFollowerConfig, LogStream, DEFAULT_LOG_CLI_URL};
pub use manifest::{build_manifest, inject_credentials, Manifest};
pub use poller::{PollOutcome, PollerConfig, StatusPoller, StreamEnd, Transition};
pub use progress::{ProgressEvent, ProgressSink, StdoutProgressSink};
pub use secrets::{load_secret, Buckets, Credential, Secrets, StorageCredentials, DEFAULT_SECRETS_DIR};
pub use storage::{ArtifactFetcher, FetchedArtifacts, ObjectStore, S3ObjectStore, DEFAULT_S3_REGION};
