//! Training launch command implementation.

use crate::commands::types::TrainArgs;
use crate::config::LauncherConfig;
use anyhow::{Context, Result};
use colored::Colorize;
use ffdl_training::{
    build_manifest, download_log_cli, ArtifactFetcher, CliLogFollower, FfdlClient, PollOutcome, ProgressEvent,
    ProgressSink, S3ObjectStore, Secrets, StatusPoller, StdoutProgressSink, TrainingError, TrainingService, WorkLayout,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Fetch artifacts, submit the job and poll it to a terminal status.
pub async fn execute(args: TrainArgs, config: &LauncherConfig, skip_cli_download: bool) -> Result<PollOutcome> {
    let secrets_dir = config.secrets_dir();
    let secrets = Secrets::load_from_dir(&secrets_dir)
        .with_context(|| format!("Failed to load secrets from {}", secrets_dir.display()))?;

    let layout = WorkLayout::new(config.work_dir());
    layout
        .ensure_dirs()
        .with_context(|| format!("Failed to create work directory {}", layout.root().display()))?;

    if skip_cli_download {
        info!(path = %layout.log_cli_path().display(), "Skipping FfDL CLI download");
    } else {
        download_log_cli(config.log_cli_url(), &layout.log_cli_path())
            .await
            .context("Failed to download the FfDL CLI")?;
    }

    let store = Arc::new(S3ObjectStore::new(&secrets.storage, config.s3_region()));
    let fetcher = ArtifactFetcher::new(store, secrets.buckets.training_data.clone(), layout.clone());
    let fetched = fetcher
        .fetch(&args.model_def_file_path, args.manifest_key())
        .await
        .context("Failed to download training artifacts")?;

    if args.manifest_key().is_some() && fetched.manifest.is_none() {
        warn!(key = %args.manifest_file_path, "Manifest override not found; using the default manifest");
    }

    let manifest = build_manifest(&args.job_options(), fetched.manifest.as_deref(), &secrets.storage, &secrets.buckets)
        .context("Failed to build the training manifest")?;
    let manifest_path = layout.manifest_path();
    manifest
        .write(&manifest_path)
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

    let client = Arc::new(FfdlClient::with_api_version(
        secrets.ffdl_rest.expose(),
        config.service_auth(),
        config.api_version(),
    ));
    let model_archive = fetched
        .model_archive
        .ok_or_else(|| TrainingError::MissingArtifact(layout.model_archive_path()))
        .context("Failed to submit the training job")?;
    let job_id = client
        .submit(&manifest_path, &model_archive)
        .await
        .context("Failed to submit the training job")?;

    let progress = StdoutProgressSink;
    progress.on_event(ProgressEvent::Submitted { job_id: job_id.clone() });

    let follower = Arc::new(CliLogFollower::new(
        config.log_follower_config(layout.log_cli_path(), client.base_url()),
    ));
    let poller = StatusPoller::new(client, follower, config.poller_config());
    let outcome = poller
        .run(&job_id, &progress)
        .await
        .with_context(|| format!("Failed while polling training job {job_id}"))?;

    if let PollOutcome::Completed { job_id } = &outcome {
        println!("  Job id written to: {}", config.poller_config().result_path.display().to_string().dimmed());
        info!(job_id = %job_id, "Launch finished");
    }

    Ok(outcome)
}
