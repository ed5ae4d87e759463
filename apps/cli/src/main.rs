//! FfDL training launcher - submits a training job to FfDL and follows it
//!
//! Provides the `ffdl-train` command used as a pipeline step: it pulls the
//! model definition from object storage, submits it with a manifest, streams
//! the job's logs and exits 0 when the job completes or 1 when it fails.

mod commands;
mod config;

use clap::Parser;
use colored::Colorize;
use commands::{train, TrainArgs};
use config::LauncherConfig;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Launch an FfDL training job and wait for it to finish
#[derive(Parser, Debug)]
#[command(
    name = "ffdl-train",
    author,
    version,
    about = "Submit a training job to FfDL and follow it to completion",
    long_about = "Downloads the model definition (and optional manifest) from object storage,\nsubmits the job to the FfDL REST API, streams its logs while it runs and\nwrites the job id to the result file once it completes."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long)]
    log_level: Option<String>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the secret files (default: /app/secrets)
    #[arg(long)]
    secrets_dir: Option<PathBuf>,

    /// Directory for downloaded artifacts and the FfDL CLI (default: current directory)
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Use an existing FfDL CLI in the work directory instead of downloading it
    #[arg(long)]
    skip_cli_download: bool,

    #[command(flatten)]
    train: TrainArgs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut launcher_config = LauncherConfig::discover_and_load(args.config.as_deref())?;
    launcher_config.merge(&LauncherConfig {
        secrets_dir: args.secrets_dir,
        work_dir: args.work_dir,
        log_level: args.log_level,
        ..Default::default()
    });

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(launcher_config.log_level()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match train::execute(args.train, &launcher_config, args.skip_cli_download).await {
        Ok(outcome) => std::process::exit(outcome.exit_code()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}
