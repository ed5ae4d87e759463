//! Launcher configuration loading and merging.
//!
//! Configuration precedence:
//! 1. CLI arguments (handled by clap)
//! 2. Explicit `--config <path>` file
//! 3. Local config file (./ffdl-train.toml)
//! 4. Global config file (~/.ffdl/config.toml)
//! 5. Defaults

use anyhow::{Context, Result};
use ffdl_training::{
    LogFollowerConfig, PollerConfig, ServiceAuth, DEFAULT_API_VERSION, DEFAULT_LOG_CLI_URL, DEFAULT_RESULT_PATH,
    DEFAULT_S3_REGION, DEFAULT_SECRETS_DIR,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LauncherConfig {
    /// Directory holding the single-line secret files
    #[serde(default)]
    pub secrets_dir: Option<PathBuf>,

    /// Directory for model.zip, manifest.yml and the ffdl CLI
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// File receiving the JSON-encoded job id on success
    #[serde(default)]
    pub result_path: Option<PathBuf>,

    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub s3_region: Option<String>,

    #[serde(default)]
    pub poll_interval_secs: Option<u64>,

    #[serde(default)]
    pub log_idle_delay_secs: Option<u64>,

    #[serde(default)]
    pub log_idle_limit: Option<u32>,

    #[serde(default)]
    pub log_read_window_ms: Option<u64>,

    #[serde(default)]
    pub log_cli_url: Option<String>,

    #[serde(default)]
    pub log_level: Option<String>,

    #[serde(default)]
    pub service: ServiceConfig,
}

/// Static identity presented to FfDL and its CLI.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub authorization: Option<String>,
    #[serde(default)]
    pub user_info: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LauncherConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse configuration file: {}", path.display()))
    }

    pub fn default_global_path() -> PathBuf {
        std::env::var("HOME").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from(".")).join(".ffdl").join("config.toml")
    }

    pub fn default_local_path() -> PathBuf {
        PathBuf::from("ffdl-train.toml")
    }

    /// Merge the global and local files if present, then `explicit`, which
    /// must exist.
    pub fn discover_and_load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        for path in [Self::default_global_path(), Self::default_local_path()] {
            if path.exists() {
                config.merge(&Self::load_from_file(&path)?);
            }
        }

        if let Some(path) = explicit {
            config.merge(&Self::load_from_file(path)?);
        }

        Ok(config)
    }

    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &Self) {
        fn take<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
            if other.is_some() {
                slot.clone_from(other);
            }
        }

        take(&mut self.secrets_dir, &other.secrets_dir);
        take(&mut self.work_dir, &other.work_dir);
        take(&mut self.result_path, &other.result_path);
        take(&mut self.api_version, &other.api_version);
        take(&mut self.s3_region, &other.s3_region);
        take(&mut self.poll_interval_secs, &other.poll_interval_secs);
        take(&mut self.log_idle_delay_secs, &other.log_idle_delay_secs);
        take(&mut self.log_idle_limit, &other.log_idle_limit);
        take(&mut self.log_read_window_ms, &other.log_read_window_ms);
        take(&mut self.log_cli_url, &other.log_cli_url);
        take(&mut self.log_level, &other.log_level);
        take(&mut self.service.authorization, &other.service.authorization);
        take(&mut self.service.user_info, &other.service.user_info);
        take(&mut self.service.username, &other.service.username);
        take(&mut self.service.password, &other.service.password);
    }

    pub fn secrets_dir(&self) -> PathBuf {
        self.secrets_dir.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_DIR))
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn api_version(&self) -> &str {
        self.api_version.as_deref().unwrap_or(DEFAULT_API_VERSION)
    }

    pub fn s3_region(&self) -> &str {
        self.s3_region.as_deref().unwrap_or(DEFAULT_S3_REGION)
    }

    pub fn log_cli_url(&self) -> &str {
        self.log_cli_url.as_deref().unwrap_or(DEFAULT_LOG_CLI_URL)
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }

    pub fn service_auth(&self) -> ServiceAuth {
        let defaults = ServiceAuth::default();
        ServiceAuth {
            authorization: self.service.authorization.clone().unwrap_or(defaults.authorization),
            user_info: self.service.user_info.clone().unwrap_or(defaults.user_info),
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        let defaults = PollerConfig::default();
        PollerConfig {
            poll_interval: self.poll_interval_secs.map_or(defaults.poll_interval, Duration::from_secs),
            idle_delay: self.log_idle_delay_secs.map_or(defaults.idle_delay, Duration::from_secs),
            idle_limit: self.log_idle_limit.unwrap_or(defaults.idle_limit),
            result_path: self.result_path.clone().unwrap_or_else(|| PathBuf::from(DEFAULT_RESULT_PATH)),
        }
    }

    pub fn log_follower_config(&self, binary: PathBuf, rest_url: &str) -> LogFollowerConfig {
        LogFollowerConfig {
            binary,
            rest_url: rest_url.to_string(),
            username: self.service.username.clone().unwrap_or_else(|| "test-user".to_string()),
            password: self.service.password.clone().unwrap_or_else(|| "test".to_string()),
            read_window: Duration::from_millis(self.log_read_window_ms.unwrap_or(1000)),
        }
    }
}
