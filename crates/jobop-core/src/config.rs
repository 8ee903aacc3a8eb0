use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::DEFAULT_RETRIES;

/// Retry policy parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Base unit of backoff in milliseconds.
    pub base_backoff_ms: u64,
    /// Give up on a failing resource after this many seconds in the failed state.
    pub max_error_wait_secs: u64,
    /// Upper bound on any single backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Retry bound handed to transient failures by the diagnostic CLI.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
}

fn default_max_retries() -> u32 {
    DEFAULT_RETRIES
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_backoff_ms: 100,
            max_error_wait_secs: 300,
            max_backoff_ms: 30_000,
            default_max_retries: DEFAULT_RETRIES,
        }
    }
}

impl RetryConfig {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_error_wait(&self) -> Duration {
        Duration::from_secs(self.max_error_wait_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

/// Global configuration loaded from `~/.config/jobop/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobopConfig {
    /// Optional retry policy; if missing, built-in defaults are used.
    #[serde(default)]
    pub retry: Option<RetryConfig>,
}

impl JobopConfig {
    /// Retry settings, falling back to defaults when the section is absent.
    pub fn retry_config(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("jobop")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load `~/.config/jobop/config.toml`, creating it with defaults on first run.
pub fn load_or_init() -> Result<JobopConfig> {
    load_or_create(&config_path()?)
}

/// Load configuration from `path`. A missing file is first written out with
/// the default `[retry]` section so it can be edited later.
pub fn load_or_create(path: &Path) -> Result<JobopConfig> {
    if !path.exists() {
        write_default(path)?;
        tracing::info!("created default config at {}", path.display());
    }
    load_from_path(path)
}

fn write_default(path: &Path) -> Result<()> {
    let defaults = JobopConfig {
        retry: Some(RetryConfig::default()),
    };
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    fs::write(path, toml::to_string_pretty(&defaults)?)
        .with_context(|| format!("writing default config {}", path.display()))
}

/// Load configuration from an explicit file.
pub fn load_from_path(path: &Path) -> Result<JobopConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: JobopConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    tracing::debug!("loaded config from {}: {:?}", path.display(), cfg);
    Ok(cfg)
}
