//! Runtime configuration for the capture binary.
//!
//! The capture loop itself takes explicit `CaptureSettings`; only the binary
//! reads the environment. `Config::from_env` falls back to development
//! defaults for anything unset and rejects values that do not parse.

use std::env;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::capture::CaptureSettings;
use crate::extractor::Platform;
use crate::pipeline::PoolConfig;

/// Environment variable names.
pub const ENV_SNAPSHOT_DIR: &str = "FEED_SNAPSHOT_DIR";
pub const ENV_PLATFORM: &str = "FEED_PLATFORM";
pub const ENV_BASE_URL: &str = "FEED_BASE_URL";
pub const ENV_BUDGET: &str = "CAPTURE_BUDGET";
pub const ENV_STALL_LIMIT: &str = "CAPTURE_STALL_LIMIT";
pub const ENV_SETTLE_MS: &str = "CAPTURE_SETTLE_MS";
pub const ENV_ADVANCE_FRACTION: &str = "CAPTURE_ADVANCE_FRACTION";
pub const ENV_JUMP_FRACTION: &str = "CAPTURE_JUMP_FRACTION";
pub const ENV_LIVENESS_MS: &str = "CAPTURE_LIVENESS_MS";
pub const ENV_MAX_FORCED_JUMPS: &str = "CAPTURE_MAX_FORCED_JUMPS";
pub const ENV_OUTPUT_PATH: &str = "OUTPUT_PATH";
pub const ENV_MEDIA_DIR: &str = "MEDIA_DIR";
pub const ENV_WORKER_CONCURRENCY: &str = "WORKER_CONCURRENCY";
pub const ENV_API_KEYS: &str = "API_KEYS";
pub const ENV_API_CALLS_PER_MINUTE: &str = "API_CALLS_PER_MINUTE";

const ALL_VARS: [&str; 15] = [
    ENV_SNAPSHOT_DIR,
    ENV_PLATFORM,
    ENV_BASE_URL,
    ENV_BUDGET,
    ENV_STALL_LIMIT,
    ENV_SETTLE_MS,
    ENV_ADVANCE_FRACTION,
    ENV_JUMP_FRACTION,
    ENV_LIVENESS_MS,
    ENV_MAX_FORCED_JUMPS,
    ENV_OUTPUT_PATH,
    ENV_MEDIA_DIR,
    ENV_WORKER_CONCURRENCY,
    ENV_API_KEYS,
    ENV_API_CALLS_PER_MINUTE,
];

/// Default development values used when environment variables are absent.
const DEFAULT_SNAPSHOT_DIR: &str = "snapshots";
const DEFAULT_PLATFORM: Platform = Platform::X;
const DEFAULT_BUDGET: usize = 50;
const DEFAULT_STALL_LIMIT: u32 = 8;
const DEFAULT_SETTLE_MS: u64 = 1500;
const DEFAULT_ADVANCE_FRACTION: f64 = 0.8;
const DEFAULT_JUMP_FRACTION: f64 = 3.0;
const DEFAULT_LIVENESS_MS: u64 = 10_000;
const DEFAULT_MAX_FORCED_JUMPS: u32 = 3;
const DEFAULT_OUTPUT_PATH: &str = "captured.json";
const DEFAULT_WORKER_CONCURRENCY: usize = 4;
const DEFAULT_API_CALLS_PER_MINUTE: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    snapshot_dir: PathBuf,
    platform: Platform,
    base_url: Option<Url>,
    budget: usize,
    stall_limit: u32,
    settle_ms: u64,
    advance_fraction: f64,
    jump_fraction: f64,
    liveness_ms: u64,
    max_forced_jumps: u32,
    output_path: PathBuf,
    media_dir: Option<PathBuf>,
    worker_concurrency: usize,
    api_keys: Vec<String>,
    api_calls_per_minute: u32,
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` over an arbitrary source of values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = get(ENV_BASE_URL)
            .map(|raw| {
                Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                    field: ENV_BASE_URL,
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let advance_fraction = parse_or(get(ENV_ADVANCE_FRACTION), ENV_ADVANCE_FRACTION, DEFAULT_ADVANCE_FRACTION)?;
        if !(advance_fraction > 0.0 && advance_fraction <= 1.0) {
            return Err(ConfigError::InvalidValue {
                field: ENV_ADVANCE_FRACTION,
                reason: format!("{advance_fraction} is outside (0, 1]"),
            });
        }

        let jump_fraction =
            parse_or(get(ENV_JUMP_FRACTION), ENV_JUMP_FRACTION, DEFAULT_JUMP_FRACTION)?;
        if !(jump_fraction.is_finite() && jump_fraction > advance_fraction) {
            return Err(ConfigError::InvalidValue {
                field: ENV_JUMP_FRACTION,
                reason: format!(
                    "{jump_fraction} must be larger than the advance fraction {advance_fraction}"
                ),
            });
        }

        let stall_limit = non_zero(
            parse_or(get(ENV_STALL_LIMIT), ENV_STALL_LIMIT, DEFAULT_STALL_LIMIT)?,
            ENV_STALL_LIMIT,
        )?;
        let api_calls_per_minute = non_zero(
            parse_or(
                get(ENV_API_CALLS_PER_MINUTE),
                ENV_API_CALLS_PER_MINUTE,
                DEFAULT_API_CALLS_PER_MINUTE,
            )?,
            ENV_API_CALLS_PER_MINUTE,
        )?;

        let api_keys = get(ENV_API_KEYS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            snapshot_dir: get(ENV_SNAPSHOT_DIR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_DIR)),
            platform: parse_or(get(ENV_PLATFORM), ENV_PLATFORM, DEFAULT_PLATFORM)?,
            base_url,
            budget: parse_or(get(ENV_BUDGET), ENV_BUDGET, DEFAULT_BUDGET)?,
            stall_limit,
            settle_ms: parse_or(get(ENV_SETTLE_MS), ENV_SETTLE_MS, DEFAULT_SETTLE_MS)?,
            advance_fraction,
            jump_fraction,
            liveness_ms: parse_or(get(ENV_LIVENESS_MS), ENV_LIVENESS_MS, DEFAULT_LIVENESS_MS)?,
            max_forced_jumps: parse_or(
                get(ENV_MAX_FORCED_JUMPS),
                ENV_MAX_FORCED_JUMPS,
                DEFAULT_MAX_FORCED_JUMPS,
            )?,
            output_path: get(ENV_OUTPUT_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_PATH)),
            media_dir: get(ENV_MEDIA_DIR).map(PathBuf::from),
            worker_concurrency: parse_or(
                get(ENV_WORKER_CONCURRENCY),
                ENV_WORKER_CONCURRENCY,
                DEFAULT_WORKER_CONCURRENCY,
            )?,
            api_keys,
            api_calls_per_minute,
        })
    }

    /// Directory of saved feed renderings to replay.
    pub fn snapshot_dir(&self) -> &Path {
        &self.snapshot_dir
    }
    pub fn platform(&self) -> Platform {
        self.platform
    }
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }
    /// JSON array file the run appends to.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
    /// Media is only downloaded when this is set.
    pub fn media_dir(&self) -> Option<&Path> {
        self.media_dir.as_deref()
    }
    pub fn api_keys(&self) -> &[String] {
        &self.api_keys
    }
    pub fn api_calls_per_minute(&self) -> u32 {
        self.api_calls_per_minute
    }

    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            budget: self.budget,
            stall_limit: self.stall_limit,
            settle: Duration::from_millis(self.settle_ms),
            advance_fraction: self.advance_fraction,
            jump_fraction: self.jump_fraction,
            liveness_window: Duration::from_millis(self.liveness_ms),
            max_forced_jumps: self.max_forced_jumps,
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            concurrency: self.worker_concurrency.max(1),
            ..Default::default()
        }
    }

    /// Names of every variable `from_env` reads.
    pub fn env_vars() -> &'static [&'static str] {
        &ALL_VARS
    }
}

fn parse_or<T>(raw: Option<String>, field: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        }),
    }
}

/// A zero here would stall the run on its first pass or never grant a call.
fn non_zero(value: u32, field: &'static str) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field,
            reason: "must be at least 1".to_string(),
        });
    }
    Ok(value)
}

/// Errors that can occur while building a configuration.
#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { field: &'static str, reason: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl Error for ConfigError {}
