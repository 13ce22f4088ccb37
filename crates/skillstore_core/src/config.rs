//! Store configuration.

use crate::error::{CoreError, CoreResult};
use skillstore_storage::LockPolicy;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the data directory.
pub const ENV_DATA_DIR: &str = "SKILLSTORE_DATA_DIR";
/// Environment variable overriding the lock retry bound.
pub const ENV_LOCK_RETRIES: &str = "SKILLSTORE_LOCK_RETRIES";
/// Environment variable overriding the lock retry delay, in milliseconds.
pub const ENV_LOCK_RETRY_MS: &str = "SKILLSTORE_LOCK_RETRY_MS";
/// Environment variable toggling the daily backup on `init()`.
pub const ENV_DAILY_BACKUP: &str = "SKILLSTORE_DAILY_BACKUP";

/// Configuration for opening a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base directory holding `schema.json`, dataset directories and backups.
    pub data_dir: PathBuf,

    /// Maximum lock acquisition attempts before failing.
    pub max_lock_retries: u32,

    /// Fixed delay between lock acquisition attempts.
    pub lock_retry_delay: Duration,

    /// Whether `init()` takes a daily backup when none exists for today.
    pub auto_daily_backup: bool,

    /// Whether dataset and metadata files are pretty-printed.
    pub pretty_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            max_lock_retries: 50,
            lock_retry_delay: Duration::from_millis(100),
            auto_daily_backup: true,
            pretty_json: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base data directory.
    #[must_use]
    pub fn data_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Sets the maximum number of lock acquisition attempts.
    #[must_use]
    pub const fn max_lock_retries(mut self, value: u32) -> Self {
        self.max_lock_retries = value;
        self
    }

    /// Sets the delay between lock acquisition attempts.
    #[must_use]
    pub const fn lock_retry_delay(mut self, value: Duration) -> Self {
        self.lock_retry_delay = value;
        self
    }

    /// Sets whether `init()` ensures a daily backup.
    #[must_use]
    pub const fn auto_daily_backup(mut self, value: bool) -> Self {
        self.auto_daily_backup = value;
        self
    }

    /// Sets whether JSON files are pretty-printed.
    #[must_use]
    pub const fn pretty_json(mut self, value: bool) -> Self {
        self.pretty_json = value;
        self
    }

    /// Returns the lock retry policy derived from this configuration.
    #[must_use]
    pub fn lock_policy(&self) -> LockPolicy {
        LockPolicy::new(self.max_lock_retries, self.lock_retry_delay)
    }

    /// Builds a configuration from `SKILLSTORE_*` environment variables,
    /// falling back to defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if a variable is set to an unparsable value.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` if a value cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(value) = lookup(ENV_LOCK_RETRIES) {
            config.max_lock_retries = parse_var(ENV_LOCK_RETRIES, &value)?;
        }
        if let Some(value) = lookup(ENV_LOCK_RETRY_MS) {
            config.lock_retry_delay = Duration::from_millis(parse_var(ENV_LOCK_RETRY_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_DAILY_BACKUP) {
            config.auto_daily_backup = match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(CoreError::invalid_format(format!(
                        "{ENV_DAILY_BACKUP}: expected a boolean, got '{other}'"
                    )))
                }
            };
        }

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> CoreResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::invalid_format(format!("{key}: cannot parse '{value}'")))
}
