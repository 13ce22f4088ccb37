//! Cross-process advisory locks backed by exclusively created files.
//!
//! A lock is held while its lock file exists. Acquisition creates the file
//! with `create_new`, which the OS fails atomically if the file is already
//! present, so two processes sharing a data directory can never both succeed.
//! Dropping the [`FileLock`] closes the handle and unlinks the file.
//!
//! There is no expiry: a holder that crashes leaves its file behind and later
//! acquisitions of that key exhaust their retry budget. The file records the
//! holder's pid and acquisition time so an operator can decide whether to
//! remove it.

use crate::error::{StorageError, StorageResult};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, trace};

/// Retry policy for lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockPolicy {
    /// Maximum number of acquisition attempts when retrying.
    pub max_retries: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Whether to retry at all. When false a single attempt is made.
    pub retry: bool,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            max_retries: 50,
            retry_delay: Duration::from_millis(100),
            retry: true,
        }
    }
}

impl LockPolicy {
    /// Creates a policy with the given bound and delay.
    #[must_use]
    pub fn new(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            retry: true,
        }
    }

    /// Returns a copy of this policy that makes exactly one attempt.
    #[must_use]
    pub fn without_retry(mut self) -> Self {
        self.retry = false;
        self
    }

    fn attempts(&self) -> u32 {
        if self.retry {
            self.max_retries.max(1)
        } else {
            1
        }
    }
}

/// A held lock. The lock is released when this value is dropped.
#[derive(Debug)]
pub struct FileLock {
    key: String,
    path: PathBuf,
    file: Option<File>,
}

impl FileLock {
    /// Acquires the lock file at `path` for `key`.
    ///
    /// The parent directory is created if needed.
    ///
    /// # Errors
    ///
    /// - [`StorageError::LockTimeout`] if the file still exists after
    ///   `policy.max_retries` attempts (or after one attempt without retry)
    /// - [`StorageError::Io`] for any other failure creating the file
    pub fn acquire(path: &Path, key: &str, policy: &LockPolicy) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let attempts = policy.attempts();
        for attempt in 1..=attempts {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    // Holder info is diagnostic only; failing to write it is not fatal.
                    let _ = writeln!(file, "{} {}", std::process::id(), unix_millis());
                    debug!(key, attempt, "lock acquired");
                    return Ok(Self {
                        key: key.to_string(),
                        path: path.to_path_buf(),
                        file: Some(file),
                    });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    trace!(key, attempt, "lock busy");
                    if attempt < attempts {
                        thread::sleep(policy.retry_delay);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StorageError::LockTimeout {
            key: key.to_string(),
            attempts,
        })
    }

    /// Returns the lock key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock explicitly. Equivalent to dropping it.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        // Close before unlinking; unlink failures are ignored.
        drop(self.file.take());
        let _ = fs::remove_file(&self.path);
        debug!(key = %self.key, "lock released");
    }
}

fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
}
