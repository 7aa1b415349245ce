//! Configuration for the sync engine.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a client sync session.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Server base URL.
    pub server_url: String,
    /// Version sent in the `modsync-version` header.
    pub client_version: String,
    /// Local game root.
    pub game_root: PathBuf,
    /// Directory under the game root holding persisted state.
    pub data_dir: PathBuf,
    /// Maximum number of concurrent downloads.
    pub concurrency: usize,
    /// Maximum number of files hashed at once while scanning.
    pub scan_concurrency: usize,
    /// Retry configuration for downloads.
    pub retry: RetryConfig,
    /// Delete local files that vanished remotely.
    pub delete_removed_files: bool,
}

impl SyncConfig {
    /// Creates a new sync configuration.
    pub fn new(server_url: impl Into<String>, game_root: impl Into<PathBuf>) -> Self {
        Self {
            server_url: server_url.into(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            game_root: game_root.into(),
            data_dir: PathBuf::from("ModSync_Data"),
            concurrency: 8,
            scan_concurrency: 8,
            retry: RetryConfig::default(),
            delete_removed_files: false,
        }
    }

    /// Sets the client version header value.
    pub fn with_client_version(mut self, version: impl Into<String>) -> Self {
        self.client_version = version.into();
        self
    }

    /// Sets the state directory, relative to the game root.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Sets the download concurrency.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Sets the scan concurrency.
    pub fn with_scan_concurrency(mut self, concurrency: usize) -> Self {
        self.scan_concurrency = concurrency.max(1);
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Enables deletion of removed files.
    pub fn with_delete_removed_files(mut self, delete: bool) -> Self {
        self.delete_removed_files = delete;
        self
    }

    /// Absolute path of the state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.game_root.join(&self.data_dir)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("http://127.0.0.1:6969", ".")
    }
}

/// Configuration for download retries.
///
/// The first attempt uses `initial_timeout`; later attempts use the longer
/// `retry_timeout` since a fast attempt already failed.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
    /// Timeout of the first attempt.
    pub initial_timeout: Duration,
    /// Timeout of every later attempt.
    pub retry_timeout: Duration,
}

impl RetryConfig {
    /// Creates a configuration with the given attempt count.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::from_millis(500),
            initial_timeout: Duration::from_secs(100),
            retry_timeout: Duration::from_secs(600),
        }
    }

    /// Creates a configuration with a single attempt.
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Sets the delay between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets both timeouts.
    pub fn with_timeouts(mut self, initial: Duration, retry: Duration) -> Self {
        self.initial_timeout = initial;
        self.retry_timeout = retry;
        self
    }

    /// Timeout for an attempt (0-indexed).
    pub fn timeout_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            self.initial_timeout
        } else {
            self.retry_timeout
        }
    }

    /// Delay before an attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            Duration::ZERO
        } else {
            self.delay
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(5)
    }
}
