#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration for the repofetch reader
//!
//! Settings come from:
//! - Default values (hard-coded)
//! - A section of the embedding application's own configuration, through serde
//! - Environment variables

use repofetch_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Worker count override
pub const ENV_THREADS: &str = "REPOFETCH_THREADS";
/// Connect timeout override, in seconds
pub const ENV_CONNECT_TIMEOUT: &str = "REPOFETCH_CONNECT_TIMEOUT";
/// Batch timeout override, in seconds; `0` or `none` disables it
pub const ENV_BATCH_TIMEOUT: &str = "REPOFETCH_BATCH_TIMEOUT";

/// Reader configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Number of concurrent fetch workers; 1 fetches sequentially
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64, // seconds
    /// Give up waiting on a batch after this many seconds
    #[serde(default)]
    pub batch_timeout: Option<u64>,
    /// Keep verified checksum files next to the downloaded resource
    #[serde(default = "default_cache_checksums")]
    pub cache_checksums: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            batch_timeout: None,
            cache_checksums: default_cache_checksums(),
            user_agent: default_user_agent(),
        }
    }
}

// Default value functions for serde
fn default_threads() -> usize {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    300 // 5 minutes
}

fn default_cache_checksums() -> bool {
    true
}

fn default_user_agent() -> String {
    format!("repofetch/{}", env!("CARGO_PKG_VERSION"))
}

impl ReaderConfig {
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    #[must_use]
    pub fn with_batch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.batch_timeout = timeout.map(|t| t.as_secs().max(1));
        self
    }

    #[must_use]
    pub fn with_cache_checksums(mut self, cache: bool) -> Self {
        self.cache_checksums = cache;
        self
    }

    #[must_use]
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    #[must_use]
    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    #[must_use]
    pub fn batch_timeout_duration(&self) -> Option<Duration> {
        self.batch_timeout.map(Duration::from_secs)
    }

    /// Effective worker count, never zero
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.threads.max(1)
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // REPOFETCH_THREADS
        if let Ok(threads) = std::env::var(ENV_THREADS) {
            self.threads = threads.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: ENV_THREADS.to_string(),
                value: threads.clone(),
            })?;
            debug!(threads = self.threads, "worker count from environment");
        }

        // REPOFETCH_CONNECT_TIMEOUT
        if let Ok(timeout) = std::env::var(ENV_CONNECT_TIMEOUT) {
            self.connect_timeout = timeout.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: ENV_CONNECT_TIMEOUT.to_string(),
                value: timeout.clone(),
            })?;
        }

        // REPOFETCH_BATCH_TIMEOUT
        if let Ok(timeout) = std::env::var(ENV_BATCH_TIMEOUT) {
            self.batch_timeout = match timeout.trim() {
                "" | "none" | "0" => None,
                secs => Some(secs.parse().map_err(|_| ConfigError::InvalidValue {
                    field: ENV_BATCH_TIMEOUT.to_string(),
                    value: timeout.clone(),
                })?),
            };
        }

        Ok(())
    }

    /// Check that the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns an error if a timeout is zero or the user agent is empty.
    pub fn validate(&self) -> Result<(), Error> {
        if self.connect_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "connect_timeout".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "user_agent".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.threads, 5);
        assert_eq!(config.connect_timeout_duration(), Duration::from_secs(10));
        assert_eq!(config.batch_timeout_duration(), None);
        assert!(config.cache_checksums);
        assert!(config.user_agent.starts_with("repofetch/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threads_runs_one_worker() {
        let config = ReaderConfig::default().with_threads(0);
        assert_eq!(config.worker_count(), 1);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ReaderConfig {
            connect_timeout: 0,
            ..ReaderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_sub_second_batch_timeout_rounds_up() {
        let config = ReaderConfig::default().with_batch_timeout(Some(Duration::from_millis(10)));
        assert_eq!(config.batch_timeout, Some(1));
    }
}
