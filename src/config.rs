//! Configuration for the bulk engine.
//!
//! A [`BulkConfig`] carries the chunk size, the policy for merging per-chunk
//! failure lists and the retry budget for transport failures. It can be built
//! in code, deserialized from JSON, or derived from a flat key/value registry
//! where `bildungslogin/assignment/chunksize` overrides the chunk size.
//!
//! # Example Usage
//!
//! ```rust
//! use school_license_bulk::config::{BulkConfig, FailureMerge};
//!
//! let config = BulkConfig::builder()
//!     .with_chunk_size(100)
//!     .with_failure_merge(FailureMerge::Accumulate)
//!     .with_max_retries(0)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.chunk_size, 100);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Registry key holding the chunk size.
pub const CHUNK_SIZE_KEY: &str = "bildungslogin/assignment/chunksize";

/// Chunk size used when nothing else is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 60;

/// Errors that can occur while building or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ValidationError { message: String },
    /// A registry value could not be interpreted
    #[error("Invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },
    #[error("Serialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },
}

/// How per-chunk failure and warning lists are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureMerge {
    /// A chunk that reports a list replaces whatever earlier chunks reported.
    #[default]
    LastChunkWins,
    /// Lists from all chunks are concatenated in chunk order.
    Accumulate,
}

/// Retry budget for a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Retries after the first attempt; `0` disables retrying.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry (milliseconds)
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay (milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Double the delay after each failed retry
    #[serde(default = "default_true")]
    pub exponential_backoff: bool,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            exponential_backoff: true,
        }
    }
}

impl RetryConfig {
    /// No retries at all: the first transport failure is final.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = if self.exponential_backoff {
            2u64.saturating_pow(retry.saturating_sub(1))
        } else {
            1
        };
        let delay = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        Duration::from_millis(delay)
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub failure_merge: FailureMerge,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            failure_merge: FailureMerge::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl BulkConfig {
    pub fn builder() -> BulkConfigBuilder {
        BulkConfigBuilder::new()
    }

    /// Validate the configuration for consistency and correctness.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.chunk_size == 0 {
            return Err(ConfigurationError::ValidationError {
                message: "Chunk size must be greater than 0".to_string(),
            });
        }
        if self.retry.initial_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigurationError::ValidationError {
                message: format!(
                    "Initial retry delay ({}ms) exceeds maximum delay ({}ms)",
                    self.retry.initial_delay_ms, self.retry.max_delay_ms
                ),
            });
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let config: BulkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by registry settings.
    ///
    /// A missing key keeps the default chunk size; a present but unusable
    /// value is an error rather than a silent fallback.
    pub fn from_registry(registry: &HashMap<String, String>) -> Result<Self, ConfigurationError> {
        let mut config = Self::default();
        if let Some(raw) = registry.get(CHUNK_SIZE_KEY) {
            config.chunk_size = raw
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigurationError::InvalidValue {
                    key: CHUNK_SIZE_KEY.to_string(),
                    value: raw.clone(),
                })?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Parse registry dump lines of the form `key: value` or `key=value`.
///
/// Blank lines and lines starting with `#` are skipped.
pub fn parse_registry(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let split = match (line.find(':'), line.find('=')) {
                (Some(colon), Some(equals)) => colon.min(equals),
                (Some(colon), None) => colon,
                (None, Some(equals)) => equals,
                (None, None) => return None,
            };
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}

/// Builder for [`BulkConfig`].
#[derive(Debug, Default)]
pub struct BulkConfigBuilder {
    config: BulkConfig,
}

impl BulkConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    pub fn with_failure_merge(mut self, merge: FailureMerge) -> Self {
        self.config.failure_merge = merge;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<BulkConfig, ConfigurationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
