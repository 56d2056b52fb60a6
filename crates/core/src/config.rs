// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration loaded from `sluice.toml`

use crate::allocation::ItemId;
use crate::retry::{Backoff, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors from loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Start with the store outage switch engaged
    pub simulate_outage: bool,
    pub store: StoreConfig,
    pub allocator: RetryPolicy,
    pub flush: FlushConfig,
    pub stock: Vec<StockSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            simulate_outage: false,
            store: StoreConfig::default(),
            allocator: RetryPolicy::allocator(),
            flush: FlushConfig::default(),
            stock: vec![StockSeed {
                item: ItemId::from("A"),
                remaining: 100,
            }],
        }
    }
}

impl Config {
    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(path.to_path_buf(), e)),
        };
        Self::parse(&text).map_err(|e| match e {
            ConfigError::Parse(_, source) => ConfigError::Parse(path.to_path_buf(), source),
            other => other,
        })
    }

    /// Parse and validate TOML text
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(text).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allocator.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "allocator.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.flush.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "flush.retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.flush.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "flush.batch_size must be at least 1".to_string(),
            ));
        }
        if self.flush.period.is_zero() {
            return Err(ConfigError::Invalid(
                "flush.period must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the database path against the state directory
    pub fn database_path(&self, state_dir: &Path) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            state_dir.join(&self.store.path)
        }
    }
}

/// Durable store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// How long `BEGIN IMMEDIATE` waits for the write lock before reporting contention
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sluice.db"),
            busy_timeout: Duration::from_secs(1),
        }
    }
}

/// Flush scheduler settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FlushConfig {
    #[serde(with = "humantime_serde")]
    pub period: Duration,
    pub batch_size: usize,
    /// Pause after a batch was requeued
    #[serde(with = "humantime_serde")]
    pub failure_pause: Duration,
    /// Pending depth at which a warning is logged; no bound is enforced
    pub queue_warn_depth: usize,
    /// In-cycle retries on write contention before the batch is requeued
    pub retry: RetryPolicy,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(2),
            batch_size: 100,
            failure_pause: Duration::from_secs(1),
            queue_warn_depth: 100_000,
            retry: RetryPolicy::new(1, Backoff::Fixed(Duration::from_millis(50))),
        }
    }
}

/// An item seeded into the stock ledger at startup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StockSeed {
    pub item: ItemId,
    pub remaining: u64,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
