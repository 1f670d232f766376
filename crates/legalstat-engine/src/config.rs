//! # Engine Configuration
//!
//! Construction-time settings. Every field has a default, so an empty YAML
//! document (or `EngineConfig::default()`) yields a working engine.
//!
//! ```yaml
//! max_batch_concurrency: 10
//! max_batch_size: 500
//! status_cache_ttl_secs: 3600
//! summary_cache_ttl_secs: 900
//! notify_dedupe_window_secs: 86400
//! sync_failure_threshold: 3
//! conflict_grace_secs: 86400
//! deadline_warning_days: 7
//! history_max_page_size: 100
//! event_topic: legal_status.changed
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// YAML could not be parsed into the expected shape.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A value is out of its permitted range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables of the legal-status engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hard cap on simultaneously in-flight syncs during a batch.
    pub max_batch_concurrency: usize,
    /// Largest accepted batch.
    pub max_batch_size: usize,
    /// TTL of `legal_status:current:*` entries.
    pub status_cache_ttl_secs: u64,
    /// TTL of `legal_status:summary:*` entries.
    pub summary_cache_ttl_secs: u64,
    /// Window used by the notification path to suppress repeat deliveries.
    pub notify_dedupe_window_secs: u64,
    /// Consecutive sync failures that raise a SyncFailure anomaly.
    pub sync_failure_threshold: u32,
    /// How long a local/remote disagreement may persist before it is a
    /// StatusConflict anomaly.
    pub conflict_grace_secs: u64,
    /// Deadlines this many days out or closer raise a High anomaly.
    pub deadline_warning_days: i64,
    /// Upper bound on history page size.
    pub history_max_page_size: u32,
    /// Topic status-change events are published to.
    pub event_topic: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_concurrency: 10,
            max_batch_size: 500,
            status_cache_ttl_secs: 60 * 60,
            summary_cache_ttl_secs: 15 * 60,
            notify_dedupe_window_secs: 24 * 60 * 60,
            sync_failure_threshold: 3,
            conflict_grace_secs: 24 * 60 * 60,
            deadline_warning_days: 7,
            history_max_page_size: 100,
            event_topic: "legal_status.changed".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a YAML document. Missing keys take defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would stall or disable the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_batch_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_batch_concurrency must be at least 1".into(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(ConfigError::Invalid("max_batch_size must be at least 1".into()));
        }
        if self.sync_failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "sync_failure_threshold must be at least 1".into(),
            ));
        }
        if self.deadline_warning_days < 0 {
            return Err(ConfigError::Invalid(
                "deadline_warning_days must not be negative".into(),
            ));
        }
        if self.history_max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "history_max_page_size must be at least 1".into(),
            ));
        }
        if self.event_topic.trim().is_empty() {
            return Err(ConfigError::Invalid("event_topic must not be empty".into()));
        }
        Ok(())
    }

    pub fn status_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.status_cache_ttl_secs)
    }

    pub fn summary_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.summary_cache_ttl_secs)
    }

    pub fn notify_dedupe_window(&self) -> Duration {
        Duration::from_secs(self.notify_dedupe_window_secs)
    }

    pub fn conflict_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.conflict_grace_secs).unwrap_or(i64::MAX))
    }

    pub fn deadline_warning(&self) -> chrono::Duration {
        chrono::Duration::days(self.deadline_warning_days)
    }
}
