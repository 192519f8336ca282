//! Engine configuration
//!
//! Defaults match the timings the engine was tuned with; a YAML file may
//! override any subset of fields.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Logical channel that separates extraction traffic from conversation
pub const DEFAULT_CHANNEL: &str = "concept-graph";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period after the last trigger before a request is issued
    pub debounce_ms: u64,
    /// How long a request may stay in flight before the guard is released
    pub inflight_timeout_ms: u64,
    /// Transcript turns included in each request
    pub max_context_turns: usize,
    pub channel: String,
    /// Errors without a correlation id only release the in-flight guard
    /// when this is false
    pub strict_error_correlation: bool,
    /// Persist a snapshot after every applied diff
    pub autosave: bool,
    /// Diff counts announced to observers
    pub diff_milestones: Vec<u64>,
    /// Processed response ids remembered for redelivery dedup
    pub recent_response_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 800,
            inflight_timeout_ms: 6000,
            max_context_turns: 8,
            channel: DEFAULT_CHANNEL.to_string(),
            strict_error_correlation: true,
            autosave: false,
            diff_milestones: vec![1, 5, 10],
            recent_response_capacity: 32,
        }
    }
}

impl EngineConfig {
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML config file
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.channel.is_empty() {
            return Err(ConfigError::Invalid("channel must not be empty".to_string()));
        }
        if self.max_context_turns == 0 {
            return Err(ConfigError::Invalid(
                "max_context_turns must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn inflight_timeout(&self) -> Duration {
        Duration::from_millis(self.inflight_timeout_ms)
    }

    pub fn with_debounce_ms(mut self, ms: u64) -> Self {
        self.debounce_ms = ms;
        self
    }

    pub fn with_inflight_timeout_ms(mut self, ms: u64) -> Self {
        self.inflight_timeout_ms = ms;
        self
    }

    pub fn with_max_context_turns(mut self, turns: usize) -> Self {
        self.max_context_turns = turns;
        self
    }

    pub fn with_strict_error_correlation(mut self, strict: bool) -> Self {
        self.strict_error_correlation = strict;
        self
    }

    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }
}
