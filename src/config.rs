use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub guard: GuardConfig,
    pub compare: CompareConfig,
    pub reconciliation: ReconciliationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Quiet period after a guarded request completes
    pub cooldown_ms: u64,
    /// Release of a token whose response never arrives
    pub flight_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    pub small_pair_threshold: usize,
    pub max_buffer_size: usize,
    pub default_language: String,
    pub wrap_backward: bool,
    pub large_diff_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub discard_stale_responses: bool,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: 700,
            flight_timeout_ms: 10_000,
        }
    }
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            small_pair_threshold: 1024 * 1024,
            max_buffer_size: 256 * 1024 * 1024,
            default_language: "yaml".to_string(),
            wrap_backward: false,
            large_diff_timeout_ms: 2000,
        }
    }
}

impl GuardConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn flight_timeout(&self) -> Duration {
        Duration::from_millis(self.flight_timeout_ms)
    }
}

impl CompareConfig {
    pub fn large_diff_timeout(&self) -> Duration {
        Duration::from_millis(self.large_diff_timeout_ms)
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
