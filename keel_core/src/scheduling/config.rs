//! Orchestrator configuration
//!
//! Loaded from TOML or YAML, or built from one of the presets.

use crate::core::MAX_MODULES;
use crate::error::{KeelError, KeelResult};
use crate::persistence::FlashConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Per-module loop budget in microseconds
    pub max_loop_time_us: u64,

    /// Minimum time between two unforced saves
    pub min_rewrite_interval_ms: u64,

    pub watchdog_enabled: bool,

    /// Longest silent period before the hardware watchdog fires
    pub watchdog_max_period_ms: u64,

    /// Delay after boot before startup-gated processing may begin
    pub startup_delay_ms: u64,

    /// Run opted-in modules on a second execution context
    pub dual_context: bool,

    /// CPU to pin the secondary context to
    pub secondary_core: Option<usize>,

    /// Registry capacity
    pub max_modules: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl OrchestratorConfig {
    pub fn standard() -> Self {
        Self {
            max_loop_time_us: 4_000,
            min_rewrite_interval_ms: 180_000,
            watchdog_enabled: true,
            watchdog_max_period_ms: 16_384,
            startup_delay_ms: 0,
            dual_context: false,
            secondary_core: None,
            max_modules: MAX_MODULES,
        }
    }

    /// Short intervals for tests and simulation
    pub fn testing() -> Self {
        Self {
            min_rewrite_interval_ms: 50,
            watchdog_max_period_ms: 1_000,
            ..Self::standard()
        }
    }

    pub fn max_loop_time(&self) -> Duration {
        Duration::from_micros(self.max_loop_time_us)
    }

    pub fn min_rewrite_interval(&self) -> Duration {
        Duration::from_millis(self.min_rewrite_interval_ms)
    }

    pub fn watchdog_max_period(&self) -> Duration {
        Duration::from_millis(self.watchdog_max_period_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn flash_config(&self) -> FlashConfig {
        FlashConfig {
            min_rewrite_interval: self.min_rewrite_interval(),
        }
    }

    pub fn validate(&self) -> KeelResult<()> {
        if self.max_modules == 0 || self.max_modules > 255 {
            return Err(KeelError::config(format!(
                "max_modules must be within 1..=255, got {}",
                self.max_modules
            )));
        }
        if self.watchdog_enabled && self.watchdog_max_period_ms == 0 {
            return Err(KeelError::config("watchdog_max_period_ms must be non-zero"));
        }
        if self.max_loop_time_us == 0 {
            return Err(KeelError::config("max_loop_time_us must be non-zero"));
        }
        Ok(())
    }

    pub fn from_toml_str(contents: &str) -> KeelResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> KeelResult<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file (format from the extension, TOML by default)
    pub fn from_file<P: AsRef<Path>>(path: P) -> KeelResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            KeelError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => Self::from_toml_str(&contents),
        }
    }
}
