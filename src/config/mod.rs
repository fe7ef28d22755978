//! # PlotStats Configuration System
//!
//! Layered configuration for the batch orchestration core: a base YAML file,
//! optional environment-specific overrides and `PLOTSTATS__*` environment
//! variables, merged by the `config` crate and validated explicitly.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use plotstats_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let batch_size = manager.config().batching.batch_size;
//! let timeout = manager.config().execution.request_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::defaults;
use crate::orchestration::recovery::RecoveryPolicy;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring plotstats-config.yaml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlotStatsConfig {
    /// Batch partitioning and dispatch bounds
    pub batching: BatchingConfig,

    /// Transient failure retry and backoff
    pub retry: RetryConfig,

    /// Dispatch strategy and per-call timeout
    pub execution: ExecutionConfig,

    /// Structural failure recovery policy
    pub recovery: RecoveryConfig,

    /// Numeric output formatting
    pub format: FormatConfig,

    /// Enrichment settings
    pub postprocess: PostprocessConfig,

    /// Options handed to the computation definition builder
    pub definition: DefinitionConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BatchingConfig {
    pub batch_size: usize,
    pub max_concurrent: usize,
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            max_concurrent: defaults::MAX_CONCURRENT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt; total attempts are `max_retries + 1`
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Fraction of the computed delay added as random jitter (0.0 - 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::MAX_RETRIES,
            base_delay_ms: defaults::BASE_RETRY_DELAY_MS,
            max_delay_ms: defaults::MAX_RETRY_DELAY_MS,
            backoff_multiplier: defaults::BACKOFF_MULTIPLIER,
            jitter_factor: defaults::JITTER_FACTOR,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// How batches are handed to the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategyKind {
    /// One batch at a time, in batch order
    Sequential,
    /// Bounded parallelism of `batching.max_concurrent`
    #[default]
    Concurrent,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub strategy: ExecutionStrategyKind,
    pub request_timeout_seconds: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            strategy: ExecutionStrategyKind::default(),
            request_timeout_seconds: defaults::REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl ExecutionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub policy: RecoveryPolicy,
}

/// Target unit for area-valued statistic columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    #[default]
    Hectares,
    SquareMeters,
    SquareKilometers,
    Acres,
}

impl AreaUnit {
    /// Multiplier converting a value in hectares into this unit
    pub fn from_hectares_factor(&self) -> f64 {
        match self {
            AreaUnit::Hectares => 1.0,
            AreaUnit::SquareMeters => 10_000.0,
            AreaUnit::SquareKilometers => 0.01,
            AreaUnit::Acres => 2.471_053_814_671_653,
        }
    }
}

/// Whether area columns are reported as areas or as a share of the plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueUnit {
    #[default]
    Absolute,
    Percent,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FormatConfig {
    pub decimal_places: u32,
    pub area_unit: AreaUnit,
    pub value_unit: ValueUnit,
    /// Statistic columns the remote service reports in hectares
    pub area_columns: Vec<String>,
    /// Column holding the plot's total area in hectares
    pub total_area_column: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            decimal_places: defaults::DECIMAL_PLACES,
            area_unit: AreaUnit::default(),
            value_unit: ValueUnit::default(),
            area_columns: Vec::new(),
            total_area_column: crate::constants::columns::TOTAL_AREA.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PostprocessConfig {
    /// Statistic column carrying the administrative region code
    pub admin_code_column: String,
    /// JSON lookup table of region codes; an empty table is used when unset
    pub lookup_path: Option<PathBuf>,
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            admin_code_column: crate::constants::columns::ADMIN_CODE.to_string(),
            lookup_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DefinitionConfig {
    /// Named data layers to include; empty means every layer the builder knows
    pub layers: Vec<String>,
    /// ISO country codes selecting national data layers
    pub national_codes: Vec<String>,
}

impl PlotStatsConfig {
    /// Validate the merged configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.batching.batch_size == 0 {
            return Err(ConfigurationError::invalid_value(
                "batching.batch_size",
                "0",
                "batch size must be greater than 0",
            ));
        }

        if self.batching.max_concurrent == 0 {
            return Err(ConfigurationError::invalid_value(
                "batching.max_concurrent",
                "0",
                "max concurrent requests must be greater than 0",
            ));
        }

        if self.retry.backoff_multiplier.is_nan() || self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "retry.backoff_multiplier",
                self.retry.backoff_multiplier.to_string(),
                "backoff multiplier must be at least 1.0",
            ));
        }

        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(ConfigurationError::invalid_value(
                "retry.jitter_factor",
                self.retry.jitter_factor.to_string(),
                "jitter factor must be between 0.0 and 1.0",
            ));
        }

        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            return Err(ConfigurationError::invalid_value(
                "retry.max_delay_ms",
                self.retry.max_delay_ms.to_string(),
                "max delay must not be smaller than the base delay",
            ));
        }

        if self.execution.request_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "execution.request_timeout_seconds",
                "0",
                "request timeout must be greater than 0",
            ));
        }

        if self.format.decimal_places > 12 {
            return Err(ConfigurationError::invalid_value(
                "format.decimal_places",
                self.format.decimal_places.to_string(),
                "at most 12 decimal places are supported",
            ));
        }

        if self.format.total_area_column.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "format.total_area_column",
                "",
                "column name must not be empty",
            ));
        }

        if let Some(column) = self.format.area_columns.iter().find(|c| c.trim().is_empty()) {
            return Err(ConfigurationError::invalid_value(
                "format.area_columns",
                column.clone(),
                "column names must not be empty",
            ));
        }

        if self.postprocess.admin_code_column.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "postprocess.admin_code_column",
                "",
                "column name must not be empty",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PlotStatsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batching.batch_size, defaults::BATCH_SIZE);
        assert_eq!(config.execution.strategy, ExecutionStrategyKind::Concurrent);
        assert_eq!(config.recovery.policy, RecoveryPolicy::WhenNothingSucceeded);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut config = PlotStatsConfig::default();
        config.batching.batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batching.batch_size"));
    }

    #[test]
    fn test_jitter_out_of_range_rejected() {
        let mut config = PlotStatsConfig::default();
        config.retry.jitter_factor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_sections_fall_back_to_defaults() {
        let config: PlotStatsConfig =
            serde_json::from_value(serde_json::json!({"batching": {"batch_size": 7}})).unwrap();
        assert_eq!(config.batching.batch_size, 7);
        assert_eq!(config.batching.max_concurrent, defaults::MAX_CONCURRENT);
        assert_eq!(config.retry, RetryConfig::default());
    }

    #[test]
    fn test_area_unit_factors() {
        assert_eq!(AreaUnit::Hectares.from_hectares_factor(), 1.0);
        assert_eq!(AreaUnit::SquareMeters.from_hectares_factor(), 10_000.0);
        assert!((AreaUnit::Acres.from_hectares_factor() - 2.4710538).abs() < 1e-6);
    }
}
