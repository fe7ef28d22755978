//! Configuration Loader
//!
//! Environment-aware configuration loading. Handles config directory discovery,
//! environment detection and layering of file and environment-variable sources.

use super::error::{ConfigResult, ConfigurationError};
use super::PlotStatsConfig;
use crate::constants::system::{CONFIG_ENV_PREFIX, CONFIG_FILE_STEM, ENVIRONMENT_VARIABLE};
use config::{Config, Environment, File, FileFormat};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Loaded, validated configuration plus where it came from
#[derive(Debug)]
pub struct ConfigManager {
    config: PlotStatsConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    /// Load configuration from a specific directory
    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load configuration from a specific directory with explicit environment
    ///
    /// Useful for testing without modifying global environment variables.
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(Self::default_config_directory);

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::load_layered_config(&config_directory, environment)?;
        config.validate()?;

        info!(
            environment = %environment,
            batch_size = config.batching.batch_size,
            max_concurrent = config.batching.max_concurrent,
            max_retries = config.retry.max_retries,
            strategy = ?config.execution.strategy,
            recovery_policy = ?config.recovery.policy,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    /// Wrap an already-built configuration, validating it first
    pub fn from_config(config: PlotStatsConfig, environment: &str) -> ConfigResult<Arc<Self>> {
        config.validate()?;
        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory: PathBuf::from("config"),
        }))
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &PlotStatsConfig {
        &self.config
    }

    /// Get the current environment
    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Get the configuration directory
    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// Resolve a path relative to the configuration directory
    pub fn resolve_config_path<P: AsRef<Path>>(&self, relative_path: P) -> PathBuf {
        self.config_directory.join(relative_path)
    }

    /// Detect current environment: PLOTSTATS_ENV || APP_ENV || 'development'
    fn detect_environment() -> String {
        env::var(ENVIRONMENT_VARIABLE)
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn default_config_directory() -> PathBuf {
        if let Ok(dir) = env::var("PLOTSTATS_CONFIG_DIR") {
            return PathBuf::from(dir);
        }

        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            let candidate = PathBuf::from(manifest_dir).join("config");
            if candidate.exists() {
                return candidate;
            }
        }

        PathBuf::from("config")
    }

    /// Find the base configuration file
    fn find_config_file(config_directory: &Path) -> ConfigResult<PathBuf> {
        let mut searched_paths = Vec::new();

        for extension in ["yaml", "yml"] {
            let config_path = config_directory.join(format!("{CONFIG_FILE_STEM}.{extension}"));
            searched_paths.push(config_path.clone());

            if config_path.exists() {
                debug!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        Err(ConfigurationError::config_file_not_found(searched_paths))
    }

    /// Layer base file, environment overrides and environment variables
    fn load_layered_config(
        config_directory: &Path,
        environment: &str,
    ) -> ConfigResult<PlotStatsConfig> {
        let base_file = Self::find_config_file(config_directory)?;
        let override_file =
            config_directory.join(format!("{CONFIG_FILE_STEM}.{environment}.yaml"));

        if override_file.exists() {
            debug!(
                "Applying environment-specific overrides from {}",
                override_file.display()
            );
        }

        let merged = Config::builder()
            .add_source(File::from(base_file.as_path()).format(FileFormat::Yaml))
            .add_source(
                File::from(override_file.as_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigurationError::load_error(base_file.display().to_string(), e))?;

        merged
            .try_deserialize::<PlotStatsConfig>()
            .map_err(ConfigurationError::deserialization_error)
    }
}
