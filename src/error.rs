//! Error types for the plot statistics core.
//!
//! Batch-level failures are never surfaced through these types: they are data
//! (`BatchFailure`) carried alongside whatever rows succeeded. `PlotStatsError`
//! covers setup problems that prevent an orchestration run from starting at all.

use crate::config::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlotStatsError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Geometry source error: {source_name} - {reason}")]
    SourceError { source_name: String, reason: String },
    #[error("Computation definition error: {0}")]
    DefinitionError(String),
    #[error("State transition error: {0}")]
    StateTransitionError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl PlotStatsError {
    pub fn source_error(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SourceError {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PlotStatsError {
    fn from(error: serde_json::Error) -> Self {
        PlotStatsError::SerializationError(format!("JSON serialization error: {error}"))
    }
}

impl From<std::io::Error> for PlotStatsError {
    fn from(error: std::io::Error) -> Self {
        PlotStatsError::IoError(error.to_string())
    }
}

impl From<ConfigurationError> for PlotStatsError {
    fn from(error: ConfigurationError) -> Self {
        PlotStatsError::ConfigurationError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlotStatsError>;
