//! # Remote Failure Classification
//!
//! Decides how the executor treats each error returned by the remote
//! computation client, and how long to wait before retrying transient ones.
//!
//! ## Taxonomy
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐     ┌──────────────┐
//! │ RemoteError          │────▶│ FailureClassifier    │────▶│ FailureKind  │
//! │ (+ message text)     │     │ strategy             │     │ + error code │
//! └──────────────────────┘     └──────────────────────┘     └──────────────┘
//! ```
//!
//! - **Retryable**: rate limits, timeouts, connection resets, unavailability.
//!   Retried locally with exponential backoff.
//! - **Structural**: the definition cannot resolve a requested attribute.
//!   Never retried with the same definition.
//! - **Fatal**: everything else.
//!
//! Clients that cannot produce typed errors report `RemoteError::Other`; the
//! standard classifier then inspects the message for known signatures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::client::RemoteError;
use crate::config::RetryConfig;
use crate::models::FailureKind;

/// Result of classifying one remote error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureClassification {
    pub kind: FailureKind,
    /// Short machine-readable code for logs
    pub error_code: String,
    pub message: String,
}

impl FailureClassification {
    fn new(kind: FailureKind, error_code: &str, error: &RemoteError) -> Self {
        Self {
            kind,
            error_code: error_code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Strategy for mapping remote errors to failure kinds
pub trait FailureClassifier: Send + Sync {
    fn classify(&self, error: &RemoteError) -> FailureClassification;

    /// Get the classifier name for identification
    fn classifier_name(&self) -> &'static str;
}

/// Message fragments (lowercase) that mark a transient condition
const TRANSIENT_SIGNATURES: &[&str] = &[
    "too many requests",
    "rate limit",
    "quota exceeded",
    "timed out",
    "timeout",
    "deadline exceeded",
    "connection reset",
    "connection refused",
    "broken pipe",
    "service unavailable",
    "temporarily unavailable",
];

/// HTTP status codes that mark a transient condition, matched as whole tokens
const TRANSIENT_STATUS_CODES: &[&str] = &["429", "503"];

/// Message fragments (lowercase) that mark an attribute the definition cannot resolve
const STRUCTURAL_SIGNATURES: &[&str] = &[
    "does not contain key",
    "unknown layer",
    "no such layer",
    "unresolved attribute",
];

/// Standard classifier: typed variants first, then message signatures
#[derive(Debug, Default, Clone)]
pub struct StandardFailureClassifier;

impl StandardFailureClassifier {
    pub fn new() -> Self {
        Self
    }

    fn classify_message(&self, error: &RemoteError, message: &str) -> FailureClassification {
        let lowered = message.to_lowercase();

        if is_structural_message(&lowered) {
            return FailureClassification::new(FailureKind::Structural, "UNRESOLVED_ATTRIBUTE", error);
        }

        if TRANSIENT_SIGNATURES
            .iter()
            .any(|signature| lowered.contains(signature))
            || has_transient_status_code(&lowered)
        {
            return FailureClassification::new(FailureKind::Retryable, "TRANSIENT_REMOTE_ERROR", error);
        }

        FailureClassification::new(FailureKind::Fatal, "REMOTE_ERROR", error)
    }
}

/// True when a transient status code appears as its own token, not inside an id
fn has_transient_status_code(lowered: &str) -> bool {
    lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| TRANSIENT_STATUS_CODES.contains(&token))
}

/// Signatures like "Image.select: Band 'x' not found" or "Property 'y' is missing"
fn is_structural_message(lowered: &str) -> bool {
    if STRUCTURAL_SIGNATURES
        .iter()
        .any(|signature| lowered.contains(signature))
    {
        return true;
    }

    let names_band_or_property = lowered.contains("band") || lowered.contains("property");
    names_band_or_property && (lowered.contains("not found") || lowered.contains("is missing"))
}

impl FailureClassifier for StandardFailureClassifier {
    fn classify(&self, error: &RemoteError) -> FailureClassification {
        match error {
            RemoteError::RateLimited { .. } => {
                FailureClassification::new(FailureKind::Retryable, "RATE_LIMITED", error)
            }
            RemoteError::Timeout { .. } => {
                FailureClassification::new(FailureKind::Retryable, "REQUEST_TIMEOUT", error)
            }
            RemoteError::ConnectionReset(_) => {
                FailureClassification::new(FailureKind::Retryable, "CONNECTION_RESET", error)
            }
            RemoteError::Unavailable(_) => {
                FailureClassification::new(FailureKind::Retryable, "SERVICE_UNAVAILABLE", error)
            }
            RemoteError::UnresolvedAttribute { .. } => {
                FailureClassification::new(FailureKind::Structural, "UNRESOLVED_ATTRIBUTE", error)
            }
            RemoteError::Rejected(_) => {
                FailureClassification::new(FailureKind::Fatal, "REQUEST_REJECTED", error)
            }
            RemoteError::Other(message) => self.classify_message(error, message),
        }
    }

    fn classifier_name(&self) -> &'static str {
        "StandardFailureClassifier"
    }
}

/// Exponential backoff with jitter, capped by a maximum delay
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Fraction of the computed delay added as random jitter (0.0 - 1.0)
    pub jitter_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for BackoffPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            multiplier: config.backoff_multiplier,
            jitter_factor: config.jitter_factor,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `retry_number` (1-based)
    ///
    /// A server `retry_after` hint raises the delay but never past `max_delay`.
    pub fn delay_for(&self, retry_number: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = retry_number.saturating_sub(1).min(32) as i32;
        let delay = self
            .base_delay
            .mul_f64(self.multiplier.max(1.0).powi(exponent).min(1e9));

        let jittered = if self.jitter_factor > 0.0 {
            let jitter = fastrand::f64() * self.jitter_factor;
            delay.mul_f64(1.0 + jitter)
        } else {
            delay
        };

        let hinted = match retry_after {
            Some(hint) => jittered.max(hint),
            None => jittered,
        };

        hinted.min(self.max_delay)
    }
}
