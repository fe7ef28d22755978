//! Transport-level errors reported by a remote computation client.

use std::time::Duration;
use thiserror::Error;

/// Error returned by `RemoteComputationClient::submit`
///
/// Clients should use the most specific variant they can. Opaque failures go
/// into `Other` and are classified from their message text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RemoteError {
    /// The service asked us to slow down
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// The call did not complete within the configured timeout
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Connection reset: {0}")]
    ConnectionReset(String),

    /// The service is temporarily unable to take requests
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// A requested attribute (data layer, band, property) is absent from the
    /// current computation definition
    #[error("Unresolved attribute '{attribute}': {message}")]
    UnresolvedAttribute { attribute: String, message: String },

    /// The request itself was rejected as invalid
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Remote error: {0}")]
    Other(String),
}

impl RemoteError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    pub fn unresolved(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnresolvedAttribute {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Server-provided hint for when to try again
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            RemoteError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}
