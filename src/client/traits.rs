//! # External Collaborator Traits
//!
//! The seams through which the orchestration core reaches the remote
//! statistics service. Implementations own transport, authentication and the
//! statistics themselves; the core only batches, retries and merges.

use crate::client::definition::{ComputationDefinition, DefinitionOptions};
use crate::client::errors::RemoteError;
use crate::error::Result;
use crate::models::{Record, ResultRow};
use async_trait::async_trait;

/// Client for the remote statistical-computation service
#[async_trait]
pub trait RemoteComputationClient: Send + Sync {
    /// Client name for logging
    fn client_name(&self) -> &'static str;

    /// Submit one batch of records for evaluation
    ///
    /// Must return exactly one row per submitted record, keyed by the record's
    /// `plot_id`. The executor treats any other shape as a fatal failure.
    async fn submit(
        &self,
        records: &[Record],
        definition: &ComputationDefinition,
    ) -> std::result::Result<Vec<ResultRow>, RemoteError>;
}

/// Builds the multi-layer computation definition
#[async_trait]
pub trait DefinitionBuilder: Send + Sync {
    /// Build a definition; `strict` validates every layer against the service
    /// and drops those that cannot be resolved
    async fn build(&self, options: &DefinitionOptions, strict: bool)
        -> Result<ComputationDefinition>;

    /// Fingerprint of the builder's source-of-truth inputs
    ///
    /// A change invalidates cached definitions. The default never changes.
    fn source_fingerprint(&self) -> Result<String> {
        Ok(String::new())
    }
}
