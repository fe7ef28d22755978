//! # Workflow Facades
//!
//! Three entry points that wire adapters to the shared orchestration and
//! postprocessing pipeline:
//!
//! | Facade             | Input                 | Output                |
//! |--------------------|-----------------------|-----------------------|
//! | `local_to_local`   | local geometry source | `ResultTable`         |
//! | `remote_to_local`  | remote collection     | `ResultTable`         |
//! | `remote_to_remote` | remote collection     | published collection  |
//!
//! Facades never fail on partial batch failure. They return the best-effort
//! table together with the failure list and run statistics; errors are
//! reserved for setup problems such as unreadable input or invalid settings.

pub mod facades;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::adapters::RemoteCollectionHandle;
use crate::client::{DefinitionBuilder, DefinitionCache, DefinitionOptions, RemoteComputationClient};
use crate::config::{ConfigManager, FormatConfig, PlotStatsConfig};
use crate::error::Result;
use crate::models::BatchFailure;
use crate::orchestration::OrchestrationReport;
use crate::postprocess::{
    AdminLookupProvider, FixedLookup, GeometryMetadataExtractor, LocalMetadataExtractor,
    LookupCache, ResultTable,
};

pub use facades::{local_to_local, remote_to_local, remote_to_remote};

/// Collaborators shared by every facade call
#[derive(Clone)]
pub struct WorkflowContext {
    pub client: Arc<dyn RemoteComputationClient>,
    pub definitions: Arc<DefinitionCache>,
    pub metadata_extractor: Arc<dyn LocalMetadataExtractor>,
    pub lookup: Arc<dyn AdminLookupProvider>,
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("client", &self.client.client_name())
            .field("definitions", &self.definitions)
            .field("metadata_extractor", &self.metadata_extractor.extractor_name())
            .finish()
    }
}

impl WorkflowContext {
    /// Context with geometry metadata and an empty region lookup
    pub fn new(client: Arc<dyn RemoteComputationClient>, definitions: Arc<DefinitionCache>) -> Self {
        Self {
            client,
            definitions,
            metadata_extractor: Arc::new(GeometryMetadataExtractor::new()),
            lookup: Arc::new(FixedLookup::default()),
        }
    }

    /// Context whose region lookup comes from `postprocess.lookup_path`, if set
    ///
    /// Relative lookup paths resolve against the configuration directory.
    pub fn from_config(
        client: Arc<dyn RemoteComputationClient>,
        builder: Arc<dyn DefinitionBuilder>,
        manager: &ConfigManager,
    ) -> Self {
        let context = Self::new(client, Arc::new(DefinitionCache::new(builder)));
        match &manager.config().postprocess.lookup_path {
            Some(path) => {
                context.with_lookup(Arc::new(LookupCache::new(manager.resolve_config_path(path))))
            }
            None => context,
        }
    }

    pub fn with_metadata_extractor(mut self, extractor: Arc<dyn LocalMetadataExtractor>) -> Self {
        self.metadata_extractor = extractor;
        self
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn AdminLookupProvider>) -> Self {
        self.lookup = lookup;
        self
    }
}

/// Per-call settings: batching, retry, format and definition options
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowOptions {
    pub config: PlotStatsConfig,
    pub definition: DefinitionOptions,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self::from_config(&PlotStatsConfig::default())
    }
}

impl WorkflowOptions {
    pub fn from_config(config: &PlotStatsConfig) -> Self {
        Self {
            config: config.clone(),
            definition: DefinitionOptions::from(&config.definition),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batching.batch_size = batch_size;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.config.batching.max_concurrent = max_concurrent;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    pub fn with_format(mut self, format: FormatConfig) -> Self {
        self.config.format = format;
        self
    }

    pub fn with_definition(mut self, definition: DefinitionOptions) -> Self {
        self.definition = definition;
        self
    }
}

/// Run accounting shared by all facade reports
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStatistics {
    pub run_id: Uuid,
    pub record_count: usize,
    pub row_count: usize,
    pub batch_count: usize,
    pub failed_batch_count: usize,
    pub recovery_attempted: bool,
    pub definition_fingerprint: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl RunStatistics {
    fn from_report(report: &OrchestrationReport) -> Self {
        Self {
            run_id: report.run_id,
            record_count: report.record_count,
            row_count: report.merged.row_count(),
            batch_count: report.batch_count,
            failed_batch_count: report.merged.failures.len(),
            recovery_attempted: report.recovery_attempted,
            definition_fingerprint: report.definition_fingerprint.clone(),
            started_at: report.started_at,
            elapsed: report.elapsed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalWorkflowReport {
    pub table: ResultTable,
    pub failures: Vec<BatchFailure>,
    pub statistics: RunStatistics,
}

impl LocalWorkflowReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteWorkflowReport {
    pub handle: RemoteCollectionHandle,
    pub failures: Vec<BatchFailure>,
    pub statistics: RunStatistics,
}

impl RemoteWorkflowReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Validate options up front so facades fail before touching any adapter
fn validate_options(options: &WorkflowOptions) -> Result<()> {
    options.config.validate()?;
    Ok(())
}
