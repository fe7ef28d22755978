//! # Batch Orchestrator
//!
//! The single entry point every workflow facade runs through:
//!
//! ```text
//! records ─▶ partition ─▶ dispatch ─▶ merge ─▶ evaluate ─┬─▶ report
//!                                                         │
//!                       strict rebuild ─▶ re-run (once) ──┘
//! ```
//!
//! Setup problems (invalid configuration, a definition that cannot be built)
//! are returned as errors. Anything that goes wrong with individual batches is
//! reported as data in the returned `OrchestrationReport`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::client::{
    ComputationDefinition, DefinitionCache, DefinitionOptions, RemoteComputationClient,
};
use crate::config::{ConfigManager, PlotStatsConfig};
use crate::error::Result;
use crate::logging::{log_error, log_run_operation};
use crate::models::{Batch, PlotId, Record};
use crate::orchestration::controller::{ConcurrencyController, DispatchStrategy};
use crate::orchestration::error_classifier::FailureClassifier;
use crate::orchestration::executor::RemoteRequestExecutor;
use crate::orchestration::merger::{merge, MergedResult};
use crate::orchestration::partitioner::{partition, select};
use crate::orchestration::recovery::{RecoveryCoordinator, RecoveryDecision, RecoveryPolicy};

/// Everything a caller needs to judge one orchestration run
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationReport {
    pub run_id: Uuid,
    pub merged: MergedResult,
    pub record_count: usize,
    pub batch_count: usize,
    /// Whether the strict rebuild and re-run happened
    pub recovery_attempted: bool,
    /// Fingerprint of the last definition dispatched
    pub definition_fingerprint: Option<String>,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl OrchestrationReport {
    pub fn is_complete(&self) -> bool {
        self.merged.is_complete()
    }

    pub fn missing_plot_ids(&self) -> Vec<PlotId> {
        self.merged.missing_plot_ids(self.record_count)
    }
}

/// Runs partition, dispatch, merge and recovery for one record set at a time
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    controller: ConcurrencyController,
    definitions: Arc<DefinitionCache>,
    batch_size: usize,
    recovery_policy: RecoveryPolicy,
}

impl BatchOrchestrator {
    /// Build an orchestrator from validated configuration
    pub fn new(
        client: Arc<dyn RemoteComputationClient>,
        definitions: Arc<DefinitionCache>,
        config: &PlotStatsConfig,
    ) -> Result<Self> {
        config.validate()?;
        let executor = RemoteRequestExecutor::new(client, config);
        Ok(Self::from_parts(executor, definitions, config))
    }

    /// Build an orchestrator from a loaded configuration manager
    pub fn from_config_manager(
        client: Arc<dyn RemoteComputationClient>,
        definitions: Arc<DefinitionCache>,
        manager: &ConfigManager,
    ) -> Result<Self> {
        info!(
            environment = %manager.environment(),
            "Initializing BatchOrchestrator from configuration"
        );
        Self::new(client, definitions, manager.config())
    }

    /// Build with a custom failure classifier
    pub fn with_classifier(
        client: Arc<dyn RemoteComputationClient>,
        definitions: Arc<DefinitionCache>,
        config: &PlotStatsConfig,
        classifier: Arc<dyn FailureClassifier>,
    ) -> Result<Self> {
        config.validate()?;
        let executor = RemoteRequestExecutor::new(client, config).with_classifier(classifier);
        Ok(Self::from_parts(executor, definitions, config))
    }

    fn from_parts(
        executor: RemoteRequestExecutor,
        definitions: Arc<DefinitionCache>,
        config: &PlotStatsConfig,
    ) -> Self {
        Self {
            controller: ConcurrencyController::new(
                Arc::new(executor),
                DispatchStrategy::from_config(config),
            ),
            definitions,
            batch_size: config.batching.batch_size,
            recovery_policy: config.recovery.policy,
        }
    }

    pub fn definitions(&self) -> &Arc<DefinitionCache> {
        &self.definitions
    }

    /// Orchestrate one run over `records`, whose plot ids must already be assigned
    pub async fn run(
        &self,
        records: Arc<[Record]>,
        options: &DefinitionOptions,
    ) -> Result<OrchestrationReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("orchestration_run", run_id = %run_id, record_count = records.len());
        self.run_inner(run_id, records, options)
            .instrument(span)
            .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        records: Arc<[Record]>,
        options: &DefinitionOptions,
    ) -> Result<OrchestrationReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let run_label = run_id.to_string();
        let record_count = records.len();

        log_run_operation("run", &run_label, record_count, "started", None);

        let batches = partition(records, self.batch_size)?;
        if batches.is_empty() {
            log_run_operation("run", &run_label, 0, "completed", Some("no records"));
            return Ok(OrchestrationReport {
                run_id,
                merged: MergedResult::default(),
                record_count,
                batch_count: 0,
                recovery_attempted: false,
                definition_fingerprint: None,
                started_at,
                elapsed: clock.elapsed(),
            });
        }

        let definition = self.definitions.get_or_build(options, false).await?;
        let mut fingerprint = definition.fingerprint.clone();
        let first_pass = merge(self.controller.dispatch(batches.clone(), definition).await);

        let mut coordinator = RecoveryCoordinator::new(self.recovery_policy);
        let decision = coordinator.evaluate(&first_pass)?;

        let recovery_attempted = decision.is_recovery();
        let merged = match decision {
            RecoveryDecision::Proceed => first_pass,
            decision => {
                let merged = match self.strict_definition(options, &run_label).await {
                    Some(strict) => {
                        fingerprint = strict.fingerprint.clone();
                        self.recover(&batches, first_pass, decision, strict).await
                    }
                    None => first_pass,
                };
                coordinator.complete()?;
                merged
            }
        };

        let report = OrchestrationReport {
            run_id,
            record_count,
            batch_count: batches.len(),
            recovery_attempted,
            definition_fingerprint: Some(fingerprint),
            started_at,
            elapsed: clock.elapsed(),
            merged,
        };

        let details = format!(
            "rows={} failures={} recovery_attempted={}",
            report.merged.row_count(),
            report.merged.failures.len(),
            report.recovery_attempted
        );
        let status = if report.is_complete() {
            "completed"
        } else {
            "completed_with_failures"
        };
        log_run_operation("run", &run_label, record_count, status, Some(&details));

        Ok(report)
    }

    async fn strict_definition(
        &self,
        options: &DefinitionOptions,
        run_label: &str,
    ) -> Option<Arc<ComputationDefinition>> {
        match self.definitions.rebuild(options, true).await {
            Ok(definition) => Some(definition),
            Err(e) => {
                log_error(
                    "BatchOrchestrator",
                    "strict_rebuild",
                    &e.to_string(),
                    Some(&format!("run_id={run_label}")),
                );
                warn!("Strict definition rebuild failed; keeping first pass result");
                None
            }
        }
    }

    async fn recover(
        &self,
        batches: &[Batch],
        first_pass: MergedResult,
        decision: RecoveryDecision,
        strict: Arc<ComputationDefinition>,
    ) -> MergedResult {
        match decision {
            RecoveryDecision::Proceed => first_pass,
            RecoveryDecision::RecoverAll => {
                info!(batch_count = batches.len(), "Re-running all batches with strict definition");
                merge(self.controller.dispatch(batches.to_vec(), strict).await)
            }
            RecoveryDecision::RecoverBatches(indices) => {
                let subset = select(batches, &indices);
                info!(batch_count = subset.len(), "Re-running structurally failed batches");
                let mut merged = first_pass;
                merged.absorb(merge(self.controller.dispatch(subset, strict).await));
                merged
            }
        }
    }
}
