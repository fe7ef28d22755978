//! # Concurrency Controller
//!
//! Dispatches batches to the executor either one at a time or with bounded
//! parallelism. A permit is acquired *before* each task is spawned, so no more
//! than `max_concurrent` remote calls are ever in flight. Outcomes are
//! returned in batch order; a panicking batch task becomes a fatal failure for
//! that batch instead of tearing down the run.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinSet};
use tracing::{debug, error, info};

use crate::client::ComputationDefinition;
use crate::config::{ExecutionStrategyKind, PlotStatsConfig};
use crate::logging::log_error;
use crate::models::{Batch, BatchFailure, BatchOutcome, FailureKind, PlotIdRange};
use crate::orchestration::executor::RemoteRequestExecutor;

/// How batches are handed to the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStrategy {
    /// One batch at a time, in batch order
    Sequential,
    /// Up to `max_concurrent` batches in flight
    Bounded { max_concurrent: usize },
}

impl DispatchStrategy {
    pub fn from_config(config: &PlotStatsConfig) -> Self {
        match config.execution.strategy {
            ExecutionStrategyKind::Sequential => DispatchStrategy::Sequential,
            ExecutionStrategyKind::Concurrent => DispatchStrategy::Bounded {
                max_concurrent: config.batching.max_concurrent.max(1),
            },
        }
    }

    pub fn max_in_flight(&self) -> usize {
        match self {
            DispatchStrategy::Sequential => 1,
            DispatchStrategy::Bounded { max_concurrent } => *max_concurrent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConcurrencyController {
    executor: Arc<RemoteRequestExecutor>,
    strategy: DispatchStrategy,
}

impl ConcurrencyController {
    pub fn new(executor: Arc<RemoteRequestExecutor>, strategy: DispatchStrategy) -> Self {
        Self { executor, strategy }
    }

    pub fn strategy(&self) -> DispatchStrategy {
        self.strategy
    }

    /// Execute every batch and return one outcome per batch, ordered by batch index
    pub async fn dispatch(
        &self,
        batches: Vec<Batch>,
        definition: Arc<ComputationDefinition>,
    ) -> Vec<BatchOutcome> {
        if batches.is_empty() {
            return Vec::new();
        }

        info!(
            batch_count = batches.len(),
            strategy = ?self.strategy,
            definition = %definition.fingerprint,
            "Dispatching batches"
        );

        let mut outcomes = match self.strategy {
            DispatchStrategy::Sequential => self.dispatch_sequential(batches, &definition).await,
            DispatchStrategy::Bounded { max_concurrent } => {
                self.dispatch_bounded(batches, definition, max_concurrent.max(1))
                    .await
            }
        };

        outcomes.sort_by_key(BatchOutcome::batch_index);
        outcomes
    }

    async fn dispatch_sequential(
        &self,
        batches: Vec<Batch>,
        definition: &ComputationDefinition,
    ) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(batches.len());
        for batch in &batches {
            outcomes.push(self.executor.execute(batch, definition).await);
        }
        outcomes
    }

    async fn dispatch_bounded(
        &self,
        batches: Vec<Batch>,
        definition: Arc<ComputationDefinition>,
        max_concurrent: usize,
    ) -> Vec<BatchOutcome> {
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let mut tasks = JoinSet::new();
        let mut spawned: HashMap<Id, (usize, PlotIdRange)> = HashMap::with_capacity(batches.len());
        let mut outcomes = Vec::with_capacity(batches.len());

        for batch in batches {
            // The semaphore is never closed while this function holds it
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };

            let batch_key = (batch.index(), batch.plot_id_range());
            let executor = self.executor.clone();
            let definition = definition.clone();
            let handle = tasks.spawn(async move {
                let outcome = executor.execute(&batch, &definition).await;
                drop(permit);
                outcome
            });
            spawned.insert(handle.id(), batch_key);
            debug!(batch_index = batch_key.0, in_flight = tasks.len(), "Batch task spawned");

            // Drain finished tasks opportunistically so the set does not grow unbounded
            while let Some(joined) = tasks.try_join_next_with_id() {
                outcomes.extend(resolve_joined(joined, &spawned));
            }
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            outcomes.extend(resolve_joined(joined, &spawned));
        }

        outcomes
    }
}

fn resolve_joined(
    joined: Result<(Id, BatchOutcome), tokio::task::JoinError>,
    spawned: &HashMap<Id, (usize, PlotIdRange)>,
) -> Option<BatchOutcome> {
    match joined {
        Ok((_, outcome)) => Some(outcome),
        Err(join_error) => {
            let id = join_error.id();
            let message = if join_error.is_panic() {
                "batch task panicked".to_string()
            } else {
                format!("batch task aborted: {join_error}")
            };

            match spawned.get(&id) {
                Some(&(batch_index, plot_ids)) => {
                    log_error(
                        "ConcurrencyController",
                        "dispatch",
                        &message,
                        Some(&format!("batch_index={batch_index}")),
                    );
                    Some(BatchOutcome::Failure(BatchFailure {
                        batch_index,
                        plot_ids,
                        kind: FailureKind::Fatal,
                        message,
                        attempts: 1,
                    }))
                }
                None => {
                    // Every spawned task is registered before it can be joined
                    debug_assert!(false, "unregistered batch task {id}");
                    error!(task_id = %id, "Unknown batch task finished with error");
                    None
                }
            }
        }
    }
}
