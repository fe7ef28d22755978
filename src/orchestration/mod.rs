//! # Batch Orchestration Engine
//!
//! Partitions identified records into batches, dispatches them to the remote
//! computation service under bounded concurrency, retries transient failures,
//! merges the outcomes by `plot_id` and runs at most one structural recovery
//! pass.
//!
//! ## Core Components
//!
//! - **identity**: dense `plot_id` assignment in input order
//! - **partitioner**: contiguous, non-overlapping batches
//! - **executor**: one batch, one remote call at a time, with timeout and retry
//! - **error_classifier**: retryable / structural / fatal taxonomy and backoff
//! - **controller**: sequential or semaphore-bounded dispatch
//! - **merger**: order-independent merge of outcomes
//! - **recovery**: the `Initial → Recovering → Done` coordinator
//! - **core**: `BatchOrchestrator`, which wires the above into one run
//!
//! Only the executor suspends on remote I/O. Batches share their records
//! through an `Arc<[Record]>` and are never mutated.
//!
//! ## Example
//!
//! ```rust
//! # use async_trait::async_trait;
//! # use plotstats_core::client::*;
//! # use plotstats_core::models::{Geometry, RawRecord, Record, ResultRow};
//! # use std::sync::Arc;
//! # struct AreaOnly;
//! # #[async_trait]
//! # impl RemoteComputationClient for AreaOnly {
//! #     fn client_name(&self) -> &'static str { "area_only" }
//! #     async fn submit(&self, records: &[Record], _: &ComputationDefinition)
//! #         -> Result<Vec<ResultRow>, RemoteError> {
//! #         Ok(records.iter().map(|r| ResultRow::new(r.plot_id).with_value("area", 1.0)).collect())
//! #     }
//! # }
//! # struct Builder;
//! # #[async_trait]
//! # impl DefinitionBuilder for Builder {
//! #     async fn build(&self, o: &DefinitionOptions, strict: bool)
//! #         -> plotstats_core::Result<ComputationDefinition> {
//! #         Ok(ComputationDefinition::new(o.layers.clone(), strict, serde_json::Value::Null))
//! #     }
//! # }
//! use plotstats_core::orchestration::{assign_plot_ids, BatchOrchestrator};
//! use plotstats_core::PlotStatsConfig;
//!
//! # tokio_test::block_on(async {
//! let square = Geometry::Polygon(vec![vec![[0.0, 0.0], [0.01, 0.0], [0.01, 0.01], [0.0, 0.0]]]);
//! let records: Arc<[Record]> = assign_plot_ids(vec![RawRecord::new(square); 60]).into();
//!
//! let orchestrator = BatchOrchestrator::new(
//!     Arc::new(AreaOnly),
//!     Arc::new(DefinitionCache::new(Arc::new(Builder))),
//!     &PlotStatsConfig::default(),
//! )?;
//! let report = orchestrator.run(records, &DefinitionOptions::default()).await?;
//!
//! assert!(report.is_complete());
//! assert_eq!(report.batch_count, 3);
//! # Ok::<(), plotstats_core::PlotStatsError>(())
//! # }).unwrap();
//! ```

pub mod controller;
pub mod core;
pub mod error_classifier;
pub mod executor;
pub mod identity;
pub mod merger;
pub mod partitioner;
pub mod recovery;

pub use controller::{ConcurrencyController, DispatchStrategy};
pub use core::{BatchOrchestrator, OrchestrationReport};
pub use error_classifier::{
    BackoffPolicy, FailureClassification, FailureClassifier, StandardFailureClassifier,
};
pub use executor::RemoteRequestExecutor;
pub use identity::assign_plot_ids;
pub use merger::{merge, MergedResult};
pub use partitioner::{partition, select};
pub use recovery::{RecoveryCoordinator, RecoveryDecision, RecoveryPolicy, RecoveryState};
