#![allow(clippy::doc_markdown)] // Allow technical terms like GeoJSON, WGS84 in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # PlotStats Core
//!
//! Batch orchestration engine for computing per-plot statistics through an
//! external, rate-limited statistical-computation service.
//!
//! ## Overview
//!
//! The statistics themselves are owned by the remote service. This crate owns
//! everything around them: assigning stable identities to input geometries,
//! partitioning them into batches, dispatching those batches under bounded
//! concurrency, retrying transient failures, recovering once from structural
//! definition failures, and reassembling a single deterministic table.
//!
//! ## Architecture
//!
//! ```text
//! adapters ─▶ identity ─▶ partitioner ─▶ controller ─▶ executor ─▶ remote client
//!                                             │
//!                          merger ◀───────────┘
//!                            │
//!                          recovery (at most one strict re-run)
//!                            │
//!                          postprocess ─▶ ResultTable / published collection
//! ```
//!
//! ## Module Organization
//!
//! - [`models`] - Records, batches and batch outcomes
//! - [`client`] - Remote computation client and definition builder seams
//! - [`orchestration`] - Partitioning, dispatch, retry, merge and recovery
//! - [`postprocess`] - Metadata join, region lookup and formatting
//! - [`adapters`] - Local and remote geometry sources
//! - [`workflows`] - The three caller-facing facades
//! - [`cache`] - Fingerprinted caches for external assets
//! - [`config`] - Layered YAML and environment configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Setup error types
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use plotstats_core::adapters::GeoJsonFileSource;
//! use plotstats_core::client::{DefinitionBuilder, DefinitionCache, RemoteComputationClient};
//! use plotstats_core::workflows::{local_to_local, WorkflowContext, WorkflowOptions};
//! use std::sync::Arc;
//!
//! # async fn example(
//! #     client: Arc<dyn RemoteComputationClient>,
//! #     builder: Arc<dyn DefinitionBuilder>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! plotstats_core::logging::init_structured_logging();
//!
//! let context = WorkflowContext::new(client, Arc::new(DefinitionCache::new(builder)));
//! let options = WorkflowOptions::default().with_batch_size(50).with_max_concurrent(4);
//! let source = GeoJsonFileSource::new("plots.geojson");
//!
//! let report = local_to_local(&context, &source, &options).await?;
//! println!("{} rows, {} failed batches", report.table.len(), report.failures.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, scenario and property tests
//! ```

pub mod adapters;
pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod postprocess;
pub mod workflows;

pub use client::{
    ComputationDefinition, DefinitionBuilder, DefinitionCache, DefinitionOptions,
    RemoteComputationClient, RemoteError,
};
pub use config::{ConfigManager, PlotStatsConfig};
pub use error::{PlotStatsError, Result};
pub use models::{
    Batch, BatchFailure, BatchOutcome, FailureKind, Geometry, PlotId, PlotIdRange, RawRecord,
    Record, ResultRow,
};
pub use orchestration::{
    BatchOrchestrator, MergedResult, OrchestrationReport, RecoveryPolicy, RecoveryState,
};
pub use postprocess::{EnrichedResult, ResultTable};
pub use workflows::{
    local_to_local, remote_to_local, remote_to_remote, LocalWorkflowReport, RemoteWorkflowReport,
    WorkflowContext, WorkflowOptions,
};
