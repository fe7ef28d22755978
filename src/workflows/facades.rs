use std::sync::Arc;
use tracing::{info, instrument};

use crate::adapters::{
    to_feature_collection, LocalGeometrySource, RemoteCollectionAdapter, RemoteCollectionHandle,
};
use crate::error::Result;
use crate::models::{RawRecord, Record};
use crate::orchestration::{assign_plot_ids, BatchOrchestrator};
use crate::postprocess::{postprocess, PostprocessOptions};
use crate::workflows::{
    validate_options, LocalWorkflowReport, RemoteWorkflowReport, RunStatistics, WorkflowContext,
    WorkflowOptions,
};

/// Local geometry in, local table out
#[instrument(skip_all, fields(source = source.source_name()))]
pub async fn local_to_local(
    context: &WorkflowContext,
    source: &dyn LocalGeometrySource,
    options: &WorkflowOptions,
) -> Result<LocalWorkflowReport> {
    validate_options(options)?;
    let raw = source.load().await?;
    let (report, _) = run_pipeline(context, raw, options).await?;
    Ok(report)
}

/// Remote collection in, local table out
#[instrument(skip_all, fields(adapter = adapter.adapter_name(), collection = %handle))]
pub async fn remote_to_local(
    context: &WorkflowContext,
    adapter: &dyn RemoteCollectionAdapter,
    handle: &RemoteCollectionHandle,
    options: &WorkflowOptions,
) -> Result<LocalWorkflowReport> {
    validate_options(options)?;
    let raw = adapter.fetch(handle).await?;
    let (report, _) = run_pipeline(context, raw, options).await?;
    Ok(report)
}

/// Remote collection in, remote collection out
///
/// Runs the local-out pipeline and publishes the resulting table, with each
/// row's geometry, as a new collection.
#[instrument(skip_all, fields(adapter = adapter.adapter_name(), collection = %handle))]
pub async fn remote_to_remote(
    context: &WorkflowContext,
    adapter: &dyn RemoteCollectionAdapter,
    handle: &RemoteCollectionHandle,
    options: &WorkflowOptions,
) -> Result<RemoteWorkflowReport> {
    validate_options(options)?;
    let raw = adapter.fetch(handle).await?;
    let (report, records) = run_pipeline(context, raw, options).await?;

    let collection = to_feature_collection(&records, &report.table)?;
    let published = adapter.publish(collection).await?;
    info!(published = %published, rows = report.table.len(), "Results published");

    Ok(RemoteWorkflowReport {
        handle: published,
        failures: report.failures,
        statistics: report.statistics,
    })
}

/// Identity assignment, orchestration and postprocessing shared by all facades
async fn run_pipeline(
    context: &WorkflowContext,
    raw: Vec<RawRecord>,
    options: &WorkflowOptions,
) -> Result<(LocalWorkflowReport, Arc<[Record]>)> {
    let lookup = context.lookup.snapshot()?;
    let records: Arc<[Record]> = assign_plot_ids(raw).into();

    let orchestrator = BatchOrchestrator::new(
        context.client.clone(),
        context.definitions.clone(),
        &options.config,
    )?;
    let report = orchestrator.run(records.clone(), &options.definition).await?;
    let statistics = RunStatistics::from_report(&report);

    let metadata = context.metadata_extractor.extract(&records);
    let enriched = postprocess(
        report.merged,
        &metadata,
        lookup.as_ref(),
        &PostprocessOptions::from_config(&options.config),
    );

    let report = LocalWorkflowReport {
        table: enriched.to_table(),
        failures: enriched.failures,
        statistics,
    };
    Ok((report, records))
}
