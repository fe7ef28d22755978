#![allow(dead_code)]

pub mod mock_client;
pub mod strategies;

pub use mock_client::*;
pub use strategies::*;

use std::sync::Arc;

use plotstats_core::client::{DefinitionCache, DefinitionOptions};
use plotstats_core::models::{Geometry, RawRecord, Record};
use plotstats_core::orchestration::{assign_plot_ids, BatchOrchestrator};
use plotstats_core::PlotStatsConfig;

/// Small square plot near the equator, offset by `index`
pub fn plot_geometry(index: usize) -> Geometry {
    let lon = (index % 100) as f64 * 0.01;
    let lat = (index / 100) as f64 * 0.01;
    let size = 0.001;
    Geometry::Polygon(vec![vec![
        [lon, lat],
        [lon + size, lat],
        [lon + size, lat + size],
        [lon, lat + size],
        [lon, lat],
    ]])
}

pub fn raw_records(n: usize) -> Vec<RawRecord> {
    (0..n)
        .map(|i| RawRecord::new(plot_geometry(i)).with_external_id(format!("plot-{i}")))
        .collect()
}

pub fn records(n: usize) -> Arc<[Record]> {
    assign_plot_ids(raw_records(n)).into()
}

/// Configuration with millisecond retries so failure scenarios run fast
pub fn fast_config(batch_size: usize, max_concurrent: usize) -> PlotStatsConfig {
    let mut config = PlotStatsConfig::default();
    config.batching.batch_size = batch_size;
    config.batching.max_concurrent = max_concurrent;
    config.retry.max_retries = 3;
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config.retry.jitter_factor = 0.0;
    config.execution.request_timeout_seconds = 5;
    config
}

pub fn orchestrator(
    client: Arc<MockRemoteClient>,
    builder: Arc<MockDefinitionBuilder>,
    config: &PlotStatsConfig,
) -> BatchOrchestrator {
    BatchOrchestrator::new(client, Arc::new(DefinitionCache::new(builder)), config)
        .expect("valid test configuration")
}

pub fn layers(names: &[&str]) -> DefinitionOptions {
    DefinitionOptions {
        layers: names.iter().map(|name| name.to_string()).collect(),
        national_codes: Vec::new(),
    }
}
