use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;
use std::sync::Arc;

use plotstats_core::config::{FormatConfig, ValueUnit};
use plotstats_core::models::{
    BatchOutcome, BatchSuccess, Geometry, PlotIdRange, RawRecord, Record, ResultRow,
};
use plotstats_core::orchestration::{assign_plot_ids, merge, partition};
use plotstats_core::postprocess::format_values;

fn records(n: usize) -> Arc<[Record]> {
    let raw = (0..n)
        .map(|i| {
            let lon = (i % 100) as f64 * 0.01;
            let lat = (i / 100) as f64 * 0.01;
            RawRecord::new(Geometry::Polygon(vec![vec![
                [lon, lat],
                [lon + 0.001, lat],
                [lon + 0.001, lat + 0.001],
                [lon, lat],
            ]]))
        })
        .collect();
    assign_plot_ids(raw).into()
}

fn outcomes(batch_count: u64, batch_size: u64) -> Vec<BatchOutcome> {
    (0..batch_count)
        .rev()
        .map(|index| {
            let plot_ids = PlotIdRange::new(index * batch_size + 1, (index + 1) * batch_size);
            BatchOutcome::Success(BatchSuccess {
                batch_index: index as usize,
                plot_ids,
                rows: plot_ids
                    .iter()
                    .map(|id| ResultRow::new(id).with_value("area", id as f64 * 0.5))
                    .collect(),
                attempts: 1,
            })
        })
        .collect()
}

fn benchmark_partition(c: &mut Criterion) {
    let records = records(10_000);
    c.bench_function("partition_10k_by_25", |b| {
        b.iter(|| partition(black_box(records.clone()), 25))
    });
}

fn benchmark_merge(c: &mut Criterion) {
    let outcomes = outcomes(400, 25);
    c.bench_function("merge_400_batches", |b| {
        b.iter(|| merge(black_box(outcomes.clone())))
    });
}

fn benchmark_format(c: &mut Criterion) {
    let format = FormatConfig {
        value_unit: ValueUnit::Percent,
        area_columns: vec!["forest".to_string(), "cropland".to_string()],
        ..FormatConfig::default()
    };
    let mut values = BTreeMap::new();
    values.insert("area".to_string(), 12.345_678.into());
    values.insert("forest".to_string(), 3.21.into());
    values.insert("cropland".to_string(), 1.5.into());

    c.bench_function("format_row", |b| {
        b.iter(|| {
            let mut row = values.clone();
            format_values(black_box(&mut row), &format);
            row
        })
    });
}

criterion_group!(benches, benchmark_partition, benchmark_merge, benchmark_format);
criterion_main!(benches);
