mod common;

use std::collections::BTreeMap;

use common::*;
use plotstats_core::config::{AreaUnit, FormatConfig, ValueUnit};
use plotstats_core::models::{PlotId, ResultRow};
use plotstats_core::orchestration::{merge, partition, MergedResult};
use plotstats_core::postprocess::{
    postprocess, LocalMetadata, PostprocessOptions, StaticAdminLookup,
};
use proptest::prelude::*;
use serde_json::Value;

fn clean_run(record_count: usize, batch_size: usize, max_concurrent: usize) -> MergedResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let orchestrator = orchestrator(
            MockRemoteClient::new().into_arc(),
            MockDefinitionBuilder::new().into_arc(),
            &fast_config(batch_size, max_concurrent),
        );
        orchestrator
            .run(records(record_count), &layers(&["forest", "cropland"]))
            .await
            .unwrap()
            .merged
    })
}

proptest! {
    /// Property: batches are contiguous, ordered, bounded and cover every record once
    #[test]
    fn partition_covers_every_record_exactly_once(
        record_count in record_count_strategy(),
        batch_size in batch_size_strategy(),
    ) {
        let batches = partition(records(record_count), batch_size).unwrap();

        prop_assert_eq!(batches.len(), record_count.div_ceil(batch_size));
        let mut expected_next: PlotId = 1;
        for (index, batch) in batches.iter().enumerate() {
            prop_assert_eq!(batch.index(), index);
            prop_assert!(!batch.is_empty() && batch.len() <= batch_size);
            for plot_id in batch.plot_ids() {
                prop_assert_eq!(plot_id, expected_next);
                expected_next += 1;
            }
        }
        prop_assert_eq!(expected_next - 1, record_count as PlotId);
    }

    /// Property: merging does not depend on completion order
    #[test]
    fn merge_is_independent_of_completion_order(
        (outcomes, shuffled) in outcomes_strategy()
            .prop_flat_map(|outcomes| (Just(outcomes.clone()), Just(outcomes).prop_shuffle())),
    ) {
        let merged = merge(outcomes.clone());
        prop_assert_eq!(&merged, &merge(shuffled));

        let ids: Vec<PlotId> = merged.plot_ids().collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        sorted.dedup();
        prop_assert_eq!(ids, sorted);

        let failed = outcomes.iter().filter(|outcome| !outcome.is_success()).count();
        prop_assert_eq!(merged.failures.len(), failed);
    }

    /// Property: rows plus failed ranges account for every plot id
    #[test]
    fn merged_rows_and_failures_partition_the_plot_ids(outcomes in outcomes_strategy()) {
        let total: usize = outcomes.iter().map(|outcome| outcome.plot_ids().len()).sum();
        let merged = merge(outcomes);

        let failed: usize = merged.failures.iter().map(|failure| failure.plot_ids.len()).sum();
        prop_assert_eq!(merged.row_count() + failed, total);
        prop_assert_eq!(merged.missing_plot_ids(total).len(), failed);
    }

    /// Property: formatting rounds and converts but never drops rows or columns
    #[test]
    fn formatting_never_drops_rows_or_columns(
        areas in prop::collection::vec((0.0f64..5_000.0, 0.0f64..1.0), 0..40),
        decimal_places in 0u32..6,
        percent in any::<bool>(),
    ) {
        let rows: Vec<ResultRow> = areas
            .iter()
            .enumerate()
            .map(|(index, (area, share))| {
                ResultRow::new(index as PlotId + 1)
                    .with_value("area", *area)
                    .with_value("forest", area * share)
            })
            .collect();
        let row_count = rows.len();

        let mut options = PostprocessOptions::default();
        options.format = FormatConfig {
            decimal_places,
            area_unit: AreaUnit::SquareKilometers,
            value_unit: if percent { ValueUnit::Percent } else { ValueUnit::Absolute },
            area_columns: vec!["forest".to_string()],
            ..FormatConfig::default()
        };

        let enriched = postprocess(
            MergedResult { rows, failures: Vec::new() },
            &LocalMetadata::new(),
            &StaticAdminLookup::new(),
            &options,
        );

        prop_assert_eq!(enriched.row_count(), row_count);
        for row in &enriched.rows {
            prop_assert!(row.values.contains_key("area"));
            prop_assert!(row.values.contains_key("forest"));
            if percent {
                if let Some(share) = row.values["forest"].as_f64() {
                    prop_assert!((0.0..=100.0).contains(&share));
                }
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: batch size and concurrency never change a clean run's result
    #[test]
    fn clean_runs_are_independent_of_batching(
        record_count in 1usize..120,
        batch_size in 1usize..40,
        max_concurrent in 1usize..6,
    ) {
        let baseline = clean_run(record_count, record_count, 1);
        let varied = clean_run(record_count, batch_size, max_concurrent);

        prop_assert!(varied.is_complete());
        prop_assert_eq!(varied, baseline);
    }
}

#[test]
fn test_formatted_values_are_finite_or_null() {
    let mut values: BTreeMap<String, Value> = BTreeMap::new();
    values.insert("area".to_string(), Value::from(0.0));
    values.insert("forest".to_string(), Value::from(12.5));

    let format = FormatConfig {
        value_unit: ValueUnit::Percent,
        area_columns: vec!["forest".to_string()],
        ..FormatConfig::default()
    };
    plotstats_core::postprocess::format_values(&mut values, &format);

    assert_eq!(values["forest"], Value::Null);
    assert_eq!(values["area"], Value::from(0.0));
}
