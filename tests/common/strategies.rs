use proptest::prelude::*;

use plotstats_core::models::{
    BatchFailure, BatchOutcome, BatchSuccess, FailureKind, PlotIdRange, ResultRow,
};

/// Strategy for record counts, including the empty input
pub fn record_count_strategy() -> impl Strategy<Value = usize> {
    0usize..400
}

pub fn batch_size_strategy() -> impl Strategy<Value = usize> {
    1usize..120
}

pub fn failure_kind_strategy() -> impl Strategy<Value = FailureKind> {
    prop_oneof![
        Just(FailureKind::Retryable),
        Just(FailureKind::Structural),
        Just(FailureKind::Fatal),
    ]
}

/// Outcomes for a contiguous run of `batch_count` batches of `batch_size`
/// records; each batch independently succeeds or fails
pub fn outcomes_strategy() -> impl Strategy<Value = Vec<BatchOutcome>> {
    (1usize..20, 1u64..15).prop_flat_map(|(batch_count, batch_size)| {
        prop::collection::vec(prop::option::of(failure_kind_strategy()), batch_count).prop_map(
            move |fates| {
                fates
                    .into_iter()
                    .enumerate()
                    .map(|(batch_index, fate)| {
                        let first = batch_index as u64 * batch_size + 1;
                        let plot_ids = PlotIdRange::new(first, first + batch_size - 1);
                        match fate {
                            None => BatchOutcome::Success(BatchSuccess {
                                batch_index,
                                plot_ids,
                                rows: plot_ids
                                    .iter()
                                    .map(|id| ResultRow::new(id).with_value("area", id as f64))
                                    .collect(),
                                attempts: 1,
                            }),
                            Some(kind) => BatchOutcome::Failure(BatchFailure {
                                batch_index,
                                plot_ids,
                                kind,
                                message: format!("{kind} failure"),
                                attempts: 1,
                            }),
                        }
                    })
                    .collect()
            },
        )
    })
}
