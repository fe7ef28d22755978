//! Result merger.
//!
//! Combines batch outcomes into one table keyed by `plot_id`. Merging never
//! fails: successful rows and failure reports are returned side by side so
//! callers can see exactly which records are missing and why. The result does
//! not depend on the order in which outcomes arrive.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use crate::models::{BatchFailure, BatchOutcome, FailureKind, PlotId, ResultRow};

/// Rows from every successful batch plus the failures of the others
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedResult {
    /// One row per plot id, ascending
    pub rows: Vec<ResultRow>,
    /// Failed batches, ascending by batch index
    pub failures: Vec<BatchFailure>,
}

impl MergedResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn plot_ids(&self) -> impl Iterator<Item = PlotId> + '_ {
        self.rows.iter().map(|row| row.plot_id)
    }

    /// Plot ids in `1..=total` without a row
    pub fn missing_plot_ids(&self, total: usize) -> Vec<PlotId> {
        let present: BTreeSet<PlotId> = self.plot_ids().collect();
        (1..=total as PlotId)
            .filter(|plot_id| !present.contains(plot_id))
            .collect()
    }

    pub fn structural_failures(&self) -> impl Iterator<Item = &BatchFailure> {
        self.failures
            .iter()
            .filter(|failure| failure.kind == FailureKind::Structural)
    }

    pub fn has_structural_failure(&self) -> bool {
        self.structural_failures().next().is_some()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold in the merged outcomes of re-run batches
    ///
    /// Failures of batches that were re-run are replaced by whatever the re-run
    /// produced. Rows already present are kept.
    pub fn absorb(&mut self, recovered: MergedResult) {
        let rerun: BTreeSet<usize> = recovered
            .failures
            .iter()
            .map(|failure| failure.batch_index)
            .chain(recovered.covered_batches(&self.failures))
            .collect();

        self.failures
            .retain(|failure| !rerun.contains(&failure.batch_index));
        self.failures.extend(recovered.failures);
        self.failures.sort_by_key(|failure| failure.batch_index);

        let mut rows: BTreeMap<PlotId, ResultRow> = self
            .rows
            .drain(..)
            .map(|row| (row.plot_id, row))
            .collect();
        for row in recovered.rows {
            rows.entry(row.plot_id).or_insert(row);
        }
        self.rows = rows.into_values().collect();
    }

    /// Indices of `failures` whose plot id range now has rows in `self`
    fn covered_batches<'a>(
        &'a self,
        failures: &'a [BatchFailure],
    ) -> impl Iterator<Item = usize> + 'a {
        failures
            .iter()
            .filter(|failure| {
                self.rows
                    .iter()
                    .any(|row| failure.plot_ids.contains(row.plot_id))
            })
            .map(|failure| failure.batch_index)
    }
}

/// Merge batch outcomes in any order into one deterministic result
pub fn merge(outcomes: impl IntoIterator<Item = BatchOutcome>) -> MergedResult {
    let mut outcomes: Vec<BatchOutcome> = outcomes.into_iter().collect();
    outcomes.sort_by_key(BatchOutcome::batch_index);

    let mut rows: BTreeMap<PlotId, ResultRow> = BTreeMap::new();
    let mut failures = Vec::new();

    for outcome in outcomes {
        match outcome {
            BatchOutcome::Success(success) => {
                for row in success.rows {
                    if rows.contains_key(&row.plot_id) {
                        warn!(
                            plot_id = row.plot_id,
                            batch_index = success.batch_index,
                            "Duplicate plot_id across batches; keeping the earlier batch's row"
                        );
                        continue;
                    }
                    rows.insert(row.plot_id, row);
                }
            }
            BatchOutcome::Failure(failure) => failures.push(failure),
        }
    }

    failures.sort_by_key(|failure| failure.batch_index);

    MergedResult {
        rows: rows.into_values().collect(),
        failures,
    }
}
