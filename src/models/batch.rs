use std::ops::Range;
use std::sync::Arc;

use super::record::{PlotId, PlotIdRange, Record};

/// A contiguous, ordered window into the shared record set
///
/// Batches never copy records; they borrow a range of the run's `Arc<[Record]>`,
/// so re-running a batch during recovery sees exactly the same input.
#[derive(Debug, Clone)]
pub struct Batch {
    index: usize,
    records: Arc<[Record]>,
    range: Range<usize>,
}

impl Batch {
    pub(crate) fn new(index: usize, records: Arc<[Record]>, range: Range<usize>) -> Self {
        debug_assert!(range.end <= records.len());
        debug_assert!(!range.is_empty(), "batches are never empty");
        Self {
            index,
            records,
            range,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn records(&self) -> &[Record] {
        &self.records[self.range.clone()]
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn plot_ids(&self) -> impl Iterator<Item = PlotId> + '_ {
        self.records().iter().map(|record| record.plot_id)
    }

    /// Plot ids covered by this batch; contiguous because ids are dense
    pub fn plot_id_range(&self) -> PlotIdRange {
        let records = self.records();
        PlotIdRange::new(records[0].plot_id, records[records.len() - 1].plot_id)
    }
}
