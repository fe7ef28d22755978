//! Record identifier assignment.
//!
//! Every record receives `plot_id = 1..N` in caller order before any batching
//! happens. External identifiers ride along but are never used as keys, since
//! callers do not guarantee them to be unique or dense.

use std::collections::HashSet;
use tracing::{debug, warn};

use crate::models::{PlotId, RawRecord, Record};

/// Assign dense plot ids in input order
pub fn assign_plot_ids(raw_records: Vec<RawRecord>) -> Vec<Record> {
    let records: Vec<Record> = raw_records
        .into_iter()
        .zip(1..)
        .map(|(raw, plot_id): (RawRecord, PlotId)| Record {
            plot_id,
            external_id: raw.external_id,
            geometry: raw.geometry,
            properties: raw.properties,
        })
        .collect();

    let duplicates = count_duplicate_external_ids(&records);
    if duplicates > 0 {
        warn!(
            duplicates,
            record_count = records.len(),
            "External ids are not unique; results are keyed by plot_id only"
        );
    }

    debug!(record_count = records.len(), "Assigned plot ids");
    records
}

fn count_duplicate_external_ids(records: &[Record]) -> usize {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter_map(|record| record.external_id.as_deref())
        .filter(|external_id| !seen.insert(*external_id))
        .count()
}
