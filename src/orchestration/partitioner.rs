//! Batch partitioner.
//!
//! Splits the identified records into `ceil(N / batch_size)` contiguous,
//! non-overlapping batches in input order. Batch size only changes call
//! granularity, never result content.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{PlotStatsError, Result};
use crate::models::{Batch, Record};

pub fn partition(records: Arc<[Record]>, batch_size: usize) -> Result<Vec<Batch>> {
    if batch_size == 0 {
        return Err(PlotStatsError::InvalidInput(
            "batch_size must be greater than 0".to_string(),
        ));
    }

    let total = records.len();
    let batches = (0..total)
        .step_by(batch_size)
        .enumerate()
        .map(|(index, start)| {
            let end = (start + batch_size).min(total);
            Batch::new(index, records.clone(), start..end)
        })
        .collect();

    Ok(batches)
}

/// Keep only the batches whose index is listed, preserving batch order
pub fn select(batches: &[Batch], indices: &[usize]) -> Vec<Batch> {
    let wanted: BTreeSet<usize> = indices.iter().copied().collect();
    batches
        .iter()
        .filter(|batch| wanted.contains(&batch.index()))
        .cloned()
        .collect()
}
