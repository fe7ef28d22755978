use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::record::{PlotId, PlotIdRange};

/// One record's statistics as returned by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub plot_id: PlotId,
    pub values: BTreeMap<String, Value>,
}

impl ResultRow {
    pub fn new(plot_id: PlotId) -> Self {
        Self {
            plot_id,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        self.values.get(column).and_then(Value::as_f64)
    }
}

/// How a batch failure should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transient condition; retried locally and only reported once retries run out
    Retryable,
    /// The computation definition cannot serve the request
    Structural,
    /// Anything else; reported immediately without retry
    Fatal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Retryable => write!(f, "retryable"),
            FailureKind::Structural => write!(f, "structural"),
            FailureKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// A batch that returned one row per record
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSuccess {
    pub batch_index: usize,
    pub plot_ids: PlotIdRange,
    pub rows: Vec<ResultRow>,
    pub attempts: u32,
}

/// A batch that produced no rows, with enough context to identify the gap
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BatchFailure {
    pub batch_index: usize,
    pub plot_ids: PlotIdRange,
    pub kind: FailureKind,
    pub message: String,
    pub attempts: u32,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {} (plots {}) failed [{}] after {} attempt(s): {}",
            self.batch_index, self.plot_ids, self.kind, self.attempts, self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    Success(BatchSuccess),
    Failure(BatchFailure),
}

impl BatchOutcome {
    pub fn batch_index(&self) -> usize {
        match self {
            BatchOutcome::Success(success) => success.batch_index,
            BatchOutcome::Failure(failure) => failure.batch_index,
        }
    }

    pub fn plot_ids(&self) -> PlotIdRange {
        match self {
            BatchOutcome::Success(success) => success.plot_ids,
            BatchOutcome::Failure(failure) => failure.plot_ids,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchOutcome::Success(_))
    }

    pub fn failure(&self) -> Option<&BatchFailure> {
        match self {
            BatchOutcome::Failure(failure) => Some(failure),
            BatchOutcome::Success(_) => None,
        }
    }
}
