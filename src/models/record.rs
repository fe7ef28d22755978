use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::geometry::Geometry;

/// Dense run-local identity, assigned 1..N in input order
pub type PlotId = u64;

/// Inclusive range of plot ids covered by one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlotIdRange {
    pub first: PlotId,
    pub last: PlotId,
}

impl PlotIdRange {
    pub fn new(first: PlotId, last: PlotId) -> Self {
        debug_assert!(first <= last, "plot id range must be ordered");
        Self { first, last }
    }

    pub fn contains(&self, plot_id: PlotId) -> bool {
        (self.first..=self.last).contains(&plot_id)
    }

    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = PlotId> {
        self.first..=self.last
    }
}

impl fmt::Display for PlotIdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.first, self.last)
    }
}

/// An input geometry before identity assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub geometry: Geometry,
    /// Caller-supplied identifier; carried along but never used as a key
    #[serde(default)]
    pub external_id: Option<String>,
    /// Remaining caller attributes, passed through untouched
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl RawRecord {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            external_id: None,
            properties: Map::new(),
        }
    }

    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }
}

/// An identified, immutable input record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub plot_id: PlotId,
    pub external_id: Option<String>,
    pub geometry: Geometry,
    pub properties: Map<String, Value>,
}
