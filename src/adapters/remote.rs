//! Remote collection adapters.
//!
//! A remote collection is a feature collection stored on the remote service's
//! side and referenced by a handle. Input collections are converted to local
//! records once; output tables are converted back into a feature collection
//! and published.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::adapters::local::parse_feature_collection;
use crate::constants::columns;
use crate::error::{PlotStatsError, Result};
use crate::models::{PlotId, RawRecord, Record};
use crate::postprocess::ResultTable;

/// Reference to a collection held by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteCollectionHandle {
    pub asset_id: String,
}

impl RemoteCollectionHandle {
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
        }
    }
}

impl fmt::Display for RemoteCollectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.asset_id)
    }
}

/// Reads and writes remote feature collections
#[async_trait]
pub trait RemoteCollectionAdapter: Send + Sync {
    fn adapter_name(&self) -> &'static str;

    /// Download a collection as local records, in the collection's order
    async fn fetch(&self, handle: &RemoteCollectionHandle) -> Result<Vec<RawRecord>>;

    /// Store a GeoJSON `FeatureCollection` and return its handle
    async fn publish(&self, feature_collection: Value) -> Result<RemoteCollectionHandle>;
}

/// Process-local collection store backed by a concurrent map
#[derive(Debug, Default)]
pub struct InMemoryCollectionStore {
    collections: DashMap<String, Value>,
    next_id: AtomicU64,
    id_property: Option<String>,
}

impl InMemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read external ids from this feature property on fetch
    pub fn with_id_property(mut self, property: impl Into<String>) -> Self {
        self.id_property = Some(property.into());
        self
    }

    /// Store a collection under a caller-chosen asset id
    pub fn insert(
        &self,
        asset_id: impl Into<String>,
        feature_collection: Value,
    ) -> RemoteCollectionHandle {
        let handle = RemoteCollectionHandle::new(asset_id);
        self.collections
            .insert(handle.asset_id.clone(), feature_collection);
        handle
    }

    pub fn get(&self, handle: &RemoteCollectionHandle) -> Option<Value> {
        self.collections
            .get(&handle.asset_id)
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

#[async_trait]
impl RemoteCollectionAdapter for InMemoryCollectionStore {
    fn adapter_name(&self) -> &'static str {
        "in_memory_collections"
    }

    async fn fetch(&self, handle: &RemoteCollectionHandle) -> Result<Vec<RawRecord>> {
        let collection = self.get(handle).ok_or_else(|| {
            PlotStatsError::source_error(
                self.adapter_name(),
                format!("unknown collection {handle}"),
            )
        })?;
        parse_feature_collection(&collection, self.id_property.as_deref())
    }

    async fn publish(&self, feature_collection: Value) -> Result<RemoteCollectionHandle> {
        let sequence = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = self.insert(format!("published/{sequence}"), feature_collection);
        debug!(asset_id = %handle, "Collection published");
        Ok(handle)
    }
}

/// Build a GeoJSON `FeatureCollection` of the table rows with their geometries
///
/// Each table row becomes one feature whose properties are the row's columns.
/// Rows whose `plot_id` has no matching record are an error.
pub fn to_feature_collection(records: &[Record], table: &ResultTable) -> Result<Value> {
    let plot_id_column = table.column_index(columns::PLOT_ID).ok_or_else(|| {
        PlotStatsError::ValidationError("result table has no plot_id column".to_string())
    })?;
    let geometries: HashMap<PlotId, &Record> = records
        .iter()
        .map(|record| (record.plot_id, record))
        .collect();

    let features = table
        .rows
        .iter()
        .map(|row| -> Result<Value> {
            let plot_id = row[plot_id_column].as_u64().ok_or_else(|| {
                PlotStatsError::ValidationError("plot_id is not an integer".to_string())
            })?;
            let record = geometries.get(&plot_id).ok_or_else(|| {
                PlotStatsError::ValidationError(format!("no record for plot_id {plot_id}"))
            })?;
            let properties: Map<String, Value> = table
                .columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect();

            Ok(json!({
                "type": "Feature",
                "id": plot_id,
                "geometry": serde_json::to_value(&record.geometry)?,
                "properties": properties,
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}
