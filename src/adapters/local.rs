//! Local geometry sources.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{PlotStatsError, Result};
use crate::models::{Geometry, RawRecord};

/// Loads a geometry collection held on the caller's side
#[async_trait]
pub trait LocalGeometrySource: Send + Sync {
    fn source_name(&self) -> &'static str;

    /// Records in the order they should receive plot ids
    async fn load(&self) -> Result<Vec<RawRecord>>;
}

/// Records already in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<RawRecord>,
}

impl InMemorySource {
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl LocalGeometrySource for InMemorySource {
    fn source_name(&self) -> &'static str {
        "in_memory"
    }

    async fn load(&self) -> Result<Vec<RawRecord>> {
        for (index, record) in self.records.iter().enumerate() {
            record
                .geometry
                .validate()
                .map_err(|e| invalid_feature(index, &e.to_string()))?;
        }
        Ok(self.records.clone())
    }
}

/// A GeoJSON `FeatureCollection` file of polygonal features
#[derive(Debug, Clone)]
pub struct GeoJsonFileSource {
    path: PathBuf,
    id_property: Option<String>,
}

impl GeoJsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_property: None,
        }
    }

    /// Take each feature's external id from this property instead of the feature `id`
    pub fn with_id_property(mut self, property: impl Into<String>) -> Self {
        self.id_property = Some(property.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl LocalGeometrySource for GeoJsonFileSource {
    fn source_name(&self) -> &'static str {
        "geojson_file"
    }

    async fn load(&self) -> Result<Vec<RawRecord>> {
        let contents = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            PlotStatsError::source_error(
                self.source_name(),
                format!("cannot read {}: {e}", self.path.display()),
            )
        })?;
        let collection: Value = serde_json::from_str(&contents)?;
        let records = parse_feature_collection(&collection, self.id_property.as_deref())?;

        info!(
            path = %self.path.display(),
            record_count = records.len(),
            "Loaded GeoJSON features"
        );
        Ok(records)
    }
}

/// Convert a GeoJSON `FeatureCollection` into raw records, in feature order
///
/// Non-polygonal or invalid geometries are rejected with `InvalidInput`.
pub fn parse_feature_collection(
    collection: &Value,
    id_property: Option<&str>,
) -> Result<Vec<RawRecord>> {
    if collection.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
        return Err(PlotStatsError::InvalidInput(
            "expected a GeoJSON FeatureCollection".to_string(),
        ));
    }

    let features = collection
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            PlotStatsError::InvalidInput("FeatureCollection has no features array".to_string())
        })?;

    features
        .iter()
        .enumerate()
        .map(|(index, feature)| parse_feature(index, feature, id_property))
        .collect()
}

fn parse_feature(index: usize, feature: &Value, id_property: Option<&str>) -> Result<RawRecord> {
    let geometry_value = feature
        .get("geometry")
        .filter(|g| !g.is_null())
        .ok_or_else(|| invalid_feature(index, "missing geometry"))?;

    let geometry: Geometry = serde_json::from_value(geometry_value.clone()).map_err(|_| {
        let kind = geometry_value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        invalid_feature(index, &format!("unsupported geometry type {kind}"))
    })?;
    geometry
        .validate()
        .map_err(|e| invalid_feature(index, &e.to_string()))?;

    let properties: Map<String, Value> = feature
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let id_value = match id_property {
        Some(property) => properties.get(property),
        None => feature.get("id"),
    };
    let external_id = id_value.and_then(|value| match value {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    });

    Ok(RawRecord {
        geometry,
        external_id,
        properties,
    })
}

fn invalid_feature(index: usize, reason: &str) -> PlotStatsError {
    PlotStatsError::InvalidInput(format!("feature {index}: {reason}"))
}
