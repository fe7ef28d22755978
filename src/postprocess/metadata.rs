//! Local per-record metadata computed without any remote call.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

use crate::constants::columns;
use crate::models::{PlotId, Record};

/// Metadata values for one record, keyed by column name
pub type MetadataRow = BTreeMap<String, Value>;

/// Metadata for a whole run, keyed by `plot_id`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalMetadata {
    rows: HashMap<PlotId, MetadataRow>,
}

impl LocalMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, plot_id: PlotId, row: MetadataRow) {
        self.rows.insert(plot_id, row);
    }

    pub fn get(&self, plot_id: PlotId) -> Option<&MetadataRow> {
        self.rows.get(&plot_id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<(PlotId, MetadataRow)> for LocalMetadata {
    fn from_iter<I: IntoIterator<Item = (PlotId, MetadataRow)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Computes lightweight per-record attributes from the input records
pub trait LocalMetadataExtractor: Send + Sync {
    fn extractor_name(&self) -> &'static str;

    fn extract(&self, records: &[Record]) -> LocalMetadata;
}

/// Geometry-derived attributes: external id, geometry type, centroid,
/// vertex count and approximate area in hectares
///
/// Caller properties listed in `passthrough` are copied as extra columns.
#[derive(Debug, Clone, Default)]
pub struct GeometryMetadataExtractor {
    passthrough: Vec<String>,
}

impl GeometryMetadataExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_passthrough(mut self, properties: Vec<String>) -> Self {
        self.passthrough = properties;
        self
    }

    fn row_for(&self, record: &Record) -> MetadataRow {
        let geometry = &record.geometry;
        let centroid = geometry.centroid();

        let mut row = MetadataRow::new();
        row.insert(
            columns::EXTERNAL_ID.to_string(),
            record
                .external_id
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        row.insert(
            columns::GEOMETRY_TYPE.to_string(),
            Value::String(geometry.kind().to_string()),
        );
        row.insert(
            columns::CENTROID_LON.to_string(),
            float_or_null(centroid.map(|[lon, _]| lon)),
        );
        row.insert(
            columns::CENTROID_LAT.to_string(),
            float_or_null(centroid.map(|[_, lat]| lat)),
        );
        row.insert(
            columns::VERTEX_COUNT.to_string(),
            Value::from(geometry.vertex_count() as u64),
        );
        row.insert(
            columns::GEOMETRY_AREA_HA.to_string(),
            float_or_null(Some(geometry.approximate_area_hectares())),
        );

        for property in &self.passthrough {
            row.insert(
                property.clone(),
                lookup_property(&record.properties, property),
            );
        }
        row
    }
}

impl LocalMetadataExtractor for GeometryMetadataExtractor {
    fn extractor_name(&self) -> &'static str {
        "GeometryMetadataExtractor"
    }

    fn extract(&self, records: &[Record]) -> LocalMetadata {
        records
            .iter()
            .map(|record| (record.plot_id, self.row_for(record)))
            .collect()
    }
}

fn float_or_null(value: Option<f64>) -> Value {
    value
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn lookup_property(properties: &Map<String, Value>, name: &str) -> Value {
    properties.get(name).cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::geometry::tests::square;
    use crate::models::RawRecord;
    use crate::orchestration::identity::assign_plot_ids;

    #[test]
    fn test_geometry_metadata_columns() {
        let mut raw = RawRecord::new(square(10.0, 20.0, 0.01)).with_external_id("field-7");
        raw.properties
            .insert("owner".to_string(), Value::String("coop".to_string()));
        let records = assign_plot_ids(vec![raw, RawRecord::new(square(0.0, 0.0, 0.01))]);

        let metadata = GeometryMetadataExtractor::new()
            .with_passthrough(vec!["owner".to_string()])
            .extract(&records);

        assert_eq!(metadata.len(), 2);
        let first = metadata.get(1).unwrap();
        assert_eq!(first[columns::EXTERNAL_ID], Value::String("field-7".to_string()));
        assert_eq!(first[columns::GEOMETRY_TYPE], Value::String("Polygon".to_string()));
        let lon = first[columns::CENTROID_LON].as_f64().unwrap();
        assert!((lon - 10.005).abs() < 1e-6);
        assert!(first[columns::GEOMETRY_AREA_HA].as_f64().unwrap() > 0.0);
        assert_eq!(first["owner"], Value::String("coop".to_string()));

        let second = metadata.get(2).unwrap();
        assert_eq!(second[columns::EXTERNAL_ID], Value::Null);
        assert_eq!(second["owner"], Value::Null);
    }
}
