//! # Result Postprocessing
//!
//! Turns a `MergedResult` into the final caller-facing table in four steps,
//! each usable on its own:
//!
//! 1. [`join_metadata`]: left-join rows with local per-record metadata on `plot_id`
//! 2. [`resolve_admin_regions`]: add country, ISO3 and region names for region codes
//! 3. [`apply_formatting`]: unit conversion, percent expression, rounding
//! 4. [`sort_by_plot_id`]: stable sort of the final rows
//!
//! No step drops a row or fails on a missing lookup; unresolved enrichment
//! shows up as null columns. Statistics keep their names: a metadata or
//! enrichment column that collides with one is emitted under a `local_` or
//! `admin_` prefix instead.

pub mod admin_lookup;
pub mod format;
pub mod metadata;
pub mod table;

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::config::{FormatConfig, PlotStatsConfig};
use crate::constants::columns;
use crate::models::{BatchFailure, PlotId};
use crate::orchestration::merger::MergedResult;

pub use admin_lookup::{
    AdminLookup, AdminLookupProvider, AdminRegion, FixedLookup, LookupCache, StaticAdminLookup,
};
pub use format::{format_values, round_value};
pub use metadata::{GeometryMetadataExtractor, LocalMetadata, LocalMetadataExtractor, MetadataRow};
pub use table::ResultTable;

/// Settings for the whole postprocessing chain
#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessOptions {
    pub format: FormatConfig,
    /// Column carrying the administrative region code
    pub admin_code_column: String,
}

impl PostprocessOptions {
    pub fn from_config(config: &PlotStatsConfig) -> Self {
        Self {
            format: config.format.clone(),
            admin_code_column: config.postprocess.admin_code_column.clone(),
        }
    }
}

impl Default for PostprocessOptions {
    fn default() -> Self {
        Self::from_config(&PlotStatsConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRow {
    pub plot_id: PlotId,
    /// Locally computed attributes; empty when the record had none
    pub metadata: MetadataRow,
    /// Administrative enrichment columns, null when unresolved
    pub admin: BTreeMap<String, Value>,
    /// Statistics returned by the remote service
    pub values: BTreeMap<String, Value>,
}

impl EnrichedRow {
    /// Value of `column` from statistics, metadata or enrichment, in that order
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values
            .get(column)
            .or_else(|| self.metadata.get(column))
            .or_else(|| self.admin.get(column))
    }
}

/// Merged rows after postprocessing, with the run's failures carried along
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichedResult {
    pub rows: Vec<EnrichedRow>,
    pub failures: Vec<BatchFailure>,
}

impl EnrichedResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Flatten into a table
    ///
    /// Column order: `plot_id`, the known metadata and enrichment columns in
    /// their canonical order, then any remaining columns sorted by name.
    pub fn to_table(&self) -> ResultTable {
        let mut present: BTreeSet<&str> = BTreeSet::new();
        for row in &self.rows {
            present.extend(row.metadata.keys().map(String::as_str));
            present.extend(row.admin.keys().map(String::as_str));
            present.extend(row.values.keys().map(String::as_str));
        }
        present.remove(columns::PLOT_ID);

        let mut ordered: Vec<String> = vec![columns::PLOT_ID.to_string()];
        for column in columns::LEADING.iter().skip(1) {
            if present.remove(column) {
                ordered.push(column.to_string());
            }
        }
        ordered.extend(present.into_iter().map(str::to_string));

        let rows = self
            .rows
            .iter()
            .map(|row| {
                ordered
                    .iter()
                    .map(|column| {
                        if column == columns::PLOT_ID {
                            Value::from(row.plot_id)
                        } else {
                            row.get(column).cloned().unwrap_or(Value::Null)
                        }
                    })
                    .collect()
            })
            .collect();

        ResultTable {
            columns: ordered,
            rows,
        }
    }
}

/// Statistic column names present on any row
fn statistic_columns<'a>(
    rows: impl IntoIterator<Item = &'a BTreeMap<String, Value>>,
) -> BTreeSet<String> {
    rows.into_iter().flat_map(|values| values.keys().cloned()).collect()
}

/// Name for a local column, prefixed when a statistic already uses it
fn enrichment_column(prefix: &str, column: &str, statistics: &BTreeSet<String>) -> String {
    if statistics.contains(column) {
        format!("{prefix}{column}")
    } else {
        column.to_string()
    }
}

/// Left-join merged rows with local metadata; rows without metadata are kept
pub fn join_metadata(merged: MergedResult, metadata: &LocalMetadata) -> EnrichedResult {
    let statistics = statistic_columns(merged.rows.iter().map(|row| &row.values));
    let mut renamed: BTreeSet<String> = BTreeSet::new();

    let rows = merged
        .rows
        .into_iter()
        .map(|row| {
            let local: MetadataRow = metadata
                .get(row.plot_id)
                .map(|local| {
                    local
                        .iter()
                        .map(|(column, value)| {
                            let name =
                                enrichment_column(columns::LOCAL_PREFIX, column, &statistics);
                            if name != *column {
                                renamed.insert(column.clone());
                            }
                            (name, value.clone())
                        })
                        .collect()
                })
                .unwrap_or_default();

            EnrichedRow {
                plot_id: row.plot_id,
                metadata: local,
                admin: BTreeMap::new(),
                values: row.values,
            }
        })
        .collect();

    if !renamed.is_empty() {
        warn!(
            columns = ?renamed,
            prefix = columns::LOCAL_PREFIX,
            "Metadata columns collide with statistics; prefixed"
        );
    }

    EnrichedResult {
        rows,
        failures: merged.failures,
    }
}

/// Add country, ISO3 and region columns for each row's region code
pub fn resolve_admin_regions(
    result: &mut EnrichedResult,
    lookup: &dyn AdminLookup,
    admin_code_column: &str,
) {
    let statistics = statistic_columns(result.rows.iter().map(|row| &row.values));
    let country_column = enrichment_column(columns::ADMIN_PREFIX, columns::COUNTRY, &statistics);
    let iso3_column = enrichment_column(columns::ADMIN_PREFIX, columns::ISO3, &statistics);
    let region_column = enrichment_column(columns::ADMIN_PREFIX, columns::REGION, &statistics);

    let renamed: Vec<&str> = [columns::COUNTRY, columns::ISO3, columns::REGION]
        .into_iter()
        .filter(|column| statistics.contains(*column))
        .collect();
    if !renamed.is_empty() {
        warn!(
            columns = ?renamed,
            prefix = columns::ADMIN_PREFIX,
            "Region columns collide with statistics; prefixed"
        );
    }

    let mut unresolved = 0usize;

    for row in &mut result.rows {
        let region = row
            .get(admin_code_column)
            .and_then(code_text)
            .and_then(|code| lookup.resolve(&code));

        if region.is_none() {
            unresolved += 1;
        }

        row.admin.insert(
            country_column.clone(),
            region.map_or(Value::Null, |r| Value::String(r.country.clone())),
        );
        row.admin.insert(
            iso3_column.clone(),
            region.map_or(Value::Null, |r| Value::String(r.iso3.clone())),
        );
        row.admin.insert(
            region_column.clone(),
            region
                .and_then(|r| r.region.clone())
                .map_or(Value::Null, Value::String),
        );
    }

    if unresolved > 0 {
        debug!(unresolved, "Rows without a resolvable region code");
    }
}

/// Region codes may arrive as strings or as numeric codes
fn code_text(value: &Value) -> Option<String> {
    match value {
        Value::String(code) if !code.trim().is_empty() => Some(code.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub fn apply_formatting(result: &mut EnrichedResult, format: &FormatConfig) {
    for row in &mut result.rows {
        format_values(&mut row.values, format);
    }
}

pub fn sort_by_plot_id(result: &mut EnrichedResult) {
    result.rows.sort_by_key(|row| row.plot_id);
}

/// Run every postprocessing step in order
pub fn postprocess(
    merged: MergedResult,
    metadata: &LocalMetadata,
    lookup: &dyn AdminLookup,
    options: &PostprocessOptions,
) -> EnrichedResult {
    let mut result = join_metadata(merged, metadata);
    resolve_admin_regions(&mut result, lookup, &options.admin_code_column);
    apply_formatting(&mut result, &options.format);
    sort_by_plot_id(&mut result);
    result
}
