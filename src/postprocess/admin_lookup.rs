//! # Administrative Region Lookup
//!
//! Static mapping from administrative region codes to human-readable names.
//! A miss is never an error: the enrichment columns are simply null.
//!
//! Tables are usually loaded from a JSON file shaped as
//! `{ "<code>": { "country": ..., "iso3": ..., "region": ... } }`. The
//! `LookupCache` keeps the parsed table between runs and reloads it only when
//! the file's content fingerprint changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::cache::{fingerprint_files, FingerprintCache};
use crate::error::{PlotStatsError, Result};

/// Human-readable attributes of one administrative region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRegion {
    pub country: String,
    pub iso3: String,
    #[serde(default)]
    pub region: Option<String>,
}

/// Resolves region codes; implementations are read-only after construction
pub trait AdminLookup: Send + Sync {
    fn resolve(&self, code: &str) -> Option<&AdminRegion>;

    fn entry_count(&self) -> usize;
}

/// Supplies the lookup table to use for a run
pub trait AdminLookupProvider: Send + Sync {
    fn snapshot(&self) -> Result<Arc<dyn AdminLookup>>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticAdminLookup {
    entries: HashMap<String, AdminRegion>,
}

impl StaticAdminLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, AdminRegion)>,
        K: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(code, region)| (normalize_code(&code.into()), region))
                .collect(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: HashMap<String, AdminRegion> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PlotStatsError::IoError(format!("cannot read lookup {}: {e}", path.display()))
        })?;
        Self::from_json_str(&contents)
    }
}

impl AdminLookup for StaticAdminLookup {
    fn resolve(&self, code: &str) -> Option<&AdminRegion> {
        self.entries.get(&normalize_code(code))
    }

    fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Codes match case-insensitively and ignore surrounding whitespace
fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Always hands out the same table
#[derive(Debug, Clone, Default)]
pub struct FixedLookup(Arc<StaticAdminLookup>);

impl FixedLookup {
    pub fn new(lookup: StaticAdminLookup) -> Self {
        Self(Arc::new(lookup))
    }
}

impl AdminLookupProvider for FixedLookup {
    fn snapshot(&self) -> Result<Arc<dyn AdminLookup>> {
        Ok(self.0.clone())
    }
}

/// Lookup table backed by a JSON file, reloaded when the file changes
#[derive(Debug)]
pub struct LookupCache {
    path: PathBuf,
    slot: FingerprintCache<StaticAdminLookup>,
}

impl LookupCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slot: FingerprintCache::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current table, parsed again only if the file content changed
    pub fn load(&self) -> Result<Arc<StaticAdminLookup>> {
        let fingerprint = fingerprint_files(&[&self.path])?;
        self.slot.get_or_try_insert("admin_lookup", &fingerprint, || {
            let lookup = StaticAdminLookup::from_json_file(&self.path)?;
            info!(
                path = %self.path.display(),
                entries = lookup.entry_count(),
                "Administrative lookup loaded"
            );
            Ok(lookup)
        })
    }

    pub fn invalidate(&self) {
        self.slot.invalidate_all();
    }
}

impl AdminLookupProvider for LookupCache {
    fn snapshot(&self) -> Result<Arc<dyn AdminLookup>> {
        Ok(self.load()?)
    }
}
