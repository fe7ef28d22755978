//! # Fingerprinted Caches
//!
//! Expensive external assets (built computation definitions, administrative
//! lookup tables) are cached between runs and rebuilt only when the
//! fingerprint of their source of truth changes. Caches are plain values
//! handed around as `Arc`s, so tests can substitute or pre-populate them.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::{PlotStatsError, Result};

#[derive(Debug)]
struct CachedEntry<T> {
    fingerprint: String,
    value: Arc<T>,
    loaded_at: DateTime<Utc>,
}

/// Keyed cache whose entries are valid only for the fingerprint they were
/// built from
#[derive(Debug)]
pub struct FingerprintCache<T> {
    entries: RwLock<HashMap<String, CachedEntry<T>>>,
}

impl<T> Default for FingerprintCache<T> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> FingerprintCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, if it was built from `fingerprint`
    pub fn get(&self, key: &str, fingerprint: &str) -> Option<Arc<T>> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.fingerprint == fingerprint {
            Some(entry.value.clone())
        } else {
            debug!(
                key = %key,
                cached_fingerprint = %entry.fingerprint,
                current_fingerprint = %fingerprint,
                loaded_at = %entry.loaded_at.to_rfc3339(),
                "Cached entry is stale"
            );
            None
        }
    }

    pub fn insert(&self, key: String, fingerprint: String, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.entries.write().insert(
            key,
            CachedEntry {
                fingerprint,
                value: value.clone(),
                loaded_at: Utc::now(),
            },
        );
        value
    }

    /// Return the cached value or build, store and return a new one
    pub fn get_or_try_insert<F>(&self, key: &str, fingerprint: &str, build: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Result<T>,
    {
        if let Some(value) = self.get(key, fingerprint) {
            return Ok(value);
        }
        let value = build()?;
        Ok(self.insert(key.to_string(), fingerprint.to_string(), value))
    }

    /// Drop every entry; returns how many were removed
    pub fn invalidate_all(&self) -> usize {
        let mut entries = self.entries.write();
        let removed = entries.len();
        entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// SHA-256 hex digest of a serializable value's JSON form
pub fn fingerprint_value<T: Serialize + ?Sized>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    format!("{:x}", Sha256::digest(&bytes))
}

/// SHA-256 hex digest over the contents of a set of files, in the given order
pub fn fingerprint_files<P: AsRef<Path>>(paths: &[P]) -> Result<String> {
    let mut hasher = Sha256::new();
    for path in paths {
        let path = path.as_ref();
        let contents = std::fs::read(path).map_err(|e| {
            PlotStatsError::IoError(format!("cannot fingerprint {}: {e}", path.display()))
        })?;
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update((contents.len() as u64).to_le_bytes());
        hasher.update(&contents);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
