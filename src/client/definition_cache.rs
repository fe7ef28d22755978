//! Cache of built computation definitions, keyed by builder options and mode.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::{fingerprint_value, FingerprintCache};
use crate::client::definition::{ComputationDefinition, DefinitionOptions};
use crate::client::traits::DefinitionBuilder;
use crate::error::Result;

/// Lazily builds and reuses computation definitions
///
/// Entries are invalidated when the builder's source fingerprint changes.
/// Construct one per process and share it through an `Arc`, or construct a
/// fresh one per test.
pub struct DefinitionCache {
    builder: Arc<dyn DefinitionBuilder>,
    entries: FingerprintCache<ComputationDefinition>,
    /// Serializes builds so concurrent callers do not build the same definition twice
    build_lock: Mutex<()>,
}

impl std::fmt::Debug for DefinitionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl DefinitionCache {
    pub fn new(builder: Arc<dyn DefinitionBuilder>) -> Self {
        Self {
            builder,
            entries: FingerprintCache::new(),
            build_lock: Mutex::new(()),
        }
    }

    fn cache_key(options: &DefinitionOptions, strict: bool) -> String {
        fingerprint_value(&(options, strict))
    }

    /// Cached definition for these options, building it on first use
    pub async fn get_or_build(
        &self,
        options: &DefinitionOptions,
        strict: bool,
    ) -> Result<Arc<ComputationDefinition>> {
        let key = Self::cache_key(options, strict);
        let source = self.builder.source_fingerprint()?;

        if let Some(definition) = self.entries.get(&key, &source) {
            debug!(strict, fingerprint = %definition.fingerprint, "Definition cache hit");
            return Ok(definition);
        }

        let _guard = self.build_lock.lock().await;
        if let Some(definition) = self.entries.get(&key, &source) {
            return Ok(definition);
        }

        self.build_and_store(key, source, options, strict).await
    }

    /// Build a fresh definition regardless of what is cached, replacing the entry
    pub async fn rebuild(
        &self,
        options: &DefinitionOptions,
        strict: bool,
    ) -> Result<Arc<ComputationDefinition>> {
        let key = Self::cache_key(options, strict);
        let source = self.builder.source_fingerprint()?;
        let _guard = self.build_lock.lock().await;
        self.build_and_store(key, source, options, strict).await
    }

    async fn build_and_store(
        &self,
        key: String,
        source: String,
        options: &DefinitionOptions,
        strict: bool,
    ) -> Result<Arc<ComputationDefinition>> {
        let definition = self.builder.build(options, strict).await?;
        info!(
            strict,
            layer_count = definition.layers.len(),
            fingerprint = %definition.fingerprint,
            "Computation definition built"
        );
        Ok(self.entries.insert(key, source, definition))
    }

    /// Drop all cached definitions
    pub fn invalidate(&self) {
        let removed = self.entries.invalidate_all();
        debug!(removed, "Definition cache invalidated");
    }

    pub fn cached_count(&self) -> usize {
        self.entries.len()
    }
}
