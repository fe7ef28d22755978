//! Opaque handle to the remote computation definition.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Options forwarded to the definition builder
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefinitionOptions {
    /// Named data layers to include; empty means every available layer
    pub layers: Vec<String>,
    /// ISO country codes selecting national data layers
    pub national_codes: Vec<String>,
}

impl From<&crate::config::DefinitionConfig> for DefinitionOptions {
    fn from(config: &crate::config::DefinitionConfig) -> Self {
        Self {
            layers: config.layers.clone(),
            national_codes: config.national_codes.clone(),
        }
    }
}

/// The computation the remote service evaluates per record
///
/// Built as a whole by a `DefinitionBuilder` and never edited in place; the
/// recovery path replaces it with a strict rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationDefinition {
    /// Stable identifier of this build (content fingerprint)
    pub fingerprint: String,
    /// Whether layers were validated against the service when building
    pub strict: bool,
    /// Attributes the definition will produce
    pub layers: Vec<String>,
    /// Builder-specific payload handed to the remote client untouched
    pub payload: Value,
}

impl ComputationDefinition {
    pub fn new(layers: Vec<String>, strict: bool, payload: Value) -> Self {
        let fingerprint = crate::cache::fingerprint_value(&(&layers, strict, &payload));
        Self {
            fingerprint,
            strict,
            layers,
            payload,
        }
    }
}
