//! # Remote Service Client Seams
//!
//! Traits and value types for the external remote computation service and the
//! computation definition builder, plus the cache that keeps built definitions
//! around between runs.

pub mod definition;
pub mod definition_cache;
pub mod errors;
pub mod traits;

pub use definition::{ComputationDefinition, DefinitionOptions};
pub use definition_cache::DefinitionCache;
pub use errors::RemoteError;
pub use traits::{DefinitionBuilder, RemoteComputationClient};
