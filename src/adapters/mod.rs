//! # Input and Output Adapters
//!
//! Sources that produce raw records (local geometry, remote collections) and
//! the conversion of result tables back into remote collections. Adapters
//! only translate representations; all orchestration happens elsewhere.

pub mod local;
pub mod remote;

pub use local::{parse_feature_collection, GeoJsonFileSource, InMemorySource, LocalGeometrySource};
pub use remote::{
    to_feature_collection, InMemoryCollectionStore, RemoteCollectionAdapter,
    RemoteCollectionHandle,
};
