//! # Data Model
//!
//! Records, batches and batch outcomes shared by every orchestration stage.

pub mod batch;
pub mod geometry;
pub mod outcome;
pub mod record;

pub use batch::Batch;
pub use geometry::{Geometry, GeometryKind, Position, Ring};
pub use outcome::{BatchFailure, BatchOutcome, BatchSuccess, FailureKind, ResultRow};
pub use record::{PlotId, PlotIdRange, RawRecord, Record};
