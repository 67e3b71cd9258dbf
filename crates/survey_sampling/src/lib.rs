#![forbid(unsafe_code)]
//! survey_sampling: constrained spatial sampling for survey designs.
//!
//! Modules:
//! - geometry: capability layer over the geo crate (containment, distances, union, buffering)
//! - region: sampling areas, strata/clusters and exclusion zones
//! - sampling: constraint validation, count allocation, rejection sampling, systematic grids
//! - engine: workflow state machine, sample registry, progress events, background worker
//!
//! Coordinates are consumed as already-projected map units; rendering and
//! file output are the caller's concern.
pub mod engine;
pub mod error;
pub mod geometry;
pub mod region;
pub mod sampling;

/// Convenient re-exports for common types. Import with `use survey_sampling::prelude::*;`.
pub mod prelude {
    pub use crate::engine::events::{EventSink, FnSink, ProgressEvent, ProgressEventKind, VecSink};
    pub use crate::engine::registry::{SamplePoint, SampleRegistry};
    pub use crate::engine::worker::{SamplingWorker, WorkerInputs};
    pub use crate::engine::{ManualOutcome, SamplingEngine, WorkflowState};
    pub use crate::error::{Error, Result};
    pub use crate::geometry::Geometry;
    pub use crate::region::{ExclusionZone, Region, RegionKey, RegionRole};
    pub use crate::sampling::grid::{GridReport, GridSpec};
    pub use crate::sampling::rejection::{CancelFlag, RegionOutcome, RejectionSampler, RunResult};
    pub use crate::sampling::{
        allocate, is_valid, RejectionReason, SamplingConstraints, ValidationMode,
    };
}
