//! Candidate generation and validation for the sampling designs.
//!
//! This module hosts the shared [`SamplingConstraints`], the constraint
//! validator, per-region count allocation, the rejection sampler for random
//! designs and the lattice generator for systematic designs.
use rand::rand_core::RngCore;

pub mod allocation;
pub mod grid;
pub mod rejection;
pub mod validate;

pub use allocation::allocate;
pub use grid::GridSpec;
pub use rejection::{RegionOutcome, RejectionSampler, RunResult};
pub use validate::{is_valid, RejectionReason, ValidationMode};

/// Distance and placement constraints shared by all designs.
///
/// A distance of `0` disables the corresponding check.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplingConstraints {
    /// Minimum distance between two accepted samples of the same region.
    pub min_distance_samples: f64,
    /// Minimum distance from a sample to the region perimeter.
    pub min_distance_perimeter: f64,
    /// Minimum distance from a sample to any (buffered) exclusion zone.
    pub min_distance_exclusion: f64,
    /// Whether manually placed points may fall outside every region.
    pub allow_outside_sampling: bool,
    /// Whether per-region counts scale with region area.
    pub adjust_by_area: bool,
}

impl Default for SamplingConstraints {
    fn default() -> Self {
        Self {
            min_distance_samples: 0.0,
            min_distance_perimeter: 0.0,
            min_distance_exclusion: 0.0,
            allow_outside_sampling: false,
            adjust_by_area: false,
        }
    }
}

impl SamplingConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_distance_samples(mut self, distance: f64) -> Self {
        self.min_distance_samples = distance;
        self
    }

    pub fn with_min_distance_perimeter(mut self, distance: f64) -> Self {
        self.min_distance_perimeter = distance;
        self
    }

    pub fn with_min_distance_exclusion(mut self, distance: f64) -> Self {
        self.min_distance_exclusion = distance;
        self
    }

    pub fn with_allow_outside_sampling(mut self, allow: bool) -> Self {
        self.allow_outside_sampling = allow;
        self
    }

    pub fn with_adjust_by_area(mut self, adjust: bool) -> Self {
        self.adjust_by_area = adjust;
        self
    }

    /// Validates the constraints, returning an error if any distance is
    /// negative or non-finite.
    pub fn validate(&self) -> crate::error::Result<()> {
        for (name, value) in [
            ("min_distance_samples", self.min_distance_samples),
            ("min_distance_perimeter", self.min_distance_perimeter),
            ("min_distance_exclusion", self.min_distance_exclusion),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(crate::error::Error::InvalidConfig(format!(
                    "{name} must be finite and >= 0, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Generate a random float in the range [0, 1) with 53 bits of precision.
#[inline]
pub(crate) fn rand01(rng: &mut dyn RngCore) -> f64 {
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}
