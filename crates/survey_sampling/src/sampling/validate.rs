//! Constraint validation for candidate sample points.
//!
//! [`is_valid`] is a pure predicate combining containment, exclusion-zone and
//! distance rules. Rejections are expected outcomes of constrained sampling,
//! not errors; callers decide whether to surface them.
use glam::DVec2;

use crate::region::{ExclusionZone, Region};
use crate::sampling::SamplingConstraints;

/// Why a candidate point was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RejectionReason {
    OutsideRegion,
    InExclusionZone,
    TooCloseToPerimeter,
    TooCloseToExclusion,
    TooCloseToSample,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RejectionReason::OutsideRegion => "point is outside the sampling region",
            RejectionReason::InExclusionZone => "point is inside an exclusion zone",
            RejectionReason::TooCloseToPerimeter => "point is too close to the region perimeter",
            RejectionReason::TooCloseToExclusion => "point is too close to an exclusion zone",
            RejectionReason::TooCloseToSample => "point is too close to another sample",
        };
        f.write_str(text)
    }
}

/// Where the candidate point comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Produced by a sampler; must always lie inside the region.
    Generated,
    /// Placed by hand; containment is waived when outside sampling is allowed.
    Manual,
}

/// Checks whether `point` satisfies every configured constraint.
///
/// `existing` are the points already accepted for the same region.
/// Deterministic and side-effect free.
pub fn is_valid(
    point: DVec2,
    region: Option<&Region>,
    exclusion_zones: &[ExclusionZone],
    existing: &[DVec2],
    constraints: &SamplingConstraints,
    mode: ValidationMode,
) -> Result<(), RejectionReason> {
    let containment_required = match mode {
        ValidationMode::Generated => true,
        ValidationMode::Manual => !constraints.allow_outside_sampling,
    };
    if containment_required {
        match region {
            Some(region) if region.geometry.contains(point) => {}
            _ => return Err(RejectionReason::OutsideRegion),
        }
    }

    for zone in exclusion_zones {
        if zone.contains_buffered(point) {
            return Err(RejectionReason::InExclusionZone);
        }
        if constraints.min_distance_exclusion > 0.0
            && zone.distance_buffered(point) < constraints.min_distance_exclusion
        {
            return Err(RejectionReason::TooCloseToExclusion);
        }
    }

    if constraints.min_distance_perimeter > 0.0 {
        if let Some(region) = region {
            if region.geometry.boundary_distance(point) < constraints.min_distance_perimeter {
                return Err(RejectionReason::TooCloseToPerimeter);
            }
        }
    }

    if constraints.min_distance_samples > 0.0 {
        for other in existing {
            if point.distance(*other) < constraints.min_distance_samples {
                return Err(RejectionReason::TooCloseToSample);
            }
        }
    }

    Ok(())
}
