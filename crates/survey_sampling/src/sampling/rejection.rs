//! Rejection sampling of random points inside regions.
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use glam::DVec2;
use rand::rand_core::RngCore;
use tracing::{info, warn};

use crate::engine::events::{EventSink, ProgressEvent, ProgressEventKind};
use crate::engine::registry::SampleRegistry;
use crate::error::{Error, Result};
use crate::region::{ExclusionZone, Region, RegionKey};
use crate::sampling::{is_valid, rand01, SamplingConstraints, ValidationMode};

/// Attempt budget multiplier per requested sample.
///
/// Deliberately generous; there is no principled derivation for the value,
/// so it stays configurable on [`RejectionSampler`].
pub const DEFAULT_ATTEMPTS_PER_SAMPLE: usize = 2000;

/// Shared cancellation flag, polled once per sampling attempt.
///
/// Cancellation is cooperative: observing it costs at most one attempt of
/// latency, after which the whole run is discarded.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Per-region result of a rejection-sampling pass.
///
/// A shortfall is a reported, recoverable condition: the accepted points are
/// kept and the caller decides how to proceed.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegionOutcome {
    pub requested: usize,
    pub generated: usize,
    pub attempts: usize,
    pub shortfall: bool,
}

/// Result of a multi-region random sampling run.
#[derive(Debug, Clone, Default)]
pub struct RunResult {
    /// Accepted points, grouped and ordered by region.
    pub accepted: SampleRegistry,
    /// Requested/generated/attempt counts per region.
    pub outcomes: BTreeMap<RegionKey, RegionOutcome>,
}

impl RunResult {
    /// Regions that ended short of their request.
    pub fn shortfalls(&self) -> BTreeMap<RegionKey, RegionOutcome> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.shortfall)
            .map(|(key, outcome)| (*key, *outcome))
            .collect()
    }
}

/// Uniform rejection sampler honoring the configured constraints.
#[derive(Debug, Clone)]
pub struct RejectionSampler {
    /// Attempt budget per requested sample.
    pub attempts_per_sample: usize,
}

impl Default for RejectionSampler {
    fn default() -> Self {
        Self {
            attempts_per_sample: DEFAULT_ATTEMPTS_PER_SAMPLE,
        }
    }
}

impl RejectionSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attempts_per_sample(mut self, attempts_per_sample: usize) -> Self {
        self.attempts_per_sample = attempts_per_sample;
        self
    }

    /// Samples `target` points inside one region.
    ///
    /// Candidates are drawn uniformly from the region bounding box and
    /// validated in [`ValidationMode::Generated`] against the points already
    /// accepted in this call. Terminates when the target is reached, the
    /// attempt budget (`target * attempts_per_sample`) is exhausted, or the
    /// cancel flag is observed.
    pub fn sample_region(
        &self,
        region: &Region,
        exclusion_zones: &[ExclusionZone],
        constraints: &SamplingConstraints,
        target: usize,
        rng: &mut dyn RngCore,
        sink: &mut dyn EventSink,
        cancel: &CancelFlag,
    ) -> Result<(Vec<DVec2>, RegionOutcome)> {
        let (min, max) = region.geometry.bounding_box()?;
        let extent = max - min;
        if !(extent.x > 0.0 && extent.y > 0.0) {
            return Err(Error::Geometry(format!(
                "{} has a degenerate bounding box",
                region.key
            )));
        }

        let budget = target.saturating_mul(self.attempts_per_sample);
        let mut accepted: Vec<DVec2> = Vec::with_capacity(target);
        let mut attempts = 0;

        while accepted.len() < target && attempts < budget {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let candidate = min + DVec2::new(rand01(rng) * extent.x, rand01(rng) * extent.y);
            attempts += 1;

            if is_valid(
                candidate,
                Some(region),
                exclusion_zones,
                &accepted,
                constraints,
                ValidationMode::Generated,
            )
            .is_ok()
            {
                accepted.push(candidate);
                if sink.wants(ProgressEventKind::SampleAccepted) {
                    sink.send(ProgressEvent::SampleAccepted {
                        region: region.key,
                        generated: accepted.len(),
                        requested: target,
                    });
                }
            }
        }

        let outcome = RegionOutcome {
            requested: target,
            generated: accepted.len(),
            attempts,
            shortfall: accepted.len() < target,
        };

        if outcome.shortfall {
            warn!(
                "Could not generate all requested samples for {}: requested {}, generated {}, attempts {}.",
                region.key, outcome.requested, outcome.generated, outcome.attempts
            );
            if sink.wants(ProgressEventKind::Warning) {
                sink.send(ProgressEvent::Warning {
                    context: region.key.to_string(),
                    message: format!(
                        "could not generate all requested samples (requested {}, generated {}, attempts {}); \
                         constraints may be too strict or the region too small",
                        outcome.requested, outcome.generated, outcome.attempts
                    ),
                });
            }
        }

        Ok((accepted, outcome))
    }

    /// Samples every region in `counts`, sequentially and independently.
    ///
    /// A shortfall in one region does not block the others. Cancellation
    /// discards the whole run and returns [`Error::Cancelled`].
    pub fn sample_regions(
        &self,
        regions: &[Region],
        exclusion_zones: &[ExclusionZone],
        constraints: &SamplingConstraints,
        counts: &BTreeMap<RegionKey, usize>,
        label_root: &str,
        rng: &mut dyn RngCore,
        sink: &mut dyn EventSink,
        cancel: &CancelFlag,
    ) -> Result<RunResult> {
        constraints.validate()?;

        if sink.wants(ProgressEventKind::RunStarted) {
            sink.send(ProgressEvent::RunStarted {
                region_count: counts.len(),
                total_requested: counts.values().sum(),
            });
        }

        let mut registry = SampleRegistry::with_label_root(label_root);
        let mut outcomes = BTreeMap::new();

        for (&key, &target) in counts {
            let region = regions.iter().find(|r| r.key == key).ok_or_else(|| {
                Error::InvalidConfig(format!("no configured region for {key}"))
            })?;

            if sink.wants(ProgressEventKind::RegionStarted) {
                sink.send(ProgressEvent::RegionStarted {
                    region: key,
                    requested: target,
                });
            }

            let (points, outcome) = self.sample_region(
                region,
                exclusion_zones,
                constraints,
                target,
                rng,
                sink,
                cancel,
            )?;
            for point in points {
                registry.add(point, key);
            }
            outcomes.insert(key, outcome);

            if sink.wants(ProgressEventKind::RegionFinished) {
                sink.send(ProgressEvent::RegionFinished {
                    region: key,
                    outcome,
                });
            }
        }

        registry.renumber();
        info!(
            "Random sampling finished: {} points over {} regions.",
            registry.len(),
            counts.len()
        );
        if sink.wants(ProgressEventKind::RunFinished) {
            sink.send(ProgressEvent::RunFinished {
                total_accepted: registry.len(),
            });
        }

        Ok(RunResult {
            accepted: registry,
            outcomes,
        })
    }
}
