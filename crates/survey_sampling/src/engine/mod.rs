//! Engine facade: configuration, workflow state machine and the registry of
//! accepted samples.
//!
//! Callers configure regions, exclusion zones and constraints once per run,
//! then drive one of the designs: random sampling (inline or on a background
//! worker) or a systematic grid (generate, position, finalize). Manual edits
//! and exports operate on the registry afterwards. The state machine replaces
//! UI-side widget exclusion: every transition is checked here, and illegal
//! ones fail with typed errors instead of corrupting the run.
use std::collections::BTreeMap;

use glam::DVec2;
use rand::rand_core::RngCore;
use tracing::info;

use crate::error::{Error, Result};
use crate::region::{ExclusionZone, Region, RegionKey};
use crate::sampling::grid::{self, GridReport, GridSpec};
use crate::sampling::rejection::{CancelFlag, RegionOutcome, RejectionSampler};
use crate::sampling::{is_valid, RejectionReason, SamplingConstraints, ValidationMode};

pub mod events;
pub mod registry;
pub mod worker;

use events::EventSink;
use registry::{SamplePoint, SampleRegistry};
use worker::{SamplingWorker, WorkerInputs};

/// Lifecycle of one sampling run.
///
/// `Idle` is both initial and terminal; `reset` returns here. A failed or
/// cancelled generation falls back to `Configured`, from which the run can be
/// restarted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkflowState {
    #[default]
    Idle,
    Configured,
    Generating,
    Generated,
    Positioning,
    Finalized,
    Editing,
    Exported,
}

/// Result of a manual placement attempt.
///
/// Rejections are expected outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManualOutcome {
    Added(RegionKey),
    Rejected(RejectionReason),
}

/// Constrained spatial sampling engine.
#[derive(Default)]
pub struct SamplingEngine {
    regions: Vec<Region>,
    exclusion_zones: Vec<ExclusionZone>,
    constraints: SamplingConstraints,
    label_root: String,
    sampler: RejectionSampler,
    seed: Option<u64>,
    registry: SampleRegistry,
    state: WorkflowState,
    grid_points: Vec<DVec2>,
    grid_spec: Option<GridSpec>,
    worker: Option<SamplingWorker>,
}

impl SamplingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn registry(&self) -> &SampleRegistry {
        &self.registry
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Lattice of the current grid run, if one was generated.
    pub fn grid_points(&self) -> Option<&[DVec2]> {
        self.grid_spec
            .as_ref()
            .map(|_| self.grid_points.as_slice())
    }

    /// Spec of the current grid run; callers derive edit tolerances from it
    /// (half the column spacing mirrors the classic grid behavior).
    pub fn grid_spec(&self) -> Option<&GridSpec> {
        self.grid_spec.as_ref()
    }

    /// Root prepended to every sample label.
    pub fn set_label_root(&mut self, label_root: impl Into<String>) {
        self.label_root = label_root.into();
    }

    /// Seed for background runs; `None` seeds from the OS.
    pub fn set_seed(&mut self, seed: Option<u64>) {
        self.seed = seed;
    }

    pub fn set_sampler(&mut self, sampler: RejectionSampler) {
        self.sampler = sampler;
    }

    fn guard_no_worker(&self) -> Result<()> {
        if self.worker.is_some() {
            return Err(Error::RunInProgress);
        }
        Ok(())
    }

    fn guard_state(&self, action: &'static str, allowed: &[WorkflowState]) -> Result<()> {
        let state = self.state();
        if allowed.contains(&state) {
            Ok(())
        } else {
            Err(Error::InvalidState { action, state })
        }
    }

    /// Supplies the run configuration. Regions and zones are immutable until
    /// the next `configure` or `reset`.
    pub fn configure(
        &mut self,
        regions: Vec<Region>,
        exclusion_zones: Vec<ExclusionZone>,
        constraints: SamplingConstraints,
    ) -> Result<()> {
        self.guard_no_worker()?;
        self.guard_state("configure", &[WorkflowState::Idle, WorkflowState::Configured])?;
        constraints.validate()?;

        if regions.is_empty() {
            return Err(Error::InvalidConfig("at least one region is required".into()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for region in &regions {
            if !seen.insert(region.key) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate region key {}",
                    region.key
                )));
            }
        }
        for zone in &exclusion_zones {
            if !zone.buffer.is_finite() || zone.buffer < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "exclusion zone buffer must be finite and >= 0, got {}",
                    zone.buffer
                )));
            }
        }

        self.regions = regions;
        self.exclusion_zones = exclusion_zones;
        self.constraints = constraints;
        self.state = WorkflowState::Configured;
        Ok(())
    }

    /// Target sample count per configured region.
    pub fn allocate_counts(
        &self,
        requested_min: usize,
        adjust_by_area: bool,
    ) -> Result<BTreeMap<RegionKey, usize>> {
        self.guard_state(
            "allocate_counts",
            &[
                WorkflowState::Configured,
                WorkflowState::Generated,
                WorkflowState::Positioning,
                WorkflowState::Finalized,
                WorkflowState::Editing,
            ],
        )?;
        if requested_min == 0 {
            return Err(Error::InvalidConfig(
                "requested sample count must be positive".into(),
            ));
        }
        crate::sampling::allocate(&self.regions, requested_min, adjust_by_area)
    }

    /// Runs random sampling inline on the calling thread.
    ///
    /// The registry is only replaced from the complete result; errors and
    /// cancellation leave it untouched and return the engine to `Configured`.
    pub fn run_random_sampling(
        &mut self,
        counts: &BTreeMap<RegionKey, usize>,
        rng: &mut dyn RngCore,
        sink: &mut dyn EventSink,
        cancel: &CancelFlag,
    ) -> Result<BTreeMap<RegionKey, RegionOutcome>> {
        self.guard_no_worker()?;
        self.guard_state("run_random_sampling", &[WorkflowState::Configured])?;

        self.state = WorkflowState::Generating;
        let result = self.sampler.sample_regions(
            &self.regions,
            &self.exclusion_zones,
            &self.constraints,
            counts,
            &self.label_root,
            rng,
            sink,
            cancel,
        );
        match result {
            Ok(run) => {
                self.registry = run.accepted;
                self.state = WorkflowState::Generated;
                Ok(run.outcomes)
            }
            Err(e) => {
                self.state = WorkflowState::Configured;
                Err(e)
            }
        }
    }

    /// Starts random sampling on a background worker.
    pub fn start_background_run(&mut self, counts: &BTreeMap<RegionKey, usize>) -> Result<()> {
        self.guard_no_worker()?;
        self.guard_state("start_background_run", &[WorkflowState::Configured])?;

        let inputs = WorkerInputs {
            regions: self.regions.clone(),
            exclusion_zones: self.exclusion_zones.clone(),
            constraints: self.constraints.clone(),
            counts: counts.clone(),
            label_root: self.label_root.clone(),
            sampler: self.sampler.clone(),
            seed: self.seed,
        };
        self.worker = Some(SamplingWorker::spawn(inputs)?);
        self.state = WorkflowState::Generating;
        Ok(())
    }

    /// Drains progress events from the active worker, if any.
    pub fn poll_progress(&self) -> Vec<events::ProgressEvent> {
        self.worker
            .as_ref()
            .map(|worker| worker.poll_progress())
            .unwrap_or_default()
    }

    /// Whether a background run is still executing.
    pub fn run_active(&self) -> bool {
        self.worker
            .as_ref()
            .map(|worker| !worker.is_finished())
            .unwrap_or(false)
    }

    /// Requests cancellation of the active background run.
    pub fn cancel(&self) {
        if let Some(worker) = &self.worker {
            worker.cancel();
        }
    }

    /// Waits for the background run and commits its result atomically.
    pub fn finish_run(&mut self) -> Result<BTreeMap<RegionKey, RegionOutcome>> {
        let worker = self.worker.take().ok_or(Error::InvalidState {
            action: "finish_run",
            state: self.state(),
        })?;
        match worker.join() {
            Ok(run) => {
                self.registry = run.accepted;
                self.state = WorkflowState::Generated;
                Ok(run.outcomes)
            }
            Err(e) => {
                self.state = WorkflowState::Configured;
                Err(e)
            }
        }
    }

    /// Generates the unfiltered systematic lattice for the configured regions.
    pub fn run_grid_sampling(&mut self, spec: GridSpec) -> Result<&[DVec2]> {
        self.guard_no_worker()?;
        self.guard_state("run_grid_sampling", &[WorkflowState::Configured])?;

        let points = grid::generate_lattice(&self.regions, &spec, &mut ())?;
        self.grid_points = points;
        self.grid_spec = Some(spec);
        self.state = WorkflowState::Generated;
        Ok(&self.grid_points)
    }

    /// Shifts the whole lattice; filtering is deferred until `finalize_grid`.
    pub fn translate_grid(&mut self, delta: DVec2) -> Result<()> {
        self.guard_no_worker()?;
        self.guard_state(
            "translate_grid",
            &[WorkflowState::Generated, WorkflowState::Positioning],
        )?;
        if self.grid_spec.is_none() {
            return Err(Error::InvalidState {
                action: "translate_grid",
                state: self.state(),
            });
        }
        grid::translate(&mut self.grid_points, delta);
        self.state = WorkflowState::Positioning;
        Ok(())
    }

    /// Filters the positioned lattice into regions, exactly once per run.
    pub fn finalize_grid(&mut self) -> Result<GridReport> {
        self.guard_no_worker()?;
        self.guard_state(
            "finalize_grid",
            &[WorkflowState::Generated, WorkflowState::Positioning],
        )?;
        let spec = self.grid_spec.clone().ok_or(Error::InvalidState {
            action: "finalize_grid",
            state: self.state(),
        })?;

        let (registry, report) = grid::filter_into_regions(
            &self.grid_points,
            &self.regions,
            &self.exclusion_zones,
            &self.constraints,
            &spec,
            &self.label_root,
            &mut (),
        );
        self.registry = registry;
        self.grid_points.clear();
        self.state = WorkflowState::Finalized;
        info!(
            "Grid finalized: {} accepted, {} dropped.",
            report.accepted, report.dropped
        );
        Ok(report)
    }

    /// Attempts to place a point by hand.
    ///
    /// The point joins the first configured region containing it, or
    /// `Outside` when outside sampling is allowed. Rejections leave the
    /// registry unchanged and are returned as values.
    pub fn add_manual(&mut self, position: DVec2) -> Result<ManualOutcome> {
        self.guard_no_worker()?;
        self.guard_state(
            "add_manual",
            &[
                WorkflowState::Generated,
                WorkflowState::Finalized,
                WorkflowState::Editing,
            ],
        )?;

        let owner = self
            .regions
            .iter()
            .find(|region| region.geometry.contains(position));
        let key = match owner {
            Some(region) => region.key,
            None => RegionKey::Outside,
        };
        let existing = self.registry.region_positions(key);

        if let Err(reason) = is_valid(
            position,
            owner,
            &self.exclusion_zones,
            &existing,
            &self.constraints,
            ValidationMode::Manual,
        ) {
            return Ok(ManualOutcome::Rejected(reason));
        }

        self.registry.add(position, key);
        self.registry.renumber();
        self.state = WorkflowState::Editing;
        Ok(ManualOutcome::Added(key))
    }

    /// Removes the sample nearest to `query`, within `tolerance` if given.
    ///
    /// Grid-based callers conventionally pass half the column spacing.
    pub fn remove_nearest(
        &mut self,
        query: DVec2,
        tolerance: Option<f64>,
    ) -> Result<Option<SamplePoint>> {
        self.guard_no_worker()?;
        self.guard_state(
            "remove_nearest",
            &[
                WorkflowState::Generated,
                WorkflowState::Finalized,
                WorkflowState::Editing,
            ],
        )?;

        let removed = self.registry.remove_nearest(query, tolerance);
        if removed.is_some() {
            self.state = WorkflowState::Editing;
        }
        Ok(removed)
    }

    /// Renumbered, ordered copy of every accepted point.
    pub fn export_snapshot(&mut self) -> Result<Vec<SamplePoint>> {
        self.guard_no_worker()?;
        self.guard_state(
            "export_snapshot",
            &[
                WorkflowState::Generated,
                WorkflowState::Finalized,
                WorkflowState::Editing,
            ],
        )?;
        let snapshot = self.registry.snapshot();
        self.state = WorkflowState::Exported;
        Ok(snapshot)
    }

    /// Discards the run and returns to `Idle`.
    ///
    /// An active background worker is cancelled and its result dropped.
    pub fn reset(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.cancel();
            let _ = worker.join();
        }
        self.registry = SampleRegistry::new();
        self.grid_points.clear();
        self.grid_spec = None;
        self.state = WorkflowState::Idle;
    }
}
