//! Background execution of random sampling runs.
//!
//! A [`SamplingWorker`] owns a dedicated thread that runs the rejection
//! sampler over an immutable snapshot of the run configuration. Progress
//! flows one way through an mpsc channel; the caller drains it whenever
//! convenient and dropped events are harmless. The final [`RunResult`] is
//! the only thing that crosses back, on [`SamplingWorker::join`].
use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::engine::events::{EventSink, ProgressEvent};
use crate::error::{Error, Result};
use crate::region::{ExclusionZone, Region, RegionKey};
use crate::sampling::rejection::{CancelFlag, RejectionSampler, RunResult};
use crate::sampling::SamplingConstraints;

/// Immutable snapshot of everything a background run needs.
#[derive(Debug, Clone)]
pub struct WorkerInputs {
    pub regions: Vec<Region>,
    pub exclusion_zones: Vec<ExclusionZone>,
    pub constraints: SamplingConstraints,
    pub counts: BTreeMap<RegionKey, usize>,
    pub label_root: String,
    pub sampler: RejectionSampler,
    /// Seed for reproducible runs; `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Sink that forwards events into the worker channel.
///
/// Send failures mean the receiver is gone; progress is lossy-tolerant, so
/// they are ignored.
struct ChannelSink(Sender<ProgressEvent>);

impl EventSink for ChannelSink {
    fn send(&mut self, event: ProgressEvent) {
        let _ = self.0.send(event);
    }
}

/// Handle to one background sampling run.
pub struct SamplingWorker {
    handle: Option<JoinHandle<Result<RunResult>>>,
    cancel: CancelFlag,
    receiver: Receiver<ProgressEvent>,
}

impl SamplingWorker {
    /// Spawns the worker thread and starts sampling immediately.
    pub fn spawn(inputs: WorkerInputs) -> Result<Self> {
        let cancel = CancelFlag::new();
        let cancel_for_run = cancel.clone();
        let (sender, receiver) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("sampling-worker".to_string())
            .spawn(move || {
                let mut rng = match inputs.seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_rng(&mut rand::rng()),
                };
                let mut sink = ChannelSink(sender);
                inputs.sampler.sample_regions(
                    &inputs.regions,
                    &inputs.exclusion_zones,
                    &inputs.constraints,
                    &inputs.counts,
                    &inputs.label_root,
                    &mut rng,
                    &mut sink,
                    &cancel_for_run,
                )
            })
            .map_err(|e| Error::Worker(format!("failed to spawn sampling thread: {e}")))?;

        info!("Sampling worker started.");
        Ok(Self {
            handle: Some(handle),
            cancel,
            receiver,
        })
    }

    /// Drains all progress events published since the last poll.
    pub fn poll_progress(&self) -> Vec<ProgressEvent> {
        self.receiver.try_iter().collect()
    }

    /// Requests cooperative cancellation; observed within one attempt.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }

    /// Waits for the run and returns its result.
    ///
    /// Cancellation surfaces as [`Error::Cancelled`]; a panicked worker as
    /// [`Error::Worker`]. Nothing is committed anywhere until the caller
    /// takes this result.
    pub fn join(mut self) -> Result<RunResult> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| Error::Worker("worker already joined".into()))?;
        match handle.join() {
            Ok(result) => result,
            Err(panic) => {
                warn!("Sampling worker panicked: {panic:?}");
                Err(Error::Worker("sampling thread panicked".into()))
            }
        }
    }
}

impl Drop for SamplingWorker {
    fn drop(&mut self) {
        // An abandoned worker must not keep sampling in the background.
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
