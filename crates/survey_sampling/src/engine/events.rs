//! Progress events and sinks for observing sampling runs.
//!
//! This module defines [`ProgressEvent`] and a set of sinks and adapters to
//! emit, collect, or forward events while a run executes, either inline via
//! [`crate::engine::SamplingEngine::run_random_sampling`] or on a background
//! [`crate::engine::worker::SamplingWorker`]. Progress is one-way and
//! lossy-tolerant; dropping events never affects the run outcome.
use crate::region::RegionKey;
use crate::sampling::rejection::RegionOutcome;

/// Describes events emitted by sampling operations.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Emitted when a multi-region run starts.
    RunStarted {
        /// Number of regions to process.
        region_count: usize,
        /// Sum of requested counts over all regions.
        total_requested: usize,
    },

    /// Emitted when a region starts sampling.
    RegionStarted {
        region: RegionKey,
        requested: usize,
    },

    /// Emitted each time a candidate is accepted.
    SampleAccepted {
        region: RegionKey,
        /// Accepted so far in this region.
        generated: usize,
        requested: usize,
    },

    /// Emitted when a region completes, including shortfall information.
    RegionFinished {
        region: RegionKey,
        outcome: RegionOutcome,
    },

    /// Emitted when the whole run completes.
    RunFinished {
        total_accepted: usize,
    },

    /// Emitted after systematic lattice generation.
    LatticeGenerated {
        point_count: usize,
    },

    /// Emitted after a lattice was filtered into regions.
    GridFiltered {
        accepted: usize,
        dropped: usize,
    },

    /// Non-fatal warning generated during a run.
    Warning {
        /// Context string (e.g. a region key).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

impl ProgressEvent {
    pub fn kind(&self) -> ProgressEventKind {
        match self {
            ProgressEvent::RunStarted { .. } => ProgressEventKind::RunStarted,
            ProgressEvent::RegionStarted { .. } => ProgressEventKind::RegionStarted,
            ProgressEvent::SampleAccepted { .. } => ProgressEventKind::SampleAccepted,
            ProgressEvent::RegionFinished { .. } => ProgressEventKind::RegionFinished,
            ProgressEvent::RunFinished { .. } => ProgressEventKind::RunFinished,
            ProgressEvent::LatticeGenerated { .. } => ProgressEventKind::LatticeGenerated,
            ProgressEvent::GridFiltered { .. } => ProgressEventKind::GridFiltered,
            ProgressEvent::Warning { .. } => ProgressEventKind::Warning,
        }
    }
}

/// Discriminant used by sinks to opt out of high-frequency events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEventKind {
    RunStarted,
    RegionStarted,
    SampleAccepted,
    RegionFinished,
    RunFinished,
    LatticeGenerated,
    GridFiltered,
    Warning,
}

/// A generic event sink that accepts [`ProgressEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: ProgressEvent);

    /// Whether the sink cares about events of `kind`. Producers may skip
    /// building events the sink does not want; `SampleAccepted` in
    /// particular fires once per accepted point.
    fn wants(&self, _kind: ProgressEventKind) -> bool {
        true
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: ProgressEvent) {}

    #[inline]
    fn wants(&self, _kind: ProgressEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(ProgressEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(ProgressEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(ProgressEvent),
{
    #[inline]
    fn send(&mut self, event: ProgressEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects all events in a `Vec`.
#[derive(Default)]
pub struct VecSink {
    events: Vec<ProgressEvent>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<ProgressEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[ProgressEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for VecSink {
    #[inline]
    fn send(&mut self, event: ProgressEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_collects_events() {
        let mut sink = VecSink::new();
        assert!(sink.is_empty());
        sink.send(ProgressEvent::Warning {
            context: "a".into(),
            message: "m".into(),
        });
        sink.send(ProgressEvent::RunFinished { total_accepted: 3 });
        assert_eq!(sink.len(), 2);
        assert!(matches!(
            sink.as_slice()[1],
            ProgressEvent::RunFinished { total_accepted: 3 }
        ));
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn fn_sink_invokes_callback() {
        let mut count = 0;
        let mut sink = FnSink::new(|_event| {
            count += 1;
        });
        sink.send(ProgressEvent::RunStarted {
            region_count: 1,
            total_requested: 10,
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn noop_sink_wants_nothing() {
        let sink = ();
        assert!(!sink.wants(ProgressEventKind::SampleAccepted));
    }

    #[test]
    fn event_kinds_match_their_events() {
        let event = ProgressEvent::LatticeGenerated { point_count: 12 };
        assert_eq!(event.kind(), ProgressEventKind::LatticeGenerated);
    }
}
