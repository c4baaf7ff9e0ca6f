//! Event types and sinks for observing placement, flocculation, and percolation runs.
//!
//! This module defines [`MicroEvent`] and a set of sinks to emit, collect, or forward events
//! while executing [`crate::placement::place_classes_with_events`],
//! [`crate::floc::flocculate_with_events`], or
//! [`crate::percolation::connectivity_with_events`].
use glam::IVec3;

use crate::catalog::{ClusterId, ParticleId};
use crate::floc::FlocReport;
use crate::lattice::Phase;
use crate::percolation::Connectivity;
use crate::placement::{PlacementReport, SizeClass};

/// Describes events emitted by the engines.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub enum MicroEvent {
    /// Emitted once the classes are sorted and the sulfate targets are fixed.
    PlacementStarted {
        /// Number of size classes requested.
        classes: usize,
        /// Total number of spheres requested.
        spheres: u64,
        /// Digitized voxel volume requested for cement classes.
        target_cement: i64,
    },

    /// Emitted before the first sphere of a size class.
    ClassStarted {
        /// Index of the class in processing order (largest radius first).
        index: usize,
        /// The class being placed.
        class: SizeClass,
    },

    /// Emitted for every committed sphere.
    ParticlePlaced {
        id: ParticleId,
        /// Phase after sulfate assignment.
        phase: Phase,
        center: IVec3,
        radius: i32,
        /// Random centers drawn for this sphere.
        attempts: u32,
    },

    /// Emitted when the dispersion margin was relaxed after exhausting the attempt budget.
    DispersionRelaxed {
        /// Margin now in force.
        dispersion: i32,
    },

    /// Emitted when every class has been placed.
    PlacementFinished { report: PlacementReport },

    /// Emitted after every flocculation round.
    FlocRoundFinished {
        round: u64,
        /// Active clusters left after the round.
        clusters: usize,
    },

    /// Emitted when a moving cluster absorbs the cluster it struck.
    ClustersMerged {
        survivor: ClusterId,
        absorbed: ClusterId,
        /// Active clusters left after the merge.
        remaining: usize,
    },

    /// Emitted when flocculation stops, converged or not.
    FlocculationFinished { report: FlocReport },

    /// Emitted after a burn completes and the lattice was restored.
    ConnectivityMeasured { result: Connectivity },

    /// Non-fatal warning.
    Warning {
        /// Context string (e.g. class index, round).
        context: String,
        /// Human-readable message.
        message: String,
    },
}

/// Discriminant of [`MicroEvent`] used to filter what a sink wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MicroEventKind {
    PlacementStarted,
    ClassStarted,
    ParticlePlaced,
    DispersionRelaxed,
    PlacementFinished,
    FlocRoundFinished,
    ClustersMerged,
    FlocculationFinished,
    ConnectivityMeasured,
    Warning,
}

impl MicroEvent {
    pub fn kind(&self) -> MicroEventKind {
        match self {
            MicroEvent::PlacementStarted { .. } => MicroEventKind::PlacementStarted,
            MicroEvent::ClassStarted { .. } => MicroEventKind::ClassStarted,
            MicroEvent::ParticlePlaced { .. } => MicroEventKind::ParticlePlaced,
            MicroEvent::DispersionRelaxed { .. } => MicroEventKind::DispersionRelaxed,
            MicroEvent::PlacementFinished { .. } => MicroEventKind::PlacementFinished,
            MicroEvent::FlocRoundFinished { .. } => MicroEventKind::FlocRoundFinished,
            MicroEvent::ClustersMerged { .. } => MicroEventKind::ClustersMerged,
            MicroEvent::FlocculationFinished { .. } => MicroEventKind::FlocculationFinished,
            MicroEvent::ConnectivityMeasured { .. } => MicroEventKind::ConnectivityMeasured,
            MicroEvent::Warning { .. } => MicroEventKind::Warning,
        }
    }
}

/// A generic event sink that accepts [`MicroEvent`]s.
pub trait EventSink {
    fn send(&mut self, event: MicroEvent);

    /// Whether events of `kind` should be built at all. Engines skip constructing
    /// events nobody listens to.
    fn wants(&self, _kind: MicroEventKind) -> bool {
        true
    }

    fn send_many<I>(&mut self, events: I)
    where
        Self: Sized,
        I: IntoIterator<Item = MicroEvent>,
    {
        for e in events {
            self.send(e);
        }
    }
}

/// A no-op event sink.
impl EventSink for () {
    #[inline]
    fn send(&mut self, _event: MicroEvent) {}

    #[inline]
    fn wants(&self, _kind: MicroEventKind) -> bool {
        false
    }
}

/// An event sink that forwards to a user-provided closure.
pub struct FnSink<F>
where
    F: FnMut(MicroEvent),
{
    f: F,
}

impl<F> FnSink<F>
where
    F: FnMut(MicroEvent),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> EventSink for FnSink<F>
where
    F: FnMut(MicroEvent),
{
    #[inline]
    fn send(&mut self, event: MicroEvent) {
        (self.f)(event);
    }
}

/// An event sink that collects events in a `Vec`, optionally restricted to some kinds.
#[derive(Default)]
pub struct VecSink {
    events: Vec<MicroEvent>,
    only: Option<Vec<MicroEventKind>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collects only the listed kinds.
    pub fn only(kinds: &[MicroEventKind]) -> Self {
        Self {
            events: Vec::new(),
            only: Some(kinds.to_vec()),
        }
    }

    pub fn into_inner(self) -> Vec<MicroEvent> {
        self.events
    }

    pub fn as_slice(&self) -> &[MicroEvent] {
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
    fn send(&mut self, event: MicroEvent) {
        if self.wants(event.kind()) {
            self.events.push(event);
        }
    }

    fn wants(&self, kind: MicroEventKind) -> bool {
        self.only.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }
}

/// Fan-out sink that forwards each event to all contained sinks.
pub struct MultiSink<S: EventSink> {
    pub(crate) sinks: Vec<S>,
}

impl<S: EventSink> MultiSink<S> {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sinks(sinks: Vec<S>) -> Self {
        Self { sinks }
    }

    pub fn push(&mut self, sink: S) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }
}

impl<S: EventSink> Default for MultiSink<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: EventSink> EventSink for MultiSink<S> {
    fn send(&mut self, event: MicroEvent) {
        let kind = event.kind();
        let Some(last_idx) = self.sinks.iter().rposition(|s| s.wants(kind)) else {
            return;
        };
        for i in 0..last_idx {
            if self.sinks[i].wants(kind) {
                self.sinks[i].send(event.clone());
            }
        }
        self.sinks[last_idx].send(event);
    }

    fn wants(&self, kind: MicroEventKind) -> bool {
        self.sinks.iter().any(|s| s.wants(kind))
    }
}
