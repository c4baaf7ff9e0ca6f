//! Flocculation: clusters random-walk one voxel at a time and stick on contact.
//!
//! Each round visits every active cluster in ascending id order. A cluster is lifted off the
//! lattice, probed one member at a time at the shifted position, and either redrawn there or,
//! on contact, redrawn where it was. Contact with another particle merges that particle's
//! cluster into the mover; contact with the aggregate slab only blocks the step.
use glam::IVec3;
use tracing::{debug, info, warn};

use crate::catalog::{ClusterId, ParticleId};
use crate::error::{Error, Result};
use crate::events::{EventSink, MicroEvent, MicroEventKind};
use crate::lattice::{wrap_position, Cell, Phase};
use crate::state::Microstructure;

/// Unit steps indexed by `trunc(6u)`.
const STEPS: [IVec3; 6] = [
    IVec3::new(1, 0, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(0, 0, 1),
    IVec3::new(0, 0, -1),
];

/// Stopping rule for [`flocculate`].
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlocConfig {
    /// Rounds stop once at most this many clusters remain.
    pub target_clusters: usize,
    /// Optional cap on the number of rounds.
    pub max_rounds: Option<u64>,
}

impl FlocConfig {
    pub fn new(target_clusters: usize) -> Self {
        Self {
            target_clusters,
            max_rounds: None,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: u64) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_clusters == 0 {
            return Err(Error::InvalidConfig("target_clusters must be > 0".into()));
        }
        if self.max_rounds == Some(0) {
            return Err(Error::InvalidConfig("max_rounds must be > 0".into()));
        }
        Ok(())
    }
}

/// Summary of a flocculation call.
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlocReport {
    pub rounds: u64,
    pub merges: u64,
    pub clusters_remaining: usize,
    /// False when the round cap stopped the walk above the target.
    pub converged: bool,
}

/// Runs flocculation for a fixed configuration.
pub struct FlocculationEngine {
    pub config: FlocConfig,
}

impl FlocculationEngine {
    pub fn try_new(config: FlocConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn run(&mut self, state: &mut Microstructure) -> Result<FlocReport> {
        flocculate(state, &self.config)
    }

    pub fn run_with_events(
        &mut self,
        state: &mut Microstructure,
        sink: &mut dyn EventSink,
    ) -> Result<FlocReport> {
        flocculate_with_events(state, &self.config, sink)
    }
}

/// A member snapshot taken before its cluster is lifted.
#[derive(Debug, Clone, Copy)]
struct Member {
    id: ParticleId,
    center: IVec3,
    radius: i32,
    phase: Phase,
}

enum StepOutcome {
    Moved,
    Blocked,
    Struck(ClusterId),
}

/// Walks clusters until at most `config.target_clusters` remain.
pub fn flocculate(state: &mut Microstructure, config: &FlocConfig) -> Result<FlocReport> {
    flocculate_with_events(state, config, &mut ())
}

pub fn flocculate_with_events(
    state: &mut Microstructure,
    config: &FlocConfig,
    sink: &mut dyn EventSink,
) -> Result<FlocReport> {
    config.validate()?;

    let edge = state.edge() as i32;
    let parts = state.parts_mut();
    let mut report = FlocReport {
        converged: true,
        ..FlocReport::default()
    };
    let mut members: Vec<Member> = Vec::new();

    info!(
        "Flocculating {} clusters down to {}.",
        parts.catalog.active_count(),
        config.target_clusters
    );

    while parts.catalog.active_count() > config.target_clusters {
        if config.max_rounds.is_some_and(|cap| report.rounds >= cap) {
            report.converged = false;
            warn!(
                "Flocculation stopped after {} rounds with {} clusters left (target {}).",
                report.rounds,
                parts.catalog.active_count(),
                config.target_clusters
            );
            if sink.wants(MicroEventKind::Warning) {
                sink.send(MicroEvent::Warning {
                    context: format!("round {}", report.rounds),
                    message: "round cap reached before the cluster target".into(),
                });
            }
            break;
        }
        report.rounds += 1;

        for raw in 1..=parts.catalog.len() as u32 {
            let cluster = ClusterId::new(raw);
            if !parts.catalog.is_active(cluster) {
                continue;
            }
            let step = STEPS[((6.0 * parts.rng.next_uniform()) as usize).min(5)];

            members.clear();
            for id in parts.catalog.members(cluster) {
                if let Some(p) = parts.catalog.get(id) {
                    members.push(Member {
                        id,
                        center: p.center,
                        radius: p.radius,
                        phase: p.phase,
                    });
                }
            }

            for m in &members {
                parts
                    .grid
                    .erase_sphere(m.center, m.radius, Cell::encode_particle(m.id));
            }

            // A corrupt strike still puts the cluster back before the error surfaces.
            let mut outcome = Ok(StepOutcome::Moved);
            for m in &members {
                let trial = m.center + step;
                let Some(value) = parts.grid.probe_sphere(trial, m.radius, parts.aggregate) else {
                    continue;
                };
                let struck = match Cell::decode(value) {
                    Cell::Particle(hit) => parts.catalog.cluster_of(hit),
                    _ => None,
                };
                outcome = match (Cell::decode(value), struck) {
                    (Cell::Aggregate, _) => Ok(StepOutcome::Blocked),
                    (Cell::Particle(_), Some(struck)) if struck != cluster => {
                        Ok(StepOutcome::Struck(struck))
                    }
                    _ => Err(Error::CorruptCell {
                        value,
                        position: wrap_position(trial, edge),
                    }),
                };
                break;
            }

            match outcome {
                Ok(StepOutcome::Moved) => {
                    for m in &members {
                        let moved = wrap_position(m.center + step, edge);
                        parts
                            .grid
                            .draw_sphere(moved, m.radius, Cell::encode_particle(m.id), m.phase);
                        parts.catalog.set_center(m.id, moved);
                    }
                }
                Ok(StepOutcome::Blocked | StepOutcome::Struck(_)) | Err(_) => {
                    for m in &members {
                        parts.grid.draw_sphere(
                            m.center,
                            m.radius,
                            Cell::encode_particle(m.id),
                            m.phase,
                        );
                    }
                }
            }

            if let StepOutcome::Struck(struck) = outcome? {
                parts.catalog.merge_clusters(cluster, struck)?;
                report.merges += 1;
                let remaining = parts.catalog.active_count();
                debug!(
                    "Cluster {} absorbed cluster {}, {} clusters left.",
                    cluster, struck, remaining
                );
                if sink.wants(MicroEventKind::ClustersMerged) {
                    sink.send(MicroEvent::ClustersMerged {
                        survivor: cluster,
                        absorbed: struck,
                        remaining,
                    });
                }
            }
        }

        let clusters = parts.catalog.active_count();
        debug!("Round {} finished with {} clusters.", report.rounds, clusters);
        if sink.wants(MicroEventKind::FlocRoundFinished) {
            sink.send(MicroEvent::FlocRoundFinished {
                round: report.rounds,
                clusters,
            });
        }
    }

    report.clusters_remaining = parts.catalog.active_count();
    info!(
        "Flocculation finished after {} rounds and {} merges, {} clusters left.",
        report.rounds, report.merges, report.clusters_remaining
    );
    if sink.wants(MicroEventKind::FlocculationFinished) {
        sink.send(MicroEvent::FlocculationFinished { report });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PhaseTally;
    use crate::events::VecSink;
    use crate::placement::{place_classes, PlacementConfig, SizeClass};

    fn populated(edge: usize, seed: i32, classes: &[SizeClass]) -> Microstructure {
        let mut state = Microstructure::new(edge, seed).unwrap();
        place_classes(&mut state, &PlacementConfig::default(), classes).unwrap();
        state
    }

    #[test]
    fn zero_target_is_rejected() {
        assert!(FlocConfig::new(0).validate().is_err());
        assert!(FlocConfig::new(1).with_max_rounds(0).validate().is_err());
        assert!(FlocculationEngine::try_new(FlocConfig::new(3)).is_ok());
    }

    #[test]
    fn target_at_or_above_active_count_is_a_no_op() {
        let mut state = populated(20, -13, &[SizeClass::new(6, 1, Phase::Cement)]);
        let before = state.grid().clone();
        let report = flocculate(&mut state, &FlocConfig::new(6)).unwrap();
        assert_eq!(report.rounds, 0);
        assert_eq!(report.merges, 0);
        assert_eq!(report.clusters_remaining, 6);
        assert!(report.converged);
        assert_eq!(state.grid(), &before);
    }

    #[test]
    fn flocculation_merges_down_to_target_and_conserves_phases() {
        let mut state = populated(
            16,
            -29,
            &[
                SizeClass::new(6, 2, Phase::Cement),
                SizeClass::new(6, 1, Phase::Inert),
            ],
        );
        let before = PhaseTally::measure(state.grid());
        let mut engine = FlocculationEngine::try_new(FlocConfig::new(3)).unwrap();
        let report = engine.run(&mut state).unwrap();

        assert!(report.converged);
        assert!(report.clusters_remaining <= 3);
        assert_eq!(report.merges, 12 - report.clusters_remaining as u64);
        assert_eq!(state.catalog().active_count(), report.clusters_remaining);

        let after = PhaseTally::measure(state.grid());
        for phase in Phase::ALL {
            assert_eq!(before.count(phase), after.count(phase), "{phase}");
        }
        for p in state.catalog().particles() {
            assert!((1..=16).contains(&p.center.x));
            assert!((1..=16).contains(&p.center.y));
            assert!((1..=16).contains(&p.center.z));
            assert_eq!(
                state.grid().count_particle_cells(Cell::encode_particle(p.id)) as u64,
                crate::lattice::sphere_volume(p.radius)
            );
        }
    }

    #[test]
    fn round_cap_reports_non_convergence() {
        let mut state = populated(30, -2, &[SizeClass::new(4, 1, Phase::Slag)]);
        let mut sink = VecSink::only(&[
            MicroEventKind::FlocRoundFinished,
            MicroEventKind::FlocculationFinished,
        ]);
        let report =
            flocculate_with_events(&mut state, &FlocConfig::new(1).with_max_rounds(1), &mut sink)
                .unwrap();
        assert_eq!(report.rounds, 1);
        if report.clusters_remaining > 1 {
            assert!(!report.converged);
        }
        assert_eq!(sink.len(), 2);
        matches!(
            sink.as_slice()[1],
            MicroEvent::FlocculationFinished { report: r } if r == report
        )
        .then_some(())
        .expect("final report published");
    }

    fn place_by_hand(state: &mut Microstructure, center: IVec3, radius: i32) -> ParticleId {
        let parts = state.parts_mut();
        let id = parts.catalog.create(Phase::Inert, center, radius).unwrap();
        parts
            .grid
            .draw_sphere(center, radius, Cell::encode_particle(id), Phase::Inert);
        id
    }

    fn fill_empty_cells(state: &mut Microstructure, value: u16, phase: Phase) {
        let edge = state.edge() as i32;
        for z in 1..=edge {
            for y in 1..=edge {
                for x in 1..=edge {
                    let p = IVec3::new(x, y, z);
                    if state.grid().particle_cell(p) == 0 {
                        state.grid_mut().set(p, value, phase);
                    }
                }
            }
        }
    }

    #[test]
    fn aggregate_blocks_without_merging() {
        let mut state = Microstructure::new(10, -3).unwrap();
        place_by_hand(&mut state, IVec3::new(3, 3, 3), 1);
        place_by_hand(&mut state, IVec3::new(8, 8, 8), 1);
        fill_empty_cells(&mut state, crate::lattice::AGGREGATE_CELL, Phase::Aggregate);
        let before = state.grid().clone();

        let report = flocculate(&mut state, &FlocConfig::new(1).with_max_rounds(3)).unwrap();
        assert_eq!(report.rounds, 3);
        assert_eq!(report.merges, 0);
        assert!(!report.converged);
        assert_eq!(state.grid(), &before);
        assert_eq!(state.catalog().particles()[0].center, IVec3::new(3, 3, 3));
    }

    #[test]
    fn corrupt_cells_abort_the_walk() {
        let mut state = Microstructure::new(12, -8).unwrap();
        place_by_hand(&mut state, IVec3::new(3, 3, 3), 1);
        place_by_hand(&mut state, IVec3::new(9, 9, 9), 1);
        fill_empty_cells(&mut state, 50, Phase::Porosity);
        let before = state.grid().clone();
        let mover = Cell::encode_particle(ParticleId::new(1));
        assert_eq!(before.count_particle_cells(mover), 19);

        let err = flocculate(&mut state, &FlocConfig::new(1)).unwrap_err();
        matches!(err, Error::CorruptCell { value: 50, .. })
            .then_some(())
            .expect("unknown cell value");
        assert_eq!(state.grid().count_particle_cells(mover), 19);
        assert_eq!(state.grid(), &before);
    }
}
