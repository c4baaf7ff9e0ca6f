//! Randomized, collision-checked sphere placement.
//!
//! Size classes are placed largest radius first. Every sphere draws random centers until its
//! digitized volume, grown by the dispersion margin, meets only porosity and stays clear of the
//! aggregate band. Cement classes are then split into clinker and calcium sulfates by a
//! [`SulfateBudget`].
use glam::IVec3;
use tracing::{debug, info, warn};

use crate::catalog::ParticleId;
use crate::error::{Error, Result};
use crate::events::{EventSink, MicroEvent, MicroEventKind};
use crate::lattice::{sphere_volume, Cell, Phase, MAX_TABLE_RADIUS};
use crate::state::Microstructure;

pub mod sulfate;

pub use sulfate::SulfateBudget;

/// Random centers tried per sphere before giving up (or relaxing the margin).
pub const MAX_ATTEMPTS: u32 = 150_000;

/// Upper bound on the number of size classes in one call.
pub const MAX_SIZE_CLASSES: usize = 200;

/// Largest dispersion margin accepted.
pub const MAX_DISPERSION: i32 = 2;

/// `count` spheres of one radius and phase.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClass {
    pub count: u32,
    pub radius: i32,
    pub phase: Phase,
}

impl SizeClass {
    pub fn new(count: u32, radius: i32, phase: Phase) -> Self {
        Self {
            count,
            radius,
            phase,
        }
    }

    /// Digitized voxel count of one sphere of this class.
    pub fn volume(&self) -> u64 {
        sphere_volume(self.radius)
    }

    /// Checks the class against a lattice of edge `edge` and the margin in force.
    pub fn validate(&self, edge: usize, dispersion: i32) -> Result<()> {
        if self.radius < 1 {
            return Err(Error::InvalidConfig(format!(
                "radius must be >= 1, got {}",
                self.radius
            )));
        }
        if self.radius + dispersion > MAX_TABLE_RADIUS {
            return Err(Error::InvalidConfig(format!(
                "radius {} plus dispersion {} exceeds {}",
                self.radius, dispersion, MAX_TABLE_RADIUS
            )));
        }
        if 2 * self.radius as usize + 1 > edge {
            return Err(Error::InvalidConfig(format!(
                "a sphere of radius {} does not fit in a lattice of edge {}",
                self.radius, edge
            )));
        }
        if !self.phase.is_placeable() {
            return Err(Error::InvalidConfig(format!(
                "phase {} cannot be placed as particles",
                self.phase
            )));
        }
        Ok(())
    }
}

/// Configuration for one placement call.
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementConfig {
    /// Extra empty shell, in voxels, required around each sphere while testing fit.
    pub dispersion: i32,
    /// Probability that a cement sphere becomes a calcium sulfate.
    pub gypsum_probability: f32,
    /// Share of the sulfate volume placed as hemihydrate.
    pub hemihydrate_probability: f32,
    /// Share of the sulfate volume placed as anhydrite.
    pub anhydrite_probability: f32,
    /// Random centers tried per sphere.
    pub max_attempts: u32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            dispersion: 0,
            gypsum_probability: 0.0,
            hemihydrate_probability: 0.0,
            anhydrite_probability: 0.0,
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl PlacementConfig {
    pub fn new(dispersion: i32) -> Self {
        Self {
            dispersion,
            ..Default::default()
        }
    }

    pub fn with_dispersion(mut self, dispersion: i32) -> Self {
        self.dispersion = dispersion;
        self
    }

    pub fn with_gypsum_probability(mut self, probability: f32) -> Self {
        self.gypsum_probability = probability;
        self
    }

    /// Sets the hemihydrate and anhydrite shares of the sulfate volume.
    pub fn with_sulfate_split(mut self, hemihydrate: f32, anhydrite: f32) -> Self {
        self.hemihydrate_probability = hemihydrate;
        self.anhydrite_probability = anhydrite;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0..=MAX_DISPERSION).contains(&self.dispersion) {
            return Err(Error::InvalidConfig(format!(
                "dispersion must be in 0..={MAX_DISPERSION}, got {}",
                self.dispersion
            )));
        }
        for (name, p) in [
            ("gypsum_probability", self.gypsum_probability),
            ("hemihydrate_probability", self.hemihydrate_probability),
            ("anhydrite_probability", self.anhydrite_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(Error::InvalidConfig(format!(
                    "{name} must be in [0, 1], got {p}"
                )));
            }
        }
        if self.hemihydrate_probability + self.anhydrite_probability > 1.001 {
            return Err(Error::InvalidConfig(
                "hemihydrate and anhydrite probabilities must sum to <= 1".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(Error::InvalidConfig("max_attempts must be > 0".into()));
        }
        Ok(())
    }
}

/// Outcome of a placement call.
#[non_exhaustive]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlacementReport {
    /// Ids created by this call, in creation order.
    pub placed: Vec<ParticleId>,
    /// Random centers drawn across all spheres.
    pub attempts: u64,
    /// Margin in force when the call returned.
    pub final_dispersion: i32,
    /// Sulfate targets and what was actually booked against them.
    pub sulfate: SulfateBudget,
}

impl PlacementReport {
    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }
}

/// Runs placement for a fixed configuration.
pub struct PlacementEngine {
    pub config: PlacementConfig,
}

impl PlacementEngine {
    pub fn try_new(config: PlacementConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn new(config: PlacementConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid placement config");
        Self { config }
    }

    pub fn run(
        &mut self,
        state: &mut Microstructure,
        classes: &[SizeClass],
    ) -> Result<PlacementReport> {
        place_classes(state, &self.config, classes)
    }

    pub fn run_with_events(
        &mut self,
        state: &mut Microstructure,
        classes: &[SizeClass],
        sink: &mut dyn EventSink,
    ) -> Result<PlacementReport> {
        place_classes_with_events(state, &self.config, classes, sink)
    }
}

/// Places every class into `state`, largest radius first.
pub fn place_classes(
    state: &mut Microstructure,
    config: &PlacementConfig,
    classes: &[SizeClass],
) -> Result<PlacementReport> {
    place_classes_with_events(state, config, classes, &mut ())
}

pub fn place_classes_with_events(
    state: &mut Microstructure,
    config: &PlacementConfig,
    classes: &[SizeClass],
    sink: &mut dyn EventSink,
) -> Result<PlacementReport> {
    config.validate()?;
    if classes.len() > MAX_SIZE_CLASSES {
        return Err(Error::InvalidConfig(format!(
            "at most {MAX_SIZE_CLASSES} size classes are supported, got {}",
            classes.len()
        )));
    }
    let edge = state.edge();
    for class in classes {
        class.validate(edge, config.dispersion)?;
    }

    let mut ordered = classes.to_vec();
    ordered.sort_by(|a, b| b.radius.cmp(&a.radius));

    let mut budget = SulfateBudget::new(config, &ordered);
    let spheres: u64 = ordered.iter().map(|c| u64::from(c.count)).sum();
    info!(
        "Placing {} spheres in {} size classes, cement target {} voxels.",
        spheres,
        ordered.len(),
        budget.target_total
    );
    if sink.wants(MicroEventKind::PlacementStarted) {
        sink.send(MicroEvent::PlacementStarted {
            classes: ordered.len(),
            spheres,
            target_cement: budget.target_total,
        });
    }

    let mut report = PlacementReport::default();
    let mut margin = config.dispersion;
    let parts = state.parts_mut();

    for (index, class) in ordered.iter().enumerate() {
        info!(
            "Class {}: {} x radius {} as {}.",
            index, class.count, class.radius, class.phase
        );
        if sink.wants(MicroEventKind::ClassStarted) {
            sink.send(MicroEvent::ClassStarted {
                index,
                class: *class,
            });
        }

        for _ in 0..class.count {
            let mut attempts: u32 = 0;
            let center = loop {
                attempts += 1;
                report.attempts += 1;
                let candidate = IVec3::new(
                    parts.rng.next_coordinate(edge),
                    parts.rng.next_coordinate(edge),
                    parts.rng.next_coordinate(edge),
                );
                let blocked = parts
                    .grid
                    .probe_sphere(candidate, class.radius + margin, parts.aggregate)
                    .is_some();

                if attempts > config.max_attempts && margin == MAX_DISPERSION {
                    attempts = 0;
                    margin -= 1;
                    warn!(
                        "Relaxing dispersion to {} after {} failed attempts in class {}.",
                        margin, config.max_attempts, index
                    );
                    if sink.wants(MicroEventKind::DispersionRelaxed) {
                        sink.send(MicroEvent::DispersionRelaxed { dispersion: margin });
                    }
                }
                if attempts > config.max_attempts {
                    return Err(Error::PlacementExhausted {
                        particle: parts.catalog.len() as u32 + 1,
                        attempts: config.max_attempts,
                    });
                }
                if !blocked {
                    break candidate;
                }
            };

            let id = parts.catalog.create(class.phase, center, class.radius)?;
            let phase = if class.phase == Phase::Cement {
                budget.assign(parts.rng, class.volume() as i64, class.count)
            } else {
                class.phase
            };
            if phase != class.phase {
                parts.catalog.set_phase(id, phase);
            }
            parts
                .grid
                .draw_sphere(center, class.radius, Cell::encode_particle(id), phase);
            report.placed.push(id);

            debug!(
                "Particle {} ({}) at {:?}, radius {}, after {} attempts.",
                id, phase, center, class.radius, attempts
            );
            if sink.wants(MicroEventKind::ParticlePlaced) {
                sink.send(MicroEvent::ParticlePlaced {
                    id,
                    phase,
                    center,
                    radius: class.radius,
                    attempts,
                });
            }
        }
    }

    report.final_dispersion = margin;
    report.sulfate = budget;
    info!(
        "Placed {} spheres, {} sulfate voxels of {} cement voxels.",
        report.placed.len(),
        budget.placed_sulfate,
        budget.placed_total
    );
    if sink.wants(MicroEventKind::PlacementFinished) {
        sink.send(MicroEvent::PlacementFinished {
            report: report.clone(),
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PhaseTally;
    use crate::events::VecSink;
    use crate::lattice::min_image_distance;

    #[test]
    fn config_rejects_out_of_range_values() {
        assert!(PlacementConfig::new(3).validate().is_err());
        assert!(PlacementConfig::new(-1).validate().is_err());
        assert!(PlacementConfig::default()
            .with_gypsum_probability(1.5)
            .validate()
            .is_err());
        assert!(PlacementConfig::default()
            .with_sulfate_split(0.6, 0.6)
            .validate()
            .is_err());
        assert!(PlacementConfig::default()
            .with_sulfate_split(0.5, 0.5)
            .validate()
            .is_ok());
        assert!(PlacementEngine::try_new(PlacementConfig::default().with_max_attempts(0)).is_err());
    }

    #[test]
    fn class_validation_checks_radius_and_phase() {
        assert!(SizeClass::new(1, 0, Phase::Cement).validate(20, 0).is_err());
        assert!(SizeClass::new(1, 10, Phase::Cement).validate(20, 0).is_err());
        assert!(SizeClass::new(1, 35, Phase::Cement).validate(100, 2).is_err());
        assert!(SizeClass::new(1, 3, Phase::Aggregate).validate(20, 0).is_err());
        assert!(SizeClass::new(1, 3, Phase::FlyAsh).validate(20, 2).is_ok());
    }

    #[test]
    fn single_sphere_writes_its_digitized_volume() {
        let mut state = Microstructure::new(30, -7).unwrap();
        let classes = [SizeClass::new(1, 4, Phase::Inert)];
        let report = place_classes(&mut state, &PlacementConfig::default(), &classes).unwrap();
        assert_eq!(report.placed_count(), 1);
        assert_eq!(state.grid().solid_voxel_count(), 389);
        let tally = PhaseTally::measure(state.grid());
        assert_eq!(tally.count(Phase::Inert), 389);
    }

    #[test]
    fn larger_classes_are_placed_first() {
        let mut state = Microstructure::new(30, -3).unwrap();
        let classes = [
            SizeClass::new(3, 1, Phase::Slag),
            SizeClass::new(2, 3, Phase::Pozzolan),
        ];
        let mut sink = VecSink::only(&[MicroEventKind::ClassStarted]);
        place_classes_with_events(&mut state, &PlacementConfig::default(), &classes, &mut sink)
            .unwrap();
        let radii: Vec<i32> = sink
            .as_slice()
            .iter()
            .filter_map(|e| match e {
                MicroEvent::ClassStarted { class, .. } => Some(class.radius),
                _ => None,
            })
            .collect();
        assert_eq!(radii, vec![3, 1]);
        assert_eq!(state.catalog().particles()[0].radius, 3);
        assert_eq!(state.catalog().particles()[4].radius, 1);
    }

    #[test]
    fn dispersion_keeps_spheres_apart() {
        let mut state = Microstructure::new(40, -21).unwrap();
        let classes = [SizeClass::new(20, 2, Phase::Cement)];
        place_classes(&mut state, &PlacementConfig::new(2), &classes).unwrap();
        let particles = state.catalog().particles();
        for (i, a) in particles.iter().enumerate() {
            for b in &particles[i + 1..] {
                let d = min_image_distance(a.center, b.center, 40);
                assert!(d >= (a.radius + b.radius + 2) as f64 - 1.0, "{d}");
            }
        }
    }

    #[test]
    fn crowded_lattice_exhausts_attempts() {
        let mut state = Microstructure::new(7, -1).unwrap();
        let classes = [SizeClass::new(10, 3, Phase::Inert)];
        let config = PlacementConfig::default().with_max_attempts(50);
        let err = place_classes(&mut state, &config, &classes).unwrap_err();
        matches!(err, Error::PlacementExhausted { particle: 2, attempts: 50 })
            .then_some(())
            .expect("second sphere cannot fit");
    }

    #[test]
    fn margin_two_relaxes_before_failing() {
        let mut state = Microstructure::new(7, -5).unwrap();
        let classes = [SizeClass::new(2, 3, Phase::Inert)];
        let config = PlacementConfig::new(2).with_max_attempts(5);
        let mut sink = VecSink::only(&[MicroEventKind::DispersionRelaxed]);
        let err =
            place_classes_with_events(&mut state, &config, &classes, &mut sink).unwrap_err();
        matches!(err, Error::PlacementExhausted { particle: 2, .. })
            .then_some(())
            .expect("second sphere cannot fit");
        assert_eq!(sink.len(), 1);
        matches!(sink.as_slice()[0], MicroEvent::DispersionRelaxed { dispersion: 1 })
            .then_some(())
            .expect("margin relaxed to one");
        assert_eq!(state.grid().solid_voxel_count(), 179);
    }

    #[test]
    fn catalog_overflow_is_fatal() {
        let mut state = Microstructure::with_capacity(30, -2, 3).unwrap();
        let classes = [SizeClass::new(5, 1, Phase::Inert)];
        let err = place_classes(&mut state, &PlacementConfig::default(), &classes).unwrap_err();
        matches!(err, Error::CatalogFull { capacity: 3 })
            .then_some(())
            .expect("capacity reached");
        assert_eq!(state.catalog().len(), 2);
    }

    #[test]
    fn aggregate_band_is_avoided() {
        let mut state = Microstructure::new(30, -9).unwrap();
        crate::aggregate::insert_slab(&mut state, 6).unwrap();
        let classes = [SizeClass::new(15, 2, Phase::Cement)];
        place_classes(&mut state, &PlacementConfig::default(), &classes).unwrap();
        let slab = state.aggregate().unwrap();
        for p in state.catalog().particles() {
            for x in p.center.x - p.radius..=p.center.x + p.radius {
                let x = crate::lattice::wrap_coord(x, 30);
                assert!(!slab.excludes_x(x, 30));
            }
        }
    }
}
