//! Running volumetric budget that turns some cement spheres into calcium sulfates.
//!
//! Targets are fixed once per placement call from the total digitized cement volume
//! requested. Each cement sphere then either stays cement or is re-assigned to anhydrite,
//! hemihydrate, or gypsum, depending on two variates and the headroom left under each target.
use crate::lattice::Phase;
use crate::placement::{PlacementConfig, SizeClass};
use crate::random::Ran1;

/// Targets and running voxel counts for the sulfate sub-phases.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SulfateBudget {
    pub gypsum_probability: f32,
    pub hemihydrate_probability: f32,
    pub anhydrite_probability: f32,
    /// Digitized volume requested across all cement classes.
    pub target_total: i64,
    pub target_sulfate: i64,
    pub target_anhydrite: i64,
    pub target_hemihydrate: i64,
    /// Cement-class volume placed so far, whatever phase it ended up as.
    pub placed_total: i64,
    pub placed_sulfate: i64,
    pub placed_anhydrite: i64,
    pub placed_hemihydrate: i64,
}

impl SulfateBudget {
    pub fn new(config: &PlacementConfig, classes: &[SizeClass]) -> Self {
        let target_total: i64 = classes
            .iter()
            .filter(|c| c.phase == Phase::Cement)
            .map(|c| i64::from(c.count) * c.volume() as i64)
            .sum();
        let p_gyp = config.gypsum_probability;
        let total = target_total as f32;
        Self {
            gypsum_probability: p_gyp,
            hemihydrate_probability: config.hemihydrate_probability,
            anhydrite_probability: config.anhydrite_probability,
            target_total,
            target_sulfate: (total * p_gyp) as i64,
            target_anhydrite: (total * p_gyp * config.anhydrite_probability) as i64,
            target_hemihydrate: (total * p_gyp * config.hemihydrate_probability) as i64,
            ..Self::default()
        }
    }

    /// Whether a cement sphere of `volume` stays cement for gypsum draw `draw`.
    pub fn keeps_cement(&self, draw: f32, volume: i64, class_count: u32) -> bool {
        let sulfate_left = self.target_sulfate - self.placed_sulfate;
        let total_left = self.target_total - self.placed_total;
        (draw > self.gypsum_probability && sulfate_left < total_left)
            || self.placed_sulfate > self.target_sulfate
            || volume > sulfate_left
            || class_count <= 2
    }

    /// Sulfate form for a sphere already committed to the sulfate budget, given draw `draw`.
    pub fn sulfate_form(&self, draw: f32, volume: i64) -> Phase {
        let p_anh = self.anhydrite_probability;
        let p_both = self.anhydrite_probability + self.hemihydrate_probability;
        let anh_left = self.target_anhydrite - self.placed_anhydrite;
        let hem_left = self.target_hemihydrate - self.placed_hemihydrate;

        if p_anh >= 1.0
            || (draw < p_anh && self.placed_anhydrite < self.target_anhydrite && volume <= anh_left)
        {
            Phase::Anhydrite
        } else if p_both >= 1.0
            || (draw < p_both
                && self.placed_hemihydrate < self.target_hemihydrate
                && volume <= hem_left)
        {
            Phase::Hemihydrate
        } else {
            Phase::Gypsum
        }
    }

    /// Decides the phase of one cement sphere, drawing one or two variates, and books its volume.
    pub fn assign(&mut self, rng: &mut Ran1, volume: i64, class_count: u32) -> Phase {
        let gypsum_draw = rng.next_uniform() as f32;
        let phase = if self.keeps_cement(gypsum_draw, volume, class_count) {
            Phase::Cement
        } else {
            self.placed_sulfate += volume;
            let form_draw = rng.next_uniform() as f32;
            let phase = self.sulfate_form(form_draw, volume);
            match phase {
                Phase::Anhydrite => self.placed_anhydrite += volume,
                Phase::Hemihydrate => self.placed_hemihydrate += volume,
                _ => {}
            }
            phase
        };
        self.placed_total += volume;
        phase
    }

    /// Fraction of the cement volume placed as sulfate; zero when no cement was requested.
    pub fn sulfate_fraction(&self) -> f64 {
        if self.placed_total == 0 {
            0.0
        } else {
            self.placed_sulfate as f64 / self.placed_total as f64
        }
    }
}
