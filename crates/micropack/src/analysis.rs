//! Phase tallies over the whole lattice and by distance from the aggregate slab.
use std::fmt;

use glam::IVec3;

use crate::aggregate::AggregateSlab;
use crate::lattice::{Phase, VoxelGrid};

/// Voxel count per phase.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTally {
    counts: [u64; Phase::ALL.len()],
    total: u64,
}

impl PhaseTally {
    /// Tallies every voxel of the phase grid.
    pub fn measure(grid: &VoxelGrid) -> Self {
        let mut tally = Self::default();
        for &code in grid.phases() {
            tally.record(code);
        }
        tally
    }

    /// Counts one phase code. Codes outside the phase table count toward the total only.
    pub fn record(&mut self, code: u8) {
        self.total += 1;
        if let Some(phase) = Phase::from_code(code) {
            self.counts[phase.index()] += 1;
        }
    }

    pub fn count(&self, phase: Phase) -> u64 {
        self.counts[phase.index()]
    }

    /// Voxels examined, including any with an unknown code.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Share of `phase` among the examined voxels; zero for an empty tally.
    pub fn fraction(&self, phase: Phase) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.count(phase) as f64 / self.total as f64
        }
    }

    /// Phases paired with their counts, in code order.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, u64)> + '_ {
        Phase::ALL.iter().map(|&p| (p, self.count(p)))
    }
}

impl fmt::Display for PhaseTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (phase, count) in self.iter() {
            writeln!(f, "{:<12} {:>9} {:>8.4}", phase.name(), count, self.fraction(phase))?;
        }
        Ok(())
    }
}

/// Tally of the two x-planes lying `distance` voxels outside the slab faces.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistanceBin {
    pub distance: usize,
    pub tally: PhaseTally,
}

/// Phase tallies on the planes at distance 1, 2, ... from each slab face, out to the midpoint
/// of the paste between periodic images of the slab.
pub fn distance_profile(grid: &VoxelGrid, slab: AggregateSlab) -> Vec<DistanceBin> {
    let n = grid.edge();
    let t = slab.thickness();
    let edge = n as i32;
    let lo_face = ((n - t + 2) / 2) as i32;
    let hi_face = ((n + t) / 2) as i32;

    (1..=(n - t) / 2)
        .map(|distance| {
            let d = distance as i32;
            let mut tally = PhaseTally::default();
            for x in [lo_face - d, hi_face + d] {
                for y in 1..=edge {
                    for z in 1..=edge {
                        tally.record(grid.phase_code(IVec3::new(x, y, z)));
                    }
                }
            }
            DistanceBin { distance, tally }
        })
        .collect()
}
