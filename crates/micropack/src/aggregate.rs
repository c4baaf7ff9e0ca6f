//! Flat aggregate slab centered on the x mid-plane.
use std::ops::RangeInclusive;

use tracing::info;

use crate::error::{Error, Result};
use crate::lattice::{Phase, AGGREGATE_CELL};
use crate::state::Microstructure;

/// A slab of even thickness spanning the full y-z cross-section.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateSlab {
    thickness: usize,
}

impl AggregateSlab {
    /// Validates an even, non-zero thickness that leaves at least two voxels of paste.
    pub fn new(thickness: usize, edge: usize) -> Result<Self> {
        if thickness == 0 || thickness % 2 != 0 || thickness + 2 > edge {
            return Err(Error::InvalidConfig(format!(
                "aggregate thickness must be a positive even integer <= {}, got {thickness}",
                edge.saturating_sub(2)
            )));
        }
        Ok(Self { thickness })
    }

    pub fn thickness(&self) -> usize {
        self.thickness
    }

    /// x coordinates covered by the slab.
    pub fn x_range(&self, edge: usize) -> RangeInclusive<i32> {
        let half = (edge / 2) as i32;
        let t = self.thickness as i32;
        (half - (t - 2) / 2)..=(half + t / 2)
    }

    /// Geometric exclusion band used by placement and flocculation probes.
    ///
    /// The band is centered on `(edge + 1) / 2` while [`AggregateSlab::x_range`] starts from
    /// `edge / 2`. They coincide for even edges. For odd edges the band misses the lowest
    /// stamped plane, which stays blocked through its sentinel cells.
    #[inline]
    pub fn excludes_x(&self, x: i32, edge: usize) -> bool {
        let center = (edge as f64 + 1.0) / 2.0;
        (x as f64 - center).abs() < self.thickness as f64 / 2.0
    }
}

/// Stamps a slab of `thickness` into both lattices and records it in the state.
///
/// A thickness of zero clears the recorded slab without touching the lattices.
pub fn insert_slab(state: &mut Microstructure, thickness: usize) -> Result<Option<AggregateSlab>> {
    let edge = state.edge();
    if thickness == 0 {
        state.set_aggregate(None);
        return Ok(None);
    }

    let slab = AggregateSlab::new(thickness, edge)?;
    let n = edge as i32;
    let grid = state.grid_mut();
    for x in slab.x_range(edge) {
        for y in 1..=n {
            for z in 1..=n {
                grid.set(glam::IVec3::new(x, y, z), AGGREGATE_CELL, Phase::Aggregate);
            }
        }
    }
    info!(
        "Aggregate slab of thickness {} placed at x = {:?}.",
        thickness,
        slab.x_range(edge)
    );
    state.set_aggregate(Some(slab));
    Ok(Some(slab))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::PhaseTally;

    #[test]
    fn thickness_must_be_even_and_leave_room() {
        assert!(AggregateSlab::new(3, 100).is_err());
        assert!(AggregateSlab::new(100, 100).is_err());
        assert!(AggregateSlab::new(98, 100).is_ok());
    }

    #[test]
    fn x_range_and_band_agree() {
        let slab = AggregateSlab::new(10, 100).unwrap();
        assert_eq!(slab.x_range(100), 46..=55);
        for x in 1..=100 {
            assert_eq!(slab.excludes_x(x, 100), slab.x_range(100).contains(&x), "x = {x}");
        }
    }

    #[test]
    fn odd_edges_block_the_low_plane_through_the_sentinel() {
        let slab = AggregateSlab::new(4, 11).unwrap();
        assert_eq!(slab.x_range(11), 4..=7);
        assert!(!slab.excludes_x(4, 11));
        assert!((5..=7).all(|x| slab.excludes_x(x, 11)));

        let mut state = Microstructure::new(11, -1).unwrap();
        insert_slab(&mut state, 4).unwrap();
        let hit = state
            .grid()
            .probe_sphere(glam::IVec3::new(3, 6, 6), 1, state.aggregate());
        assert_eq!(hit, Some(AGGREGATE_CELL));
    }

    #[test]
    fn insert_writes_full_cross_section() {
        let mut state = Microstructure::new(20, -1).unwrap();
        let slab = insert_slab(&mut state, 4).unwrap().unwrap();
        assert_eq!(state.aggregate(), Some(slab));

        let tally = PhaseTally::measure(state.grid());
        assert_eq!(tally.count(Phase::Aggregate), 4 * 20 * 20);
        assert_eq!(
            state.grid().count_particle_cells(AGGREGATE_CELL),
            4 * 20 * 20
        );
    }

    #[test]
    fn zero_thickness_clears_the_band() {
        let mut state = Microstructure::new(20, -1).unwrap();
        insert_slab(&mut state, 2).unwrap();
        assert!(insert_slab(&mut state, 0).unwrap().is_none());
        assert!(state.aggregate().is_none());
    }
}
