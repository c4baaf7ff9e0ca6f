//! Top-to-bottom connectivity of porosity or solids by burning the particle grid.
//!
//! Burns start from every voxel on the `z = 1` face whose column also ends in the selected
//! phase on `z = edge`, spread through face neighbors with periodic x and y, and never cross
//! the z faces. Visited voxels are tagged in place by adding [`BURN_OFFSET`]; every tag is
//! removed before the call returns.
use std::fmt;

use glam::IVec3;
use tracing::info;

use crate::catalog::MAX_PARTICLE_CELL;
use crate::error::Result;
use crate::events::{EventSink, MicroEvent, MicroEventKind};
use crate::lattice::{wrap_coord, VoxelGrid, EMPTY_CELL, FIRST_PARTICLE_CELL};

/// Added to a particle-grid value to mark it as burnt.
pub const BURN_OFFSET: u16 = 34_000;

const NEIGHBORS: [IVec3; 6] = [
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(0, 0, -1),
    IVec3::new(0, 0, 1),
];

/// Which voxels may burn.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseSelector {
    /// Empty particle-grid voxels.
    Porosity,
    /// Voxels owned by a particle. Aggregate does not count.
    Solid,
}

impl PhaseSelector {
    /// Menu code: 0 for pores, 1 for solids.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(PhaseSelector::Porosity),
            1 => Some(PhaseSelector::Solid),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            PhaseSelector::Porosity => 0,
            PhaseSelector::Solid => 1,
        }
    }

    /// Whether an unburnt voxel can catch fire.
    #[inline]
    fn is_fuel(self, value: u16) -> bool {
        match self {
            PhaseSelector::Porosity => value == EMPTY_CELL,
            PhaseSelector::Solid => (FIRST_PARTICLE_CELL..=MAX_PARTICLE_CELL).contains(&value),
        }
    }

    /// Bottom-face test for a seed column; a bottom voxel burnt by an earlier seed still counts.
    #[inline]
    fn matches_bottom(self, value: u16) -> bool {
        match self {
            PhaseSelector::Porosity => value == EMPTY_CELL || value == BURN_OFFSET,
            PhaseSelector::Solid => value >= FIRST_PARTICLE_CELL,
        }
    }
}

impl fmt::Display for PhaseSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseSelector::Porosity => write!(f, "porosity"),
            PhaseSelector::Solid => write!(f, "solids"),
        }
    }
}

/// Voxel counts produced by one burn.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connectivity {
    pub selector: PhaseSelector,
    /// Voxels reached from any seed on the top face.
    pub accessible_from_top: u64,
    /// Voxels in burns that reached the bottom face.
    pub through: u64,
}

impl Connectivity {
    /// Share of the top-accessible voxels lying on through paths; zero when nothing burnt.
    pub fn through_fraction(&self) -> f64 {
        if self.accessible_from_top == 0 {
            0.0
        } else {
            self.through as f64 / self.accessible_from_top as f64
        }
    }
}

/// Burn tags on the particle grid, removed on drop.
struct BurnMarks<'a> {
    grid: &'a mut VoxelGrid,
    tagged: Vec<usize>,
}

impl<'a> BurnMarks<'a> {
    fn new(grid: &'a mut VoxelGrid) -> Self {
        Self {
            grid,
            tagged: Vec::new(),
        }
    }

    /// Index of `p` with x and y wrapped; z must already lie on the lattice.
    #[inline]
    fn locate(&self, p: IVec3) -> Result<usize> {
        let edge = self.grid.edge() as i32;
        self.grid
            .checked_index(IVec3::new(wrap_coord(p.x, edge), wrap_coord(p.y, edge), p.z))
    }

    #[inline]
    fn value(&self, index: usize) -> u16 {
        self.grid.particles()[index]
    }

    #[inline]
    fn tag(&mut self, index: usize) {
        self.grid.particles_mut()[index] += BURN_OFFSET;
        self.tagged.push(index);
    }
}

impl Drop for BurnMarks<'_> {
    fn drop(&mut self) {
        let cells = self.grid.particles_mut();
        for &i in &self.tagged {
            cells[i] -= BURN_OFFSET;
        }
    }
}

/// Counts voxels of `selector` reachable from the top face and those on through paths.
///
/// The grid is only borrowed mutably to hold burn tags; it is identical before and after.
pub fn connectivity(grid: &mut VoxelGrid, selector: PhaseSelector) -> Result<Connectivity> {
    connectivity_with_events(grid, selector, &mut ())
}

pub fn connectivity_with_events(
    grid: &mut VoxelGrid,
    selector: PhaseSelector,
    sink: &mut dyn EventSink,
) -> Result<Connectivity> {
    let edge = grid.edge() as i32;
    let result = burn(&mut BurnMarks::new(grid), edge, selector)?;

    info!(
        "Connectivity of {}: {} voxels accessible from top, {} in through paths.",
        selector, result.accessible_from_top, result.through
    );
    if sink.wants(MicroEventKind::ConnectivityMeasured) {
        sink.send(MicroEvent::ConnectivityMeasured { result });
    }
    Ok(result)
}

fn burn(marks: &mut BurnMarks<'_>, edge: i32, selector: PhaseSelector) -> Result<Connectivity> {
    let mut result = Connectivity {
        selector,
        accessible_from_top: 0,
        through: 0,
    };
    let mut front: Vec<IVec3> = Vec::new();
    let mut next: Vec<IVec3> = Vec::new();

    for x in 1..=edge {
        for y in 1..=edge {
            let top = marks.locate(IVec3::new(x, y, 1))?;
            let bottom = marks.locate(IVec3::new(x, y, edge))?;
            if !selector.is_fuel(marks.value(top)) || !selector.matches_bottom(marks.value(bottom))
            {
                continue;
            }

            marks.tag(top);
            let mut burnt: u64 = 1;
            let mut reached_bottom = edge == 1;
            front.clear();
            front.push(IVec3::new(x, y, 1));

            while !front.is_empty() {
                next.clear();
                for &p in &front {
                    for step in NEIGHBORS {
                        let q = p + step;
                        if q.z < 1 || q.z > edge {
                            continue;
                        }
                        let i = marks.locate(q)?;
                        if !selector.is_fuel(marks.value(i)) {
                            continue;
                        }
                        marks.tag(i);
                        burnt += 1;
                        reached_bottom |= q.z == edge;
                        next.push(q);
                    }
                }
                std::mem::swap(&mut front, &mut next);
            }

            result.accessible_from_top += burnt;
            if reached_bottom {
                result.through += burnt;
            }
        }
    }
    Ok(result)
}
