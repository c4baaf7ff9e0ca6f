//! The two parallel voxel lattices shared by every engine.
//!
//! [`VoxelGrid`] stores a phase grid (one [`Phase`] code per voxel) and a particle grid
//! (empty, aggregate sentinel, or encoded owning particle). Public coordinates are
//! one-based on every axis; storage is a flat buffer in file order (x fastest, then y, then z).
use glam::IVec3;

use crate::aggregate::AggregateSlab;
use crate::catalog::ParticleId;
use crate::error::{Error, Result};
use crate::lattice::geometry::{sphere_offsets, wrap_coord, wrap_position};
use crate::lattice::phase::Phase;

/// Particle-grid value of an empty voxel.
pub const EMPTY_CELL: u16 = 0;
/// Particle-grid value of a voxel covered by the aggregate slab.
pub const AGGREGATE_CELL: u16 = Phase::Aggregate.code() as u16;
/// Added to a particle id to form its particle-grid value; ids start at 1.
pub const PARTICLE_CELL_OFFSET: u16 = 99;
/// Smallest particle-grid value that names a particle.
pub const FIRST_PARTICLE_CELL: u16 = PARTICLE_CELL_OFFSET + 1;

/// Decoded particle-grid value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Aggregate,
    Particle(ParticleId),
    /// Any value that is neither empty, aggregate, nor a particle code.
    Unknown(u16),
}

impl Cell {
    pub fn decode(value: u16) -> Self {
        match value {
            EMPTY_CELL => Cell::Empty,
            AGGREGATE_CELL => Cell::Aggregate,
            v if v >= FIRST_PARTICLE_CELL => {
                Cell::Particle(ParticleId::new(u32::from(v - PARTICLE_CELL_OFFSET)))
            }
            v => Cell::Unknown(v),
        }
    }

    pub fn encode_particle(id: ParticleId) -> u16 {
        debug_assert!(id.get() + u32::from(PARTICLE_CELL_OFFSET) <= u32::from(u16::MAX));
        id.get() as u16 + PARTICLE_CELL_OFFSET
    }
}

/// Phase and particle lattices of edge length `edge`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelGrid {
    edge: usize,
    phases: Vec<u8>,
    particles: Vec<u16>,
}

impl VoxelGrid {
    /// Largest supported edge length.
    pub const MAX_EDGE: usize = 1024;

    /// A grid of pure porosity.
    pub fn new(edge: usize) -> Result<Self> {
        if edge == 0 || edge > Self::MAX_EDGE {
            return Err(Error::InvalidConfig(format!(
                "grid edge must be in 1..={}, got {edge}",
                Self::MAX_EDGE
            )));
        }
        let n = edge * edge * edge;
        Ok(Self {
            edge,
            phases: vec![Phase::Porosity.code(); n],
            particles: vec![EMPTY_CELL; n],
        })
    }

    /// Builds a grid from buffers already laid out in file order.
    pub fn from_raw(edge: usize, phases: Vec<u8>, particles: Vec<u16>) -> Result<Self> {
        let mut grid = Self::new(edge)?;
        let n = grid.voxel_count();
        if phases.len() != n || particles.len() != n {
            return Err(Error::InvalidConfig(format!(
                "expected {n} voxels per lattice, got {} phases and {} particle cells",
                phases.len(),
                particles.len()
            )));
        }
        grid.phases = phases;
        grid.particles = particles;
        Ok(grid)
    }

    #[inline]
    pub fn edge(&self) -> usize {
        self.edge
    }

    #[inline]
    pub fn voxel_count(&self) -> usize {
        self.phases.len()
    }

    /// Flat index of an in-range one-based position.
    #[inline]
    pub fn index(&self, p: IVec3) -> usize {
        debug_assert!(self.contains(p), "{p} outside lattice of edge {}", self.edge);
        let n = self.edge;
        ((p.z as usize - 1) * n + (p.y as usize - 1)) * n + (p.x as usize - 1)
    }

    /// Flat index after periodic wrap of every axis.
    #[inline]
    pub fn wrapped_index(&self, p: IVec3) -> usize {
        self.index(wrap_position(p, self.edge as i32))
    }

    /// Flat index of an unwrapped position, failing when it lies outside the lattice.
    pub fn checked_index(&self, p: IVec3) -> Result<usize> {
        if self.contains(p) {
            Ok(self.index(p))
        } else {
            Err(Error::OutOfLattice { position: p })
        }
    }

    /// One-based position of a flat index.
    pub fn position(&self, index: usize) -> IVec3 {
        let n = self.edge;
        IVec3::new(
            (index % n) as i32 + 1,
            ((index / n) % n) as i32 + 1,
            (index / (n * n)) as i32 + 1,
        )
    }

    #[inline]
    pub fn contains(&self, p: IVec3) -> bool {
        let n = self.edge as i32;
        (1..=n).contains(&p.x) && (1..=n).contains(&p.y) && (1..=n).contains(&p.z)
    }

    /// Phase code at `p` (wrapped).
    pub fn phase_code(&self, p: IVec3) -> u8 {
        self.phases[self.wrapped_index(p)]
    }

    pub fn phase(&self, p: IVec3) -> Option<Phase> {
        Phase::from_code(self.phase_code(p))
    }

    /// Raw particle-grid value at `p` (wrapped).
    pub fn particle_cell(&self, p: IVec3) -> u16 {
        self.particles[self.wrapped_index(p)]
    }

    pub fn cell(&self, p: IVec3) -> Cell {
        Cell::decode(self.particle_cell(p))
    }

    /// Writes both lattices at `p` (wrapped).
    pub fn set(&mut self, p: IVec3, particle_cell: u16, phase: Phase) {
        let i = self.wrapped_index(p);
        self.particles[i] = particle_cell;
        self.phases[i] = phase.code();
    }

    pub fn phases(&self) -> &[u8] {
        &self.phases
    }

    pub fn particles(&self) -> &[u16] {
        &self.particles
    }

    pub(crate) fn particles_mut(&mut self) -> &mut [u16] {
        &mut self.particles
    }

    /// Number of voxels whose phase is not porosity.
    pub fn solid_voxel_count(&self) -> usize {
        self.phases
            .iter()
            .filter(|&&c| c != Phase::Porosity.code())
            .count()
    }

    /// Number of particle-grid voxels holding `particle_cell`.
    pub fn count_particle_cells(&self, particle_cell: u16) -> usize {
        self.particles.iter().filter(|&&c| c == particle_cell).count()
    }

    /// Stamps the digitized sphere of `radius` at `center` into both lattices.
    ///
    /// Voxels already carrying the aggregate sentinel are left untouched.
    pub fn draw_sphere(&mut self, center: IVec3, radius: i32, particle_cell: u16, phase: Phase) {
        let code = phase.code();
        for &offset in sphere_offsets(radius) {
            let i = self.wrapped_index(center + offset);
            if self.particles[i] == AGGREGATE_CELL {
                continue;
            }
            self.particles[i] = particle_cell;
            self.phases[i] = code;
        }
    }

    /// First obstruction met while scanning the sphere's bounding cube in x, y, z order.
    ///
    /// An x-plane inside the aggregate band reports [`AGGREGATE_CELL`] regardless of grid
    /// content; otherwise the first non-empty particle cell inside the digitized sphere is
    /// returned raw. `None` means the sphere fits.
    pub fn probe_sphere(
        &self,
        center: IVec3,
        radius: i32,
        band: Option<AggregateSlab>,
    ) -> Option<u16> {
        let edge = self.edge as i32;
        let offsets = sphere_offsets(radius);
        let mut cursor = 0;
        for dx in -radius..=radius {
            let x = wrap_coord(center.x + dx, edge);
            if band.is_some_and(|slab| slab.excludes_x(x, self.edge)) {
                return Some(AGGREGATE_CELL);
            }
            while let Some(&offset) = offsets.get(cursor).filter(|o| o.x == dx) {
                let value = self.particles[self.wrapped_index(center + offset)];
                if value != EMPTY_CELL {
                    return Some(value);
                }
                cursor += 1;
            }
        }
        None
    }

    /// Returns every voxel of the sphere that still carries `particle_cell` to porosity.
    pub fn erase_sphere(&mut self, center: IVec3, radius: i32, particle_cell: u16) {
        for &offset in sphere_offsets(radius) {
            let i = self.wrapped_index(center + offset);
            if self.particles[i] == particle_cell {
                self.particles[i] = EMPTY_CELL;
                self.phases[i] = Phase::Porosity.code();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::geometry::sphere_volume;

    #[test]
    fn rejects_degenerate_edges() {
        assert!(VoxelGrid::new(0).is_err());
        assert!(VoxelGrid::new(VoxelGrid::MAX_EDGE + 1).is_err());
    }

    #[test]
    fn index_follows_file_order() {
        let grid = VoxelGrid::new(4).unwrap();
        assert_eq!(grid.index(IVec3::new(1, 1, 1)), 0);
        assert_eq!(grid.index(IVec3::new(2, 1, 1)), 1);
        assert_eq!(grid.index(IVec3::new(1, 2, 1)), 4);
        assert_eq!(grid.index(IVec3::new(1, 1, 2)), 16);
        assert_eq!(grid.position(21), IVec3::new(2, 2, 2));
    }

    #[test]
    fn wrapped_access_is_periodic() {
        let mut grid = VoxelGrid::new(5).unwrap();
        grid.set(IVec3::new(0, 6, 3), 120, Phase::Slag);
        assert_eq!(grid.particle_cell(IVec3::new(5, 1, 3)), 120);
        assert_eq!(grid.phase(IVec3::new(5, 1, 3)), Some(Phase::Slag));
    }

    #[test]
    fn checked_index_reports_out_of_lattice() {
        let grid = VoxelGrid::new(3).unwrap();
        assert!(grid.checked_index(IVec3::new(1, 1, 3)).is_ok());
        assert!(matches!(
            grid.checked_index(IVec3::new(1, 1, 4)),
            Err(Error::OutOfLattice { .. })
        ));
    }

    #[test]
    fn cells_decode_particles_and_sentinels() {
        assert_eq!(Cell::decode(0), Cell::Empty);
        assert_eq!(Cell::decode(28), Cell::Aggregate);
        assert_eq!(Cell::decode(100), Cell::Particle(ParticleId::new(1)));
        assert_eq!(Cell::decode(7), Cell::Unknown(7));
        assert_eq!(Cell::encode_particle(ParticleId::new(42)), 141);
    }

    #[test]
    fn draw_then_erase_restores_porosity() {
        let mut grid = VoxelGrid::new(12).unwrap();
        let cell = Cell::encode_particle(ParticleId::new(1));
        grid.draw_sphere(IVec3::new(1, 1, 1), 3, cell, Phase::Cement);
        assert_eq!(grid.count_particle_cells(cell) as u64, sphere_volume(3));
        assert_eq!(grid.solid_voxel_count() as u64, sphere_volume(3));

        grid.erase_sphere(IVec3::new(1, 1, 1), 3, cell);
        assert_eq!(grid, VoxelGrid::new(12).unwrap());
    }

    #[test]
    fn probe_reports_first_occupant_in_scan_order() {
        let mut grid = VoxelGrid::new(20).unwrap();
        let center = IVec3::new(10, 10, 10);
        assert_eq!(grid.probe_sphere(center, 3, None), None);

        grid.set(IVec3::new(12, 10, 10), 150, Phase::Cement);
        grid.set(IVec3::new(8, 10, 10), 140, Phase::Cement);
        assert_eq!(grid.probe_sphere(center, 3, None), Some(140));

        // Outside the digitized sphere but inside its bounding cube.
        let mut sparse = VoxelGrid::new(20).unwrap();
        sparse.set(IVec3::new(13, 13, 13), 150, Phase::Cement);
        assert_eq!(sparse.probe_sphere(center, 3, None), None);
    }

    #[test]
    fn probe_honors_the_aggregate_band_and_wraps() {
        let grid = VoxelGrid::new(20).unwrap();
        let slab = AggregateSlab::new(2, 20).unwrap();
        assert_eq!(
            grid.probe_sphere(IVec3::new(7, 5, 5), 2, Some(slab)),
            None
        );
        assert_eq!(
            grid.probe_sphere(IVec3::new(8, 5, 5), 2, Some(slab)),
            Some(AGGREGATE_CELL)
        );

        let mut wrapped = VoxelGrid::new(20).unwrap();
        wrapped.set(IVec3::new(20, 1, 1), 101, Phase::Inert);
        assert_eq!(wrapped.probe_sphere(IVec3::ONE, 1, None), Some(101));
    }

    #[test]
    fn draw_skips_aggregate_voxels() {
        let mut grid = VoxelGrid::new(8).unwrap();
        grid.set(IVec3::new(4, 4, 4), AGGREGATE_CELL, Phase::Aggregate);
        grid.draw_sphere(IVec3::new(4, 4, 4), 1, 100, Phase::Inert);
        assert_eq!(grid.cell(IVec3::new(4, 4, 4)), Cell::Aggregate);
        assert_eq!(grid.count_particle_cells(100), 18);
    }
}
