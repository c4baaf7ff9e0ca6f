//! The simulation state shared by every engine.
use crate::aggregate::AggregateSlab;
use crate::catalog::ParticleCatalog;
use crate::error::Result;
use crate::lattice::{VoxelGrid, DEFAULT_EDGE};
use crate::random::Ran1;

/// Owns the lattices, the particle catalog, the generator, and the aggregate description.
///
/// Engines borrow a `Microstructure` mutably for the duration of one operation; there is no
/// other mutable state in the crate.
#[derive(Debug, Clone)]
pub struct Microstructure {
    grid: VoxelGrid,
    catalog: ParticleCatalog,
    rng: Ran1,
    aggregate: Option<AggregateSlab>,
}

impl Microstructure {
    /// An all-porosity lattice of edge `edge`, seeded with `seed`.
    pub fn new(edge: usize, seed: i32) -> Result<Self> {
        Ok(Self::from_parts(
            VoxelGrid::new(edge)?,
            ParticleCatalog::new(),
            Ran1::new(seed)?,
        ))
    }

    /// The default 100³ lattice.
    pub fn with_seed(seed: i32) -> Result<Self> {
        Self::new(DEFAULT_EDGE, seed)
    }

    /// Like [`Microstructure::new`] with an explicit particle capacity.
    pub fn with_capacity(edge: usize, seed: i32, capacity: usize) -> Result<Self> {
        Ok(Self::from_parts(
            VoxelGrid::new(edge)?,
            ParticleCatalog::with_capacity(capacity)?,
            Ran1::new(seed)?,
        ))
    }

    /// Wraps an existing grid, for example one loaded from disk, with an empty catalog.
    pub fn from_grid(grid: VoxelGrid, seed: i32) -> Result<Self> {
        Ok(Self::from_parts(grid, ParticleCatalog::new(), Ran1::new(seed)?))
    }

    fn from_parts(grid: VoxelGrid, catalog: ParticleCatalog, rng: Ran1) -> Self {
        Self {
            grid,
            catalog,
            rng,
            aggregate: None,
        }
    }

    pub fn edge(&self) -> usize {
        self.grid.edge()
    }

    pub fn grid(&self) -> &VoxelGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut VoxelGrid {
        &mut self.grid
    }

    pub fn catalog(&self) -> &ParticleCatalog {
        &self.catalog
    }

    pub fn rng_mut(&mut self) -> &mut Ran1 {
        &mut self.rng
    }

    pub fn aggregate(&self) -> Option<AggregateSlab> {
        self.aggregate
    }

    pub(crate) fn set_aggregate(&mut self, aggregate: Option<AggregateSlab>) {
        self.aggregate = aggregate;
    }

    /// Disjoint mutable borrows for engines that touch every part at once.
    pub(crate) fn parts_mut(&mut self) -> Parts<'_> {
        Parts {
            grid: &mut self.grid,
            catalog: &mut self.catalog,
            rng: &mut self.rng,
            aggregate: self.aggregate,
        }
    }
}

pub(crate) struct Parts<'a> {
    pub grid: &'a mut VoxelGrid,
    pub catalog: &'a mut ParticleCatalog,
    pub rng: &'a mut Ran1,
    pub aggregate: Option<AggregateSlab>,
}
