//! Voxel lattice, phase codes, and periodic sphere geometry.
pub mod geometry;
pub mod grid;
pub mod phase;

pub use geometry::{
    min_image_distance, periodic_offset, sphere_offsets, sphere_volume, volume_table,
    wrap_coord, wrap_position, MAX_TABLE_RADIUS,
};
pub use grid::{
    Cell, VoxelGrid, AGGREGATE_CELL, EMPTY_CELL, FIRST_PARTICLE_CELL, PARTICLE_CELL_OFFSET,
};
pub use phase::Phase;

/// Default lattice edge length in voxels.
pub const DEFAULT_EDGE: usize = 100;
