#![forbid(unsafe_code)]
//! micropack: synthetic 3-D particle microstructures on a periodic voxel lattice.
//!
//! Modules:
//! - lattice: phase codes, periodic sphere digitization, and the phase/particle grids
//! - placement: collision-checked sphere placement with sulfate sub-phase assignment
//! - floc: random-walk flocculation of particle clusters
//! - percolation: top-to-bottom connectivity of pores or solids
//! - aggregate, analysis, io: aggregate slab, phase tallies, and flat grid files
//!
//! For a walkthrough, see the README.
pub mod aggregate;
pub mod analysis;
pub mod catalog;
pub mod error;
pub mod events;
pub mod floc;
pub mod io;
pub mod lattice;
pub mod percolation;
pub mod placement;
pub mod random;
pub mod state;

/// Convenient re-exports for common types. Import with `use micropack::prelude::*;`.
pub mod prelude {
    pub use crate::aggregate::{insert_slab, AggregateSlab};
    pub use crate::analysis::{distance_profile, DistanceBin, PhaseTally};
    pub use crate::catalog::{ClusterId, Particle, ParticleCatalog, ParticleId};
    pub use crate::error::{Error, Result};
    pub use crate::events::{
        EventSink, FnSink, MicroEvent, MicroEventKind, MultiSink, VecSink,
    };
    pub use crate::floc::{flocculate, FlocConfig, FlocReport, FlocculationEngine};
    pub use crate::io::{load_grids, read_grid, save_grids, GridKind};
    pub use crate::lattice::{Cell, Phase, VoxelGrid, DEFAULT_EDGE};
    pub use crate::percolation::{connectivity, Connectivity, PhaseSelector};
    pub use crate::placement::{
        place_classes, PlacementConfig, PlacementEngine, PlacementReport, SizeClass,
    };
    pub use crate::random::Ran1;
    pub use crate::state::Microstructure;
}
