//! Particle arena and cluster membership.
//!
//! Particles live in a dense arena indexed by [`ParticleId`]. Clusters are index-based
//! intrusive chains: each active cluster has a head and a tail, and every particle links to
//! the next member. Chain order matters to flocculation, which probes members in chain order.
use std::fmt;

use glam::IVec3;

use crate::error::{Error, Result};
use crate::lattice::{Phase, PARTICLE_CELL_OFFSET};
use crate::percolation::BURN_OFFSET;

/// Default number of particle slots; ids must stay strictly below it.
pub const DEFAULT_CAPACITY: usize = 30_000;

/// Largest capacity whose encoded particle cells still fit a burnt `u16` particle grid.
pub const MAX_CAPACITY: usize = (u16::MAX - BURN_OFFSET - PARTICLE_CELL_OFFSET) as usize + 1;

/// Largest particle-grid value any catalog can produce; it still fits once burnt.
pub const MAX_PARTICLE_CELL: u16 = PARTICLE_CELL_OFFSET + (MAX_CAPACITY - 1) as u16;

/// Identifier of a placed particle, starting at 1.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(u32);

impl ParticleId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// The singleton cluster a particle starts in.
    pub const fn own_cluster(self) -> ClusterId {
        ClusterId(self.0)
    }

    #[inline]
    fn slot(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a cluster (floc). A cluster keeps the id of the particle that founded it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterId(u32);

impl ClusterId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    #[inline]
    fn slot(self) -> usize {
        self.0 as usize - 1
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A digitized spherical grain.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub cluster: ClusterId,
    pub phase: Phase,
    /// One-based centroid, always inside `1..=edge` on every axis.
    pub center: IVec3,
    pub radius: i32,
}

#[derive(Debug, Clone, Copy, Default)]
struct Chain {
    head: Option<ParticleId>,
    tail: Option<ParticleId>,
}

/// Owner of every placed particle and of cluster membership.
#[derive(Debug, Clone)]
pub struct ParticleCatalog {
    particles: Vec<Particle>,
    next: Vec<Option<ParticleId>>,
    chains: Vec<Chain>,
    capacity: usize,
    active: usize,
}

impl Default for ParticleCatalog {
    fn default() -> Self {
        Self {
            particles: Vec::new(),
            next: Vec::new(),
            chains: Vec::new(),
            capacity: DEFAULT_CAPACITY,
            active: 0,
        }
    }
}

impl ParticleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity < 2 || capacity > MAX_CAPACITY {
            return Err(Error::InvalidConfig(format!(
                "particle capacity must be in 2..={MAX_CAPACITY}, got {capacity}"
            )));
        }
        Ok(Self {
            capacity,
            ..Self::default()
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of particles ever created.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Number of clusters that have not been absorbed.
    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Creates a particle in its own singleton cluster.
    pub fn create(&mut self, phase: Phase, center: IVec3, radius: i32) -> Result<ParticleId> {
        let id = ParticleId(self.particles.len() as u32 + 1);
        if id.get() as usize >= self.capacity {
            return Err(Error::CatalogFull {
                capacity: self.capacity,
            });
        }
        self.particles.push(Particle {
            id,
            cluster: id.own_cluster(),
            phase,
            center,
            radius,
        });
        self.next.push(None);
        self.chains.push(Chain {
            head: Some(id),
            tail: Some(id),
        });
        self.active += 1;
        Ok(id)
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        if id.get() == 0 {
            return None;
        }
        self.particles.get(id.slot())
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub(crate) fn set_center(&mut self, id: ParticleId, center: IVec3) {
        self.particles[id.slot()].center = center;
    }

    /// Records the sulfate form chosen for a freshly created cement particle.
    pub(crate) fn set_phase(&mut self, id: ParticleId, phase: Phase) {
        self.particles[id.slot()].phase = phase;
    }

    pub fn cluster_of(&self, id: ParticleId) -> Option<ClusterId> {
        self.get(id).map(|p| p.cluster)
    }

    pub fn is_active(&self, cluster: ClusterId) -> bool {
        cluster.get() != 0
            && self
                .chains
                .get(cluster.slot())
                .is_some_and(|c| c.head.is_some())
    }

    /// Active cluster ids in ascending order.
    pub fn active_clusters(&self) -> impl Iterator<Item = ClusterId> + '_ {
        self.chains
            .iter()
            .enumerate()
            .filter(|(_, c)| c.head.is_some())
            .map(|(i, _)| ClusterId(i as u32 + 1))
    }

    /// Members of `cluster` in chain order; empty for tombstoned clusters.
    pub fn members(&self, cluster: ClusterId) -> Members<'_> {
        let head = if cluster.get() == 0 {
            None
        } else {
            self.chains.get(cluster.slot()).and_then(|c| c.head)
        };
        Members {
            catalog: self,
            cursor: head,
        }
    }

    /// Splices `absorbed` onto the tail of `survivor`, relabels its members, and tombstones it.
    pub fn merge_clusters(&mut self, survivor: ClusterId, absorbed: ClusterId) -> Result<()> {
        for c in [survivor, absorbed] {
            if !self.is_active(c) {
                return Err(Error::InactiveCluster { cluster: c.get() });
            }
        }
        if survivor == absorbed {
            return Err(Error::InvalidConfig(format!(
                "cannot merge cluster {survivor} into itself"
            )));
        }

        let taken = std::mem::take(&mut self.chains[absorbed.slot()]);
        let (Some(head), Some(tail)) = (taken.head, taken.tail) else {
            return Err(Error::InactiveCluster {
                cluster: absorbed.get(),
            });
        };

        let mut cursor = Some(head);
        while let Some(id) = cursor {
            self.particles[id.slot()].cluster = survivor;
            cursor = self.next[id.slot()];
        }

        let chain = &mut self.chains[survivor.slot()];
        if let Some(old_tail) = chain.tail {
            self.next[old_tail.slot()] = Some(head);
        }
        chain.tail = Some(tail);
        self.active -= 1;
        Ok(())
    }
}

/// Iterator over the members of one cluster.
pub struct Members<'a> {
    catalog: &'a ParticleCatalog,
    cursor: Option<ParticleId>,
}

impl Iterator for Members<'_> {
    type Item = ParticleId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        self.cursor = self.catalog.next[id.slot()];
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with(n: usize) -> ParticleCatalog {
        let mut catalog = ParticleCatalog::new();
        for i in 0..n {
            catalog
                .create(Phase::Cement, IVec3::splat(i as i32 + 1), 2)
                .unwrap();
        }
        catalog
    }

    #[test]
    fn new_particles_start_in_singleton_clusters() {
        let catalog = catalog_with(3);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.active_count(), 3);
        for p in catalog.particles() {
            assert_eq!(p.cluster, p.id.own_cluster());
            assert_eq!(catalog.members(p.cluster).collect::<Vec<_>>(), vec![p.id]);
        }
    }

    #[test]
    fn merge_appends_absorbed_chain_and_relabels() {
        let mut catalog = catalog_with(4);
        catalog
            .merge_clusters(ClusterId::new(3), ClusterId::new(4))
            .unwrap();
        catalog
            .merge_clusters(ClusterId::new(1), ClusterId::new(3))
            .unwrap();

        let members: Vec<u32> = catalog
            .members(ClusterId::new(1))
            .map(ParticleId::get)
            .collect();
        assert_eq!(members, vec![1, 3, 4]);
        for id in [1, 3, 4] {
            assert_eq!(
                catalog.cluster_of(ParticleId::new(id)),
                Some(ClusterId::new(1))
            );
        }
        assert_eq!(catalog.active_count(), 2);
        assert!(!catalog.is_active(ClusterId::new(3)));
        assert_eq!(catalog.members(ClusterId::new(3)).count(), 0);
        assert_eq!(
            catalog.active_clusters().collect::<Vec<_>>(),
            vec![ClusterId::new(1), ClusterId::new(2)]
        );
    }

    #[test]
    fn merging_a_tombstoned_cluster_fails() {
        let mut catalog = catalog_with(3);
        catalog
            .merge_clusters(ClusterId::new(1), ClusterId::new(2))
            .unwrap();
        assert!(matches!(
            catalog.merge_clusters(ClusterId::new(3), ClusterId::new(2)),
            Err(Error::InactiveCluster { cluster: 2 })
        ));
        assert!(catalog
            .merge_clusters(ClusterId::new(1), ClusterId::new(1))
            .is_err());
    }

    #[test]
    fn capacity_bounds_particle_ids() {
        let mut catalog = ParticleCatalog::with_capacity(3).unwrap();
        catalog.create(Phase::Inert, IVec3::ONE, 1).unwrap();
        catalog.create(Phase::Inert, IVec3::ONE, 1).unwrap();
        assert!(matches!(
            catalog.create(Phase::Inert, IVec3::ONE, 1),
            Err(Error::CatalogFull { capacity: 3 })
        ));
    }

    #[test]
    fn capacity_limit_keeps_burnt_cells_in_range() {
        assert!(ParticleCatalog::with_capacity(MAX_CAPACITY).is_ok());
        assert!(ParticleCatalog::with_capacity(MAX_CAPACITY + 1).is_err());
        let largest = (MAX_CAPACITY - 1) as u32 + u32::from(PARTICLE_CELL_OFFSET);
        assert!(largest + u32::from(BURN_OFFSET) <= u32::from(u16::MAX));
        assert_eq!(u32::from(MAX_PARTICLE_CELL), largest);
        assert_eq!(MAX_PARTICLE_CELL, u16::MAX - BURN_OFFSET);
    }
}
