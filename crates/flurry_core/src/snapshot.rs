//! Read-only engine views for renderers and debug tooling.
//!
//! A snapshot borrows the engine, so it always reflects a state where every
//! invariant holds: it cannot be taken while a tick is running.
//!
//! Renderers that upload to the GPU use [`GpuParticle`], the vertex layout
//! the point-sprite shader expects:
//!
//! ```text
//! offset  0  position  vec3
//! offset 12  velocity  vec3
//! offset 24  size      vec2
//! offset 32  cluster   f32   (-1.0 while unassigned)
//! ```

use bytemuck::{Pod, Zeroable};

use crate::cluster::{ClusterId, ClusterTable};
use crate::math::{Vec2, Vec3};
use crate::particle::{Particle, ParticleId};
use crate::pool::UnassignedPool;

/// One particle as seen by a consumer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleView {
    /// Particle identity.
    pub id: ParticleId,
    /// World position.
    pub position: Vec3,
    /// Renderer size hint.
    pub size: Vec2,
    /// Owning cluster, `None` if unassigned.
    pub cluster: Option<ClusterId>,
}

/// A particle vertex (36 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GpuParticle {
    /// World position
    pub position: [f32; 3],
    /// Velocity
    pub velocity: [f32; 3],
    /// Point sprite size
    pub size: [f32; 2],
    /// Cluster index, or [`GpuParticle::UNASSIGNED`]
    pub cluster: f32,
}

impl GpuParticle {
    /// Size of a vertex in bytes
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Cluster value for particles in the unassigned pool.
    pub const UNASSIGNED: f32 = -1.0;

    /// Builds the vertex for one particle and its owner.
    #[must_use]
    pub fn from_particle(particle: &Particle, cluster: Option<ClusterId>) -> Self {
        Self {
            position: particle.position.to_array(),
            velocity: particle.velocity.to_array(),
            size: particle.size.to_array(),
            cluster: cluster.map_or(Self::UNASSIGNED, |c| c.0 as f32),
        }
    }
}

/// Borrowed view of the engine state after the last tick.
#[derive(Clone, Copy, Debug)]
pub struct EngineSnapshot<'a> {
    pub(crate) particles: &'a [Particle],
    pub(crate) assignments: &'a [Option<ClusterId>],
    pub(crate) table: &'a ClusterTable,
    pub(crate) pool: &'a UnassignedPool,
    pub(crate) highlight: Option<ClusterId>,
    pub(crate) tick: u64,
}

impl<'a> EngineSnapshot<'a> {
    /// All particles in id order.
    #[must_use]
    pub const fn particles(&self) -> &'a [Particle] {
        self.particles
    }

    /// Iterates consumer views of every particle.
    pub fn iter(&self) -> impl Iterator<Item = ParticleView> + 'a {
        self.particles
            .iter()
            .zip(self.assignments)
            .enumerate()
            .map(|(i, (p, &cluster))| ParticleView {
                id: ParticleId(i as u32),
                position: p.position,
                size: p.size,
                cluster,
            })
    }

    /// Owning cluster of every particle, in id order.
    #[must_use]
    pub const fn assignments(&self) -> &'a [Option<ClusterId>] {
        self.assignments
    }

    /// Centroids in table order.
    #[must_use]
    pub fn centroids(&self) -> Vec<Vec3> {
        self.table.iter().map(|(_, c)| c.centroid()).collect()
    }

    /// Member counts in table order.
    #[must_use]
    pub fn member_counts(&self) -> Vec<usize> {
        self.table.iter().map(|(_, c)| c.member_count()).collect()
    }

    /// Number of clusters (`K`).
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.table.len()
    }

    /// Number of particles waiting in the pool.
    #[must_use]
    pub fn unassigned_count(&self) -> usize {
        self.pool.len()
    }

    /// The highlighted cluster, if any. Display only.
    #[must_use]
    pub const fn highlight(&self) -> Option<ClusterId> {
        self.highlight
    }

    /// Returns true if `particle` belongs to the highlighted cluster.
    #[must_use]
    pub fn is_highlighted(&self, particle: ParticleId) -> bool {
        match (self.highlight, self.assignments.get(particle.index())) {
            (Some(highlight), Some(&owner)) => owner == Some(highlight),
            _ => false,
        }
    }

    /// Ticks completed when the snapshot was taken.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Builds one vertex per particle, in id order.
    #[must_use]
    pub fn gpu_vertices(&self) -> Vec<GpuParticle> {
        let mut out = Vec::with_capacity(self.particles.len());
        self.write_gpu_vertices(&mut out);
        out
    }

    /// Refills `out` with one vertex per particle, reusing its allocation.
    pub fn write_gpu_vertices(&self, out: &mut Vec<GpuParticle>) {
        out.clear();
        out.extend(
            self.particles
                .iter()
                .zip(self.assignments)
                .map(|(p, &cluster)| GpuParticle::from_particle(p, cluster)),
        );
    }
}

/// Views a vertex slice as raw bytes for upload.
#[must_use]
pub fn gpu_bytes(vertices: &[GpuParticle]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}
