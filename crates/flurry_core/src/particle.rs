//! # Particle Store
//!
//! Flat, fixed-size array of particle records.
//!
//! Particles are addressed by dense [`ParticleId`]s (their index in the
//! store). Clusters and the unassigned pool hold ids only, never references,
//! and the store is never resized after construction, so an id stays valid
//! for the lifetime of the engine.
//!
//! A [`Particle`] holds kinematic state only, and every field is public so
//! external kinematics can move it. Assignment and cached distance live in
//! parallel arrays inside the store, keyed by id: overwriting or swapping
//! records through a mutable slice changes where particles are, never which
//! cluster owns which id.

use crate::cluster::ClusterId;
use crate::error::{ClusterError, ClusterResult};
use crate::math::{Vec2, Vec3};

/// Default size hint, matching the renderer's point sprite size.
pub const DEFAULT_PARTICLE_SIZE: Vec2 = Vec2::new(0.01, 0.01);

/// Stable identity of a particle (its index in the store).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParticleId(pub u32);

impl ParticleId {
    /// Returns the id as a store index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ParticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Kinematic state of a single particle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    /// World position.
    pub position: Vec3,
    /// Velocity in world units per second.
    pub velocity: Vec3,
    /// Size hint for the renderer. Opaque to the clustering.
    pub size: Vec2,
}

impl Particle {
    /// Creates a particle.
    #[must_use]
    pub const fn new(position: Vec3, velocity: Vec3, size: Vec2) -> Self {
        Self {
            position,
            velocity,
            size,
        }
    }

    /// Creates a resting particle with the default size hint.
    #[must_use]
    pub const fn at(position: Vec3) -> Self {
        Self::new(position, Vec3::ZERO, DEFAULT_PARTICLE_SIZE)
    }
}

/// Fixed-size particle storage plus per-id assignment records.
#[derive(Clone, Debug, Default)]
pub struct ParticleStore {
    particles: Vec<Particle>,
    /// Owning cluster per id, `None` while in the unassigned pool.
    assignments: Vec<Option<ClusterId>>,
    /// Squared distance to the owning centroid per id (0 while unassigned).
    distances: Vec<f32>,
}

impl ParticleStore {
    /// Takes ownership of `particles`. Ids follow vector order and every
    /// particle starts unassigned.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::TooManyParticles`] if the set cannot be
    /// addressed with `u32` ids.
    pub fn new(particles: Vec<Particle>) -> ClusterResult<Self> {
        if u32::try_from(particles.len()).is_err() {
            return Err(ClusterError::TooManyParticles(particles.len()));
        }
        let count = particles.len();
        Ok(Self {
            particles,
            assignments: vec![None; count],
            distances: vec![0.0; count],
        })
    }

    /// Number of particles (`N`).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Returns true if the store holds no particles.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Gets a particle by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(id.index())
    }

    /// Gets a particle's position.
    #[inline]
    #[must_use]
    pub fn position_of(&self, id: ParticleId) -> Option<Vec3> {
        self.get(id).map(|p| p.position)
    }

    /// Owning cluster, `None` if the particle is unassigned or unknown.
    #[inline]
    #[must_use]
    pub fn cluster_of(&self, id: ParticleId) -> Option<ClusterId> {
        self.assignments.get(id.index()).copied().flatten()
    }

    /// Returns true if no cluster owns the particle.
    #[inline]
    #[must_use]
    pub fn is_unassigned(&self, id: ParticleId) -> bool {
        self.cluster_of(id).is_none()
    }

    /// Cached squared distance to the owning centroid.
    ///
    /// Refreshed on insertion and on centroid recomputation; stale in
    /// between. Always 0 for unassigned particles, `None` for unknown ids.
    #[inline]
    #[must_use]
    pub fn cached_distance(&self, id: ParticleId) -> Option<f32> {
        self.distances.get(id.index()).copied()
    }

    /// Owning cluster of every particle, in id order.
    #[inline]
    #[must_use]
    pub fn assignments(&self) -> &[Option<ClusterId>] {
        &self.assignments
    }

    /// Moves a particle.
    ///
    /// The store does not validate coordinates; see
    /// [`ClusterEngine::set_position`](crate::ClusterEngine::set_position)
    /// for the checked variant.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::ParticleOutOfRange`] for an unknown id.
    pub fn set_position(&mut self, id: ParticleId, position: Vec3) -> ClusterResult<()> {
        let count = self.particles.len();
        let particle = self
            .particles
            .get_mut(id.index())
            .ok_or(ClusterError::ParticleOutOfRange { particle: id.0, count })?;
        particle.position = position;
        Ok(())
    }

    /// All particles, in id order.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    /// Kinematic state of every particle, mutably. Assignment records are
    /// not part of the slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Iterates particles in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    /// Iterates `(id, particle, owner)` in id order.
    pub fn iter_assigned(&self) -> impl Iterator<Item = (ParticleId, &Particle, Option<ClusterId>)> {
        self.particles
            .iter()
            .zip(&self.assignments)
            .enumerate()
            .map(|(i, (p, &cluster))| (ParticleId(i as u32), p, cluster))
    }

    /// Returns the first particle with a NaN or infinite position.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<ParticleId> {
        self.particles
            .iter()
            .position(|p| !p.position.is_finite())
            .map(|i| ParticleId(i as u32))
    }

    /// Records that `cluster` now owns the particle.
    #[inline]
    pub(crate) fn assign(&mut self, id: ParticleId, cluster: ClusterId, distance: f32) {
        self.assignments[id.index()] = Some(cluster);
        self.distances[id.index()] = distance;
    }

    /// Records that the particle moved to the unassigned pool.
    #[inline]
    pub(crate) fn unassign(&mut self, id: ParticleId) {
        self.assignments[id.index()] = None;
        self.distances[id.index()] = 0.0;
    }

    /// Overwrites the cached distance after a centroid change.
    #[inline]
    pub(crate) fn set_cached_distance(&mut self, id: ParticleId, distance: f32) {
        self.distances[id.index()] = distance;
    }
}

impl std::ops::Index<ParticleId> for ParticleStore {
    type Output = Particle;

    fn index(&self, id: ParticleId) -> &Particle {
        &self.particles[id.index()]
    }
}
