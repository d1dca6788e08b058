//! # Cluster Engine
//!
//! Owns the particle store, cluster table, unassigned pool and RNG, and is
//! the only way to mutate them. Every public method returns with all
//! ownership, capacity and conservation invariants intact.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut engine = ClusterEngine::construct(32_768, 64)?;
//! loop {
//!     engine.step(&mut LinearMotion, dt)?;
//!     render(engine.snapshot().gpu_vertices());
//! }
//! ```

use std::path::Path;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::cluster::{ClusterId, ClusterTable};
use crate::config::EngineConfig;
use crate::error::{ClusterError, ClusterResult};
use crate::kinematics::Kinematics;
use crate::layout::{cube_lattice, Bounds};
use crate::math::{MeanAccumulator, Vec3};
use crate::particle::{Particle, ParticleId, ParticleStore};
use crate::pool::UnassignedPool;
use crate::recluster::{Reclusterer, TickStats};
use crate::seeding::{self, SeedStats};
use crate::snapshot::EngineSnapshot;

/// Online capacity-bounded clustering of a moving particle set.
#[derive(Debug)]
pub struct ClusterEngine {
    particles: ParticleStore,
    table: ClusterTable,
    pool: UnassignedPool,
    rng: ChaCha8Rng,
    config: EngineConfig,
    /// Scratch for centroid means, reused every tick.
    centroid_sums: Vec<MeanAccumulator>,
    highlight: Option<ClusterId>,
    tick: u64,
    last_stats: TickStats,
    seed_stats: SeedStats,
}

impl ClusterEngine {
    /// Clusters `particle_count` resting particles laid out on a cube
    /// lattice in the default bounds, with default configuration.
    ///
    /// # Errors
    ///
    /// Rejects zero particles, a zero half size, or more particles than
    /// `u32` ids can address.
    pub fn construct(particle_count: usize, half_cluster_size: usize) -> ClusterResult<Self> {
        if u32::try_from(particle_count).is_err() {
            return Err(ClusterError::TooManyParticles(particle_count));
        }
        let config = EngineConfig::with_half_cluster_size(half_cluster_size);
        config.validate()?;
        Self::new(cube_lattice(particle_count, Bounds::default()), config)
    }

    /// Clusters an arbitrary particle set.
    ///
    /// Ids are assigned in vector order. Every particle is assigned to a
    /// cluster on return.
    ///
    /// # Errors
    ///
    /// Returns a configuration error, [`ClusterError::EmptyParticleSet`],
    /// or [`ClusterError::NonFinitePosition`] for the first particle with a
    /// NaN or infinite coordinate.
    pub fn new(particles: Vec<Particle>, config: EngineConfig) -> ClusterResult<Self> {
        config.validate()?;
        let particles = ParticleStore::new(particles)?;
        if let Some(id) = particles.first_non_finite() {
            return Err(ClusterError::NonFinitePosition { particle: id.0 });
        }
        let table = ClusterTable::new(particles.len(), config.half_cluster_size)?;
        let pool = UnassignedPool::with_capacity(particles.len());

        let mut engine = Self {
            centroid_sums: Vec::with_capacity(table.len()),
            particles,
            table,
            pool,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            highlight: None,
            tick: 0,
            last_stats: TickStats::default(),
            seed_stats: SeedStats::default(),
        };

        let (mut re, rng) = engine.parts();
        let seed_stats = seeding::initialize(&mut re, rng);
        engine.seed_stats = seed_stats;

        tracing::info!(
            "Clustered {} particles into {} clusters of capacity {} (seed {})",
            engine.particles.len(),
            engine.table.len(),
            engine.table.capacity(),
            engine.config.seed
        );
        Ok(engine)
    }

    /// Loads the configuration from a TOML file, then calls [`Self::new`].
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::from_toml_file`] and [`Self::new`].
    pub fn from_config_file(path: impl AsRef<Path>, particles: Vec<Particle>) -> ClusterResult<Self> {
        let config = EngineConfig::from_toml_file(path)?;
        Self::new(particles, config)
    }

    /// Splits the borrow into the reclusterer view and the RNG.
    fn parts(&mut self) -> (Reclusterer<'_>, &mut ChaCha8Rng) {
        (
            Reclusterer {
                particles: &mut self.particles,
                table: &mut self.table,
                pool: &mut self.pool,
                centroid_sums: &mut self.centroid_sums,
            },
            &mut self.rng,
        )
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Re-clusters after positions have been advanced externally.
    ///
    /// `dt` is recorded in the returned stats; the clustering itself does
    /// not depend on it.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::NonFinitePosition`] without touching any
    /// state if a particle has a NaN or infinite coordinate.
    pub fn tick(&mut self, dt: f32) -> ClusterResult<TickStats> {
        if let Some(id) = self.particles.first_non_finite() {
            return Err(ClusterError::NonFinitePosition { particle: id.0 });
        }

        let reset_count = self.config.reset_count;
        let respawn = self.config.centroid_respawn;
        let (mut re, rng) = self.parts();
        let mut stats = re.run_tick(rng, reset_count, respawn);

        self.tick += 1;
        stats.tick = self.tick;
        stats.dt = dt;
        self.last_stats = stats;

        tracing::debug!(
            "Tick {}: {} drift evictions, {} displacements, {} reassigned, {} respawned",
            stats.tick,
            stats.drift_evictions,
            stats.displacements,
            stats.reassigned,
            stats.respawned_centroids
        );
        Ok(stats)
    }

    /// Advances positions with `kinematics`, then ticks.
    ///
    /// # Errors
    ///
    /// See [`Self::tick`].
    pub fn step<K: Kinematics + ?Sized>(&mut self, kinematics: &mut K, dt: f32) -> ClusterResult<TickStats> {
        kinematics.advance(self.particles.as_mut_slice(), dt);
        self.tick(dt)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Number of clusters (`K`).
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.table.len()
    }

    /// Per-cluster capacity (`C`).
    #[must_use]
    pub const fn cluster_capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Member count of a cluster, `None` if it does not exist.
    #[must_use]
    pub fn member_count(&self, cluster: ClusterId) -> Option<usize> {
        self.table.member_count(cluster)
    }

    /// Centroid of a cluster, `None` if it does not exist.
    #[must_use]
    pub fn centroid(&self, cluster: ClusterId) -> Option<Vec3> {
        self.table.centroid(cluster)
    }

    /// Cluster owning `particle`. `None` if the particle is unassigned or
    /// does not exist.
    #[must_use]
    pub fn cluster_of(&self, particle: ParticleId) -> Option<ClusterId> {
        self.particles.cluster_of(particle)
    }

    /// Number of particles in the unassigned pool.
    #[must_use]
    pub fn unassigned_count(&self) -> usize {
        self.pool.len()
    }

    /// Number of particles (`N`).
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// All particles in id order.
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        self.particles.as_slice()
    }

    /// Owning cluster of every particle, in id order.
    #[must_use]
    pub fn assignments(&self) -> &[Option<ClusterId>] {
        self.particles.assignments()
    }

    /// The cluster table.
    #[must_use]
    pub const fn clusters(&self) -> &ClusterTable {
        &self.table
    }

    /// The unassigned pool.
    #[must_use]
    pub const fn pool(&self) -> &UnassignedPool {
        &self.pool
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ticks completed since construction.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.tick
    }

    /// Stats of the most recent tick (all zero before the first).
    #[must_use]
    pub const fn last_stats(&self) -> TickStats {
        self.last_stats
    }

    /// Stats of the initial clustering.
    #[must_use]
    pub const fn seed_stats(&self) -> SeedStats {
        self.seed_stats
    }

    /// Read-only view for renderers.
    #[must_use]
    pub fn snapshot(&self) -> EngineSnapshot<'_> {
        EngineSnapshot {
            particles: self.particles.as_slice(),
            assignments: self.particles.assignments(),
            table: &self.table,
            pool: &self.pool,
            highlight: self.highlight,
            tick: self.tick,
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Moves one particle. Takes effect at the next tick.
    ///
    /// # Errors
    ///
    /// Rejects unknown ids and non-finite positions.
    pub fn set_position(&mut self, particle: ParticleId, position: Vec3) -> ClusterResult<()> {
        if self.particles.get(particle).is_some() && !position.is_finite() {
            return Err(ClusterError::NonFinitePosition { particle: particle.0 });
        }
        self.particles.set_position(particle, position)
    }

    /// Direct access for external kinematics.
    ///
    /// The slice holds kinematic state only. Replacing or reordering
    /// records moves particles but never changes cluster ownership, which
    /// stays keyed by id. Non-finite positions are caught at the next tick.
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        self.particles.as_mut_slice()
    }

    /// Runs one drift-correction round on a chosen cluster.
    ///
    /// The evicted particle waits in the pool until the next tick.
    /// Returns `None` if the cluster was empty.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::ClusterOutOfRange`] for an unknown cluster.
    pub fn evict_farthest(&mut self, cluster: ClusterId) -> ClusterResult<Option<ParticleId>> {
        self.check_cluster(cluster)?;
        let (mut re, _) = self.parts();
        Ok(re.evict_farthest(cluster))
    }

    /// Selects the cluster renderers should highlight. Display only.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::ClusterOutOfRange`] for an unknown cluster.
    pub fn set_highlight(&mut self, cluster: Option<ClusterId>) -> ClusterResult<()> {
        if let Some(cluster) = cluster {
            self.check_cluster(cluster)?;
        }
        self.highlight = cluster;
        Ok(())
    }

    /// The highlighted cluster, if any.
    #[must_use]
    pub const fn highlight(&self) -> Option<ClusterId> {
        self.highlight
    }

    fn check_cluster(&self, cluster: ClusterId) -> ClusterResult<()> {
        if cluster.index() >= self.table.len() {
            return Err(ClusterError::ClusterOutOfRange {
                cluster: cluster.0,
                count: self.table.len(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Self-check
    // =========================================================================

    /// Verifies ownership, capacity and conservation, and that heap keys
    /// agree with each particle's cached distance. `O(N)`.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvariantViolation`] describing the first
    /// problem found.
    pub fn check_invariants(&self) -> ClusterResult<()> {
        let violation = |msg: String| Err(ClusterError::InvariantViolation(msg));
        let count = self.particles.len();
        let mut seen = vec![false; count];

        for (id, cluster) in self.table.iter() {
            if cluster.member_count() > cluster.capacity() {
                return violation(format!(
                    "{id} holds {} members, capacity {}",
                    cluster.member_count(),
                    cluster.capacity()
                ));
            }
            for member in cluster.members() {
                let Some(cached) = self.particles.cached_distance(member.particle) else {
                    return violation(format!("{id} holds unknown {}", member.particle));
                };
                if std::mem::replace(&mut seen[member.particle.index()], true) {
                    return violation(format!("{} is owned twice", member.particle));
                }
                let recorded = self.particles.cluster_of(member.particle);
                if recorded != Some(id) {
                    return violation(format!("{} is in {id} but records {recorded:?}", member.particle));
                }
                if cached.to_bits() != member.distance.to_bits() {
                    return violation(format!(
                        "{} cached distance {cached} disagrees with heap key {}",
                        member.particle, member.distance
                    ));
                }
            }
        }

        for &pending in self.pool.iter() {
            if self.particles.get(pending).is_none() {
                return violation(format!("pool holds unknown {pending}"));
            }
            if std::mem::replace(&mut seen[pending.index()], true) {
                return violation(format!("{pending} is owned twice"));
            }
            if let Some(recorded) = self.particles.cluster_of(pending) {
                return violation(format!("{pending} is pooled but records {recorded}"));
            }
        }

        if let Some(lost) = seen.iter().position(|owned| !owned) {
            return violation(format!("p{lost} is owned by nothing"));
        }

        let total = self.table.total_members() + self.pool.len();
        if total != count {
            return violation(format!("{total} owned particles, expected {count}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::LinearMotion;

    fn line(count: usize) -> Vec<Particle> {
        (0..count)
            .map(|i| Particle::at(Vec3::new(i as f32, 0.0, 0.0)))
            .collect()
    }

    #[test]
    fn test_construct_assigns_everything() {
        let engine = ClusterEngine::construct(1000, 16).unwrap();

        assert_eq!(engine.particle_count(), 1000);
        assert_eq!(engine.cluster_count(), 63); // ceil(1000 / 16)
        assert_eq!(engine.cluster_capacity(), 32);
        assert_eq!(engine.unassigned_count(), 0);
        assert_eq!(engine.ticks(), 0);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn test_construct_rejects_degenerate_input() {
        assert_eq!(
            ClusterEngine::construct(0, 4).unwrap_err(),
            ClusterError::EmptyParticleSet
        );
        assert_eq!(
            ClusterEngine::construct(10, 0).unwrap_err(),
            ClusterError::ZeroClusterSize
        );
    }

    #[test]
    fn test_new_rejects_non_finite_positions() {
        let mut particles = line(4);
        particles[2].position.y = f32::NAN;

        let err = ClusterEngine::new(particles, EngineConfig::with_half_cluster_size(2)).unwrap_err();
        assert_eq!(err, ClusterError::NonFinitePosition { particle: 2 });
    }

    #[test]
    fn test_tick_counts_and_records_dt() {
        let mut engine = ClusterEngine::new(line(32), EngineConfig::with_half_cluster_size(4)).unwrap();

        let stats = engine.tick(0.016).unwrap();
        assert_eq!(stats.tick, 1);
        assert_eq!(stats.dt, 0.016);
        assert_eq!(engine.last_stats(), stats);

        engine.tick(0.016).unwrap();
        assert_eq!(engine.ticks(), 2);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn test_tick_rejects_non_finite_without_mutating() {
        let mut engine = ClusterEngine::new(line(16), EngineConfig::with_half_cluster_size(2)).unwrap();
        let before = engine.assignments().to_vec();

        engine.particles_mut()[5].position.x = f32::INFINITY;
        let err = engine.tick(0.1).unwrap_err();

        assert_eq!(err, ClusterError::NonFinitePosition { particle: 5 });
        assert_eq!(engine.ticks(), 0);
        assert_eq!(engine.assignments(), &before[..]);
    }

    #[test]
    fn test_set_position_validates() {
        let mut engine = ClusterEngine::new(line(8), EngineConfig::with_half_cluster_size(2)).unwrap();

        engine.set_position(ParticleId(3), Vec3::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(engine.particles()[3].position, Vec3::new(1.0, 2.0, 3.0));

        assert_eq!(
            engine.set_position(ParticleId(3), Vec3::new(f32::NAN, 0.0, 0.0)),
            Err(ClusterError::NonFinitePosition { particle: 3 })
        );
        assert_eq!(
            engine.set_position(ParticleId(8), Vec3::ZERO),
            Err(ClusterError::ParticleOutOfRange { particle: 8, count: 8 })
        );
    }

    #[test]
    fn test_evict_farthest_keeps_particle_pooled_until_tick() {
        let mut engine = ClusterEngine::new(line(8), EngineConfig::with_half_cluster_size(2).reset_count(0)).unwrap();
        let cluster = engine.cluster_of(ParticleId(0)).unwrap();

        let evicted = engine.evict_farthest(cluster).unwrap().unwrap();

        assert_eq!(engine.cluster_of(evicted), None);
        assert_eq!(engine.unassigned_count(), 1);
        engine.check_invariants().unwrap();

        engine.tick(0.0).unwrap();
        assert!(engine.cluster_of(evicted).is_some());
        assert_eq!(engine.unassigned_count(), 0);
    }

    #[test]
    fn test_evict_unknown_cluster() {
        let mut engine = ClusterEngine::new(line(8), EngineConfig::with_half_cluster_size(2)).unwrap();
        assert_eq!(
            engine.evict_farthest(ClusterId(4)),
            Err(ClusterError::ClusterOutOfRange { cluster: 4, count: 4 })
        );
    }

    #[test]
    fn test_highlight() {
        let mut engine = ClusterEngine::new(line(8), EngineConfig::with_half_cluster_size(2)).unwrap();
        assert_eq!(engine.highlight(), None);

        engine.set_highlight(Some(ClusterId(1))).unwrap();
        assert_eq!(engine.snapshot().highlight(), Some(ClusterId(1)));
        assert!(engine.set_highlight(Some(ClusterId(9))).is_err());
        assert_eq!(engine.highlight(), Some(ClusterId(1)));

        engine.set_highlight(None).unwrap();
        assert_eq!(engine.highlight(), None);
    }

    #[test]
    fn test_step_applies_kinematics() {
        let mut particles = line(8);
        for p in &mut particles {
            p.velocity = Vec3::new(0.0, -2.0, 0.0);
        }
        let mut engine = ClusterEngine::new(particles, EngineConfig::with_half_cluster_size(2)).unwrap();

        engine.step(&mut LinearMotion, 0.5).unwrap();

        assert!(engine.particles().iter().all(|p| p.position.y == -1.0));
        assert_eq!(engine.ticks(), 1);
        engine.check_invariants().unwrap();
    }

    #[test]
    fn test_snapshot_matches_engine() {
        let engine = ClusterEngine::new(line(10), EngineConfig::with_half_cluster_size(3)).unwrap();
        let snapshot = engine.snapshot();

        assert_eq!(snapshot.cluster_count(), engine.cluster_count());
        assert_eq!(snapshot.member_counts().iter().sum::<usize>(), 10);
        for view in snapshot.iter() {
            assert_eq!(view.cluster, engine.cluster_of(view.id));
        }
        let vertices = snapshot.gpu_vertices();
        assert_eq!(vertices.len(), 10);
        assert!(vertices.iter().all(|v| v.cluster >= 0.0));
    }

    #[test]
    fn test_overwriting_a_record_keeps_ownership() {
        let mut engine = ClusterEngine::new(line(16), EngineConfig::with_half_cluster_size(2)).unwrap();
        let owner = engine.cluster_of(ParticleId(5));

        engine.particles_mut()[5] = Particle::at(Vec3::new(3.0, 4.0, 0.0));

        assert_eq!(engine.cluster_of(ParticleId(5)), owner);
        engine.check_invariants().unwrap();
        engine.step(&mut LinearMotion, 0.1).unwrap();
        engine.check_invariants().unwrap();
        assert!(engine.cluster_of(ParticleId(5)).is_some());
        let view = engine.snapshot().iter().nth(5).unwrap();
        assert_eq!(view.id, ParticleId(5));
        assert_eq!(view.position, Vec3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn test_swapping_records_keeps_ownership() {
        let mut engine = ClusterEngine::new(line(16), EngineConfig::with_half_cluster_size(2)).unwrap();
        let before = engine.assignments().to_vec();

        engine.particles_mut().swap(0, 15);

        assert_eq!(engine.assignments(), &before[..]);
        assert_eq!(engine.particles()[0].position.x, 15.0);
        engine.tick(0.1).unwrap();
        engine.check_invariants().unwrap();
        assert_eq!(engine.unassigned_count(), 0);
    }

    #[test]
    fn test_engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ClusterEngine>();
    }
}
