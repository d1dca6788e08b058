//! # Incremental Re-clustering
//!
//! Per-tick maintenance of the clustering as particles move:
//!
//! ```text
//! 1. DRIFT CORRECTION   reset_count x: random cluster -> pop farthest -> pool
//! 2. REASSIGNMENT       pool (FIFO) -> closest cluster
//!                         full and we're closer than its farthest? displace it
//!                         otherwise closest cluster with room
//! 3. CENTROIDS          mean of members, optional respawn, refresh heap keys
//! ```
//!
//! Best case `O(N)`: the pool is small and step 3 touches every particle
//! once. Worst case `O(N·K)`: most of the set is unassigned and every
//! particle scans the whole table.
//!
//! Heap keys of members that have not been re-keyed since they moved are
//! stale during step 2. Displacement compares against those stale keys.

use rand::Rng;

use crate::cluster::{ClusterId, ClusterTable, Member};
use crate::config::CentroidRespawn;
use crate::math::MeanAccumulator;
use crate::particle::{ParticleId, ParticleStore};
use crate::pool::UnassignedPool;

/// What happened during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickStats {
    /// Tick number (1 for the first tick after construction).
    pub tick: u64,
    /// Elapsed time passed to the tick.
    pub dt: f32,
    /// Particles sent to the pool by drift correction.
    pub drift_evictions: usize,
    /// Incumbents pushed out of a full cluster by a closer particle.
    pub displacements: usize,
    /// Particles taken out of the pool and placed in a cluster.
    pub reassigned: usize,
    /// Centroids moved by the respawn heuristic.
    pub respawned_centroids: usize,
    /// Particles left in the pool because no cluster had room.
    ///
    /// Always zero while `K·C >= N`, which construction guarantees.
    pub stranded: usize,
}

/// Outcome of offering a particle to one cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Join {
    /// The cluster had room.
    Joined,
    /// The cluster was full; this incumbent went to the pool.
    Displaced,
    /// The cluster was full and every incumbent was at least as close.
    Refused,
}

/// Mutable view over the engine's clustering state.
pub(crate) struct Reclusterer<'a> {
    pub(crate) particles: &'a mut ParticleStore,
    pub(crate) table: &'a mut ClusterTable,
    pub(crate) pool: &'a mut UnassignedPool,
    pub(crate) centroid_sums: &'a mut Vec<MeanAccumulator>,
}

impl Reclusterer<'_> {
    /// Runs one full tick.
    pub(crate) fn run_tick<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        reset_count: usize,
        respawn: Option<CentroidRespawn>,
    ) -> TickStats {
        let mut stats = TickStats {
            drift_evictions: self.drift_correct(rng, reset_count),
            ..TickStats::default()
        };
        self.reassign_pending(&mut stats);
        stats.respawned_centroids = self.recompute_centroids(respawn);
        stats
    }

    /// Pops the farthest member of `cluster` into the pool.
    ///
    /// Returns `None` if the cluster is empty or does not exist.
    pub(crate) fn evict_farthest(&mut self, cluster: ClusterId) -> Option<ParticleId> {
        let member = self.table.get_mut(cluster)?.pop_farthest()?;
        self.particles.unassign(member.particle);
        self.pool.push(member.particle);
        tracing::trace!(
            "Evicted {} from {} (cached distance {})",
            member.particle,
            cluster,
            member.distance
        );
        Some(member.particle)
    }

    /// Performs `rounds` evictions from uniformly chosen clusters.
    ///
    /// Empty clusters still consume a round. Returns the number of
    /// particles actually evicted.
    pub(crate) fn drift_correct<R: Rng + ?Sized>(&mut self, rng: &mut R, rounds: usize) -> usize {
        let cluster_count = self.table.len();
        let mut evicted = 0;
        for _ in 0..rounds {
            let cluster = ClusterId(rng.gen_range(0..cluster_count) as u32);
            if self.evict_farthest(cluster).is_some() {
                evicted += 1;
            }
        }
        evicted
    }

    /// Offers `particle` to `cluster` at the given squared distance.
    pub(crate) fn try_join(&mut self, particle: ParticleId, cluster: ClusterId, distance: f32) -> Join {
        let target = &mut self.table[cluster];
        let joined = match target.push(Member::new(particle, distance)) {
            Ok(()) => Join::Joined,
            Err(member) => match target.displace_farthest(member) {
                Ok(evicted) => {
                    self.particles.unassign(evicted.particle);
                    self.pool.push(evicted.particle);
                    tracing::trace!(
                        "{} displaced {} from {} ({} < {})",
                        particle,
                        evicted.particle,
                        cluster,
                        distance,
                        evicted.distance
                    );
                    Join::Displaced
                }
                Err(_) => Join::Refused,
            },
        };
        if joined != Join::Refused {
            self.particles.assign(particle, cluster, distance);
        }
        joined
    }

    /// Drains the pool, placing every particle (and anyone it displaces).
    ///
    /// Terminates: each displacement strictly lowers the sorted key vector
    /// of the displacing cluster, and centroids are fixed during the drain.
    pub(crate) fn reassign_pending(&mut self, stats: &mut TickStats) {
        let mut stranded = Vec::new();

        while let Some(particle) = self.pool.pop() {
            let position = self.particles[particle].position;
            let nearest = self.table.scan(position);
            let (closest, distance) = nearest.closest;

            let mut outcome = self.try_join(particle, closest, distance);
            if outcome == Join::Refused {
                if let Some((open, open_distance)) = nearest.closest_open {
                    outcome = self.try_join(particle, open, open_distance);
                }
            }

            match outcome {
                Join::Joined => stats.reassigned += 1,
                Join::Displaced => {
                    stats.reassigned += 1;
                    stats.displacements += 1;
                }
                Join::Refused => stranded.push(particle),
            }
        }

        if !stranded.is_empty() {
            tracing::warn!(
                "{} particles found no cluster with room ({} clusters of {})",
                stranded.len(),
                self.table.len(),
                self.table.capacity()
            );
            stats.stranded = stranded.len();
            for particle in stranded {
                self.pool.push(particle);
            }
        }
    }

    /// Moves every non-empty centroid to its members' mean, applies the
    /// respawn heuristic, and re-keys every heap.
    ///
    /// Means are accumulated in particle-id order so the result does not
    /// depend on heap layout. Returns the number of respawned centroids.
    pub(crate) fn recompute_centroids(&mut self, respawn: Option<CentroidRespawn>) -> usize {
        let sums = &mut *self.centroid_sums;
        sums.clear();
        sums.resize(self.table.len(), MeanAccumulator::default());
        for (_, particle, owner) in self.particles.iter_assigned() {
            if let Some(cluster) = owner {
                sums[cluster.index()].add(particle.position);
            }
        }

        let particles = &mut *self.particles;
        let mut respawned = 0;
        for (id, cluster) in self.table.iter_mut() {
            let mut centroid = sums[id.index()].mean().unwrap_or(cluster.centroid());

            if let Some(respawn) = respawn {
                let under_filled = cluster.member_count() < cluster.capacity() / 2;
                if under_filled && centroid.y < respawn.floor_height {
                    centroid.y = respawn.respawn_height;
                    respawned += 1;
                }
            }

            cluster.set_centroid(centroid);
            cluster.rekey(|member| {
                let distance = particles[member].position.distance_squared(centroid);
                particles.set_cached_distance(member, distance);
                distance
            });
        }
        respawned
    }
}
