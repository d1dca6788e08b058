//! # K-means++ Seeding
//!
//! One-shot initial clustering.
//!
//! 1. Cluster 0's centroid is a uniformly random particle.
//! 2. Each further centroid is a particle sampled with probability
//!    proportional to its squared distance from the nearest centroid chosen
//!    so far. Every particle tracks that nearest centroid as we go.
//! 3. Particles are placed, in id order, into the nearest centroid tracked
//!    in step 2. Seeding ignores capacity, so overflow is settled with the
//!    same displacement rule the per-tick reassignment uses.
//!
//! There is no Lloyd refinement: centroids stay on the sampled particles
//! until the first tick replaces them with member means. `O(N·K)`.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::cluster::ClusterId;
use crate::particle::ParticleId;
use crate::recluster::{Join, Reclusterer, TickStats};

/// Summary of the initial clustering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedStats {
    /// Particles placed directly into their seeding-nearest cluster.
    pub placed_nearest: usize,
    /// Incumbents displaced while placing.
    pub displacements: usize,
    /// Particles that had to be reassigned after placement.
    pub deferred: usize,
}

/// Picks `K` centroids and returns each particle's nearest one.
///
/// Centroids are written into the table. The returned vector is indexed
/// by particle id.
fn choose_centroids<R: Rng + ?Sized>(re: &mut Reclusterer<'_>, rng: &mut R) -> Vec<(ClusterId, f32)> {
    let particles = re.particles.as_slice();
    let count = particles.len();

    let first = particles[rng.gen_range(0..count)].position;
    re.table[ClusterId(0)].set_centroid(first);

    let mut nearest: Vec<(ClusterId, f32)> = particles
        .iter()
        .map(|p| (ClusterId(0), p.position.distance_squared(first)))
        .collect();
    let mut weights: Vec<f64> = particles
        .iter()
        .map(|p| p.position.distance_squared_f64(first))
        .collect();

    for k in 1..re.table.len() {
        let pick = match WeightedIndex::new(&weights) {
            Ok(distribution) => distribution.sample(rng),
            // Every particle sits on a chosen centroid.
            Err(_) => rng.gen_range(0..count),
        };
        let centroid = particles[pick].position;
        let cluster = ClusterId(k as u32);
        re.table[cluster].set_centroid(centroid);

        for (i, particle) in particles.iter().enumerate() {
            let weight = particle.position.distance_squared_f64(centroid);
            if weight < weights[i] {
                weights[i] = weight;
                nearest[i] = (cluster, particle.position.distance_squared(centroid));
            }
        }
    }

    nearest
}

/// Builds the initial clustering. Every particle ends up assigned.
pub(crate) fn initialize<R: Rng + ?Sized>(re: &mut Reclusterer<'_>, rng: &mut R) -> SeedStats {
    let nearest = choose_centroids(re, rng);

    let mut stats = SeedStats::default();
    for (i, &(cluster, distance)) in nearest.iter().enumerate() {
        let particle = ParticleId(i as u32);
        match re.try_join(particle, cluster, distance) {
            Join::Joined => stats.placed_nearest += 1,
            Join::Displaced => {
                stats.placed_nearest += 1;
                stats.displacements += 1;
            }
            Join::Refused => re.pool.push(particle),
        }
    }

    stats.deferred = re.pool.len();
    let mut drain = TickStats::default();
    re.reassign_pending(&mut drain);
    stats.displacements += drain.displacements;

    tracing::debug!(
        "Seeded {} clusters: {} placed nearest, {} displaced, {} deferred",
        re.table.len(),
        stats.placed_nearest,
        stats.displacements,
        stats.deferred
    );
    stats
}
