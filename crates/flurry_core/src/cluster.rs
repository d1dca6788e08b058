//! # Cluster Table
//!
//! Fixed-size array of clusters, each a centroid plus a bounded max-heap of
//! member ids keyed by cached squared distance to the centroid.
//!
//! ```text
//! K = ceil(N / half_cluster_size)      clusters, fixed at construction
//! C = 2 * half_cluster_size            members per cluster, at most
//! ```
//!
//! Since `K * C >= 2N`, at least half of the table's slots are always free,
//! so an unassigned particle can always find an open cluster.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{ClusterError, ClusterResult};
use crate::math::Vec3;
use crate::particle::ParticleId;

/// Index of a cluster in the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(pub u32);

impl ClusterId {
    /// Returns the id as a table index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Heap entry: a member id and its cached squared distance.
///
/// Ordered by distance, then by particle id, so the heap top is the
/// farthest member and ties resolve the same way on every run.
#[derive(Clone, Copy, Debug)]
pub struct Member {
    /// The member particle.
    pub particle: ParticleId,
    /// Squared distance to the centroid when the entry was keyed.
    pub distance: f32,
}

impl Member {
    /// Creates a heap entry.
    #[inline]
    #[must_use]
    pub const fn new(particle: ParticleId, distance: f32) -> Self {
        Self { particle, distance }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Member {}

impl PartialOrd for Member {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Member {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.particle.cmp(&other.particle))
    }
}

/// A single cluster: centroid plus bounded membership.
#[derive(Clone, Debug)]
pub struct Cluster {
    /// Current centroid.
    centroid: Vec3,
    /// Members, farthest on top.
    members: BinaryHeap<Member>,
    /// Maximum member count (`C`).
    capacity: usize,
}

impl Cluster {
    /// Creates an empty cluster at the origin.
    ///
    /// Heap storage for `capacity` members is reserved up front.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            centroid: Vec3::ZERO,
            members: BinaryHeap::with_capacity(capacity),
            capacity,
        }
    }

    /// Current centroid.
    #[inline]
    #[must_use]
    pub const fn centroid(&self) -> Vec3 {
        self.centroid
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Maximum number of members (`C`).
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true if no more members fit.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }

    /// Returns true if the cluster has no members.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Adds a member.
    ///
    /// # Errors
    ///
    /// Hands the member back if the cluster is already at capacity.
    pub fn push(&mut self, member: Member) -> Result<(), Member> {
        if self.is_full() {
            return Err(member);
        }
        self.members.push(member);
        Ok(())
    }

    /// The member with the largest cached distance, without removing it.
    #[inline]
    #[must_use]
    pub fn peek_farthest(&self) -> Option<Member> {
        self.members.peek().copied()
    }

    /// Removes and returns the member with the largest cached distance.
    #[inline]
    pub fn pop_farthest(&mut self) -> Option<Member> {
        self.members.pop()
    }

    /// Swaps `member` in for the farthest member if `member` is strictly
    /// closer. `O(log c)`.
    ///
    /// # Errors
    ///
    /// Hands the member back if the cluster is empty or no member is
    /// farther than it.
    pub fn displace_farthest(&mut self, member: Member) -> Result<Member, Member> {
        match self.members.peek_mut() {
            Some(mut top) if member.distance < top.distance => {
                Ok(std::mem::replace(&mut *top, member))
            }
            _ => Err(member),
        }
    }

    /// Iterates members in heap order (not sorted).
    pub fn members(&self) -> impl Iterator<Item = &Member> {
        self.members.iter()
    }

    /// Returns true if `particle` is a member. `O(c)`.
    #[must_use]
    pub fn contains(&self, particle: ParticleId) -> bool {
        self.members.iter().any(|m| m.particle == particle)
    }

    pub(crate) fn set_centroid(&mut self, centroid: Vec3) {
        self.centroid = centroid;
    }

    /// Recomputes every member's key and rebuilds the heap in `O(c)`.
    ///
    /// Reuses the heap's allocation.
    pub(crate) fn rekey(&mut self, mut distance_of: impl FnMut(ParticleId) -> f32) {
        let mut entries = std::mem::take(&mut self.members).into_vec();
        for member in &mut entries {
            member.distance = distance_of(member.particle);
        }
        self.members = BinaryHeap::from(entries);
    }
}

/// Result of scanning the table for a position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NearestClusters {
    /// Globally closest cluster and its squared distance.
    pub closest: (ClusterId, f32),
    /// Closest cluster below capacity, if any.
    pub closest_open: Option<(ClusterId, f32)>,
}

/// The fixed cluster table.
#[derive(Clone, Debug)]
pub struct ClusterTable {
    clusters: Vec<Cluster>,
    half_cluster_size: usize,
}

impl ClusterTable {
    /// Builds `K = ceil(particle_count / half_cluster_size)` empty clusters
    /// of capacity `2 * half_cluster_size`.
    ///
    /// # Errors
    ///
    /// Rejects zero particles, a zero half size, and any parameter pair
    /// that would produce zero clusters or overflow the capacity.
    pub fn new(particle_count: usize, half_cluster_size: usize) -> ClusterResult<Self> {
        if particle_count == 0 {
            return Err(ClusterError::EmptyParticleSet);
        }
        if half_cluster_size == 0 {
            return Err(ClusterError::ZeroClusterSize);
        }
        let capacity = half_cluster_size.checked_mul(2).ok_or_else(|| {
            ClusterError::InvalidConfig(format!(
                "half cluster size {half_cluster_size} overflows cluster capacity"
            ))
        })?;

        let count = particle_count.div_ceil(half_cluster_size);
        if count == 0 || u32::try_from(count).is_err() {
            return Err(ClusterError::DegenerateClusterCount {
                particles: particle_count,
                half_cluster_size,
            });
        }

        let clusters = (0..count).map(|_| Cluster::new(capacity)).collect();
        Ok(Self {
            clusters,
            half_cluster_size,
        })
    }

    /// Number of clusters (`K`).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Always false: construction rejects empty tables.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Per-cluster capacity (`C`).
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.half_cluster_size * 2
    }

    /// The half cluster size the table was built with.
    #[inline]
    #[must_use]
    pub const fn half_cluster_size(&self) -> usize {
        self.half_cluster_size
    }

    /// Gets a cluster.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(id.index())
    }

    /// Member count of a cluster.
    #[inline]
    #[must_use]
    pub fn member_count(&self, id: ClusterId) -> Option<usize> {
        self.get(id).map(Cluster::member_count)
    }

    /// Centroid of a cluster.
    #[inline]
    #[must_use]
    pub fn centroid(&self, id: ClusterId) -> Option<Vec3> {
        self.get(id).map(Cluster::centroid)
    }

    /// Iterates clusters in table order.
    pub fn iter(&self) -> impl Iterator<Item = (ClusterId, &Cluster)> {
        self.clusters
            .iter()
            .enumerate()
            .map(|(i, c)| (ClusterId(i as u32), c))
    }

    /// Sum of member counts over all clusters.
    #[must_use]
    pub fn total_members(&self) -> usize {
        self.clusters.iter().map(Cluster::member_count).sum()
    }

    /// Scans clusters in table order for the closest one and the closest
    /// one with room.
    ///
    /// Ties keep the first cluster encountered. `O(K)`.
    #[must_use]
    pub fn scan(&self, position: Vec3) -> NearestClusters {
        let mut closest = (ClusterId(0), f32::INFINITY);
        let mut closest_open: Option<(ClusterId, f32)> = None;

        for (id, cluster) in self.iter() {
            let distance = position.distance_squared(cluster.centroid);
            if distance < closest.1 {
                closest = (id, distance);
            }
            if !cluster.is_full() && closest_open.map_or(true, |(_, best)| distance < best) {
                closest_open = Some((id, distance));
            }
        }

        NearestClusters {
            closest,
            closest_open,
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: ClusterId) -> Option<&mut Cluster> {
        self.clusters.get_mut(id.index())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (ClusterId, &mut Cluster)> {
        self.clusters
            .iter_mut()
            .enumerate()
            .map(|(i, c)| (ClusterId(i as u32), c))
    }
}

impl std::ops::Index<ClusterId> for ClusterTable {
    type Output = Cluster;

    fn index(&self, id: ClusterId) -> &Cluster {
        &self.clusters[id.index()]
    }
}

impl std::ops::IndexMut<ClusterId> for ClusterTable {
    fn index_mut(&mut self, id: ClusterId) -> &mut Cluster {
        &mut self.clusters[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_dimensions() {
        let table = ClusterTable::new(8, 2).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.capacity(), 4);

        // ceil(10 / 4) = 3
        let table = ClusterTable::new(10, 4).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.capacity(), 8);

        let table = ClusterTable::new(1, 64).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_table_rejects_degenerate_input() {
        assert_eq!(ClusterTable::new(0, 4).unwrap_err(), ClusterError::EmptyParticleSet);
        assert_eq!(ClusterTable::new(10, 0).unwrap_err(), ClusterError::ZeroClusterSize);
        assert!(matches!(
            ClusterTable::new(10, usize::MAX),
            Err(ClusterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_push_refuses_when_full() {
        let mut cluster = Cluster::new(2);
        assert!(cluster.push(Member::new(ParticleId(0), 1.0)).is_ok());
        assert!(cluster.push(Member::new(ParticleId(1), 2.0)).is_ok());
        assert!(cluster.is_full());

        let rejected = cluster.push(Member::new(ParticleId(2), 0.5)).unwrap_err();
        assert_eq!(rejected.particle, ParticleId(2));
        assert_eq!(cluster.member_count(), 2);
    }

    #[test]
    fn test_heap_pops_farthest_first() {
        let mut cluster = Cluster::new(8);
        for (id, distance) in [(0, 3.0), (1, 9.0), (2, 1.0), (3, 4.0)] {
            cluster.push(Member::new(ParticleId(id), distance)).unwrap();
        }

        assert_eq!(cluster.peek_farthest().unwrap().particle, ParticleId(1));
        let order: Vec<u32> = std::iter::from_fn(|| cluster.pop_farthest())
            .map(|m| m.particle.0)
            .collect();
        assert_eq!(order, vec![1, 3, 0, 2]);
        assert!(cluster.is_empty());
    }

    #[test]
    fn test_displace_farthest_requires_strictly_closer() {
        let mut cluster = Cluster::new(2);
        cluster.push(Member::new(ParticleId(0), 1.0)).unwrap();
        cluster.push(Member::new(ParticleId(1), 6.0)).unwrap();

        // Tie with the farthest member: no displacement.
        let refused = cluster.displace_farthest(Member::new(ParticleId(2), 6.0)).unwrap_err();
        assert_eq!(refused.particle, ParticleId(2));

        let evicted = cluster.displace_farthest(Member::new(ParticleId(3), 2.0)).unwrap();
        assert_eq!(evicted.particle, ParticleId(1));
        assert_eq!(cluster.member_count(), 2);
        assert!(cluster.contains(ParticleId(3)));
        assert_eq!(cluster.peek_farthest().unwrap().particle, ParticleId(3));
    }

    #[test]
    fn test_equal_distances_break_on_particle_id() {
        let mut cluster = Cluster::new(4);
        cluster.push(Member::new(ParticleId(5), 2.0)).unwrap();
        cluster.push(Member::new(ParticleId(9), 2.0)).unwrap();
        cluster.push(Member::new(ParticleId(7), 2.0)).unwrap();

        assert_eq!(cluster.pop_farthest().unwrap().particle, ParticleId(9));
        assert_eq!(cluster.pop_farthest().unwrap().particle, ParticleId(7));
    }

    #[test]
    fn test_rekey_reorders_heap() {
        let mut cluster = Cluster::new(4);
        cluster.push(Member::new(ParticleId(0), 10.0)).unwrap();
        cluster.push(Member::new(ParticleId(1), 1.0)).unwrap();

        cluster.rekey(|p| if p == ParticleId(1) { 50.0 } else { 0.5 });

        let top = cluster.peek_farthest().unwrap();
        assert_eq!(top.particle, ParticleId(1));
        assert_eq!(top.distance, 50.0);
        assert_eq!(cluster.member_count(), 2);
    }

    #[test]
    fn test_scan_prefers_first_on_ties() {
        let mut table = ClusterTable::new(4, 1).unwrap();
        table[ClusterId(0)].set_centroid(Vec3::new(-1.0, 0.0, 0.0));
        table[ClusterId(1)].set_centroid(Vec3::new(1.0, 0.0, 0.0));
        table[ClusterId(2)].set_centroid(Vec3::new(1.0, 0.0, 0.0));
        table[ClusterId(3)].set_centroid(Vec3::new(9.0, 0.0, 0.0));

        let nearest = table.scan(Vec3::ZERO);
        assert_eq!(nearest.closest, (ClusterId(0), 1.0));
        assert_eq!(nearest.closest_open, Some((ClusterId(0), 1.0)));

        let nearest = table.scan(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(nearest.closest.0, ClusterId(1));
    }

    #[test]
    fn test_scan_skips_full_clusters_for_open_slot() {
        let mut table = ClusterTable::new(4, 1).unwrap();
        table[ClusterId(0)].set_centroid(Vec3::ZERO);
        table[ClusterId(1)].set_centroid(Vec3::new(5.0, 0.0, 0.0));
        table[ClusterId(2)].set_centroid(Vec3::new(50.0, 0.0, 0.0));
        table[ClusterId(3)].set_centroid(Vec3::new(500.0, 0.0, 0.0));
        table[ClusterId(0)].push(Member::new(ParticleId(0), 0.0)).unwrap();
        table[ClusterId(0)].push(Member::new(ParticleId(1), 0.0)).unwrap();

        let nearest = table.scan(Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(nearest.closest.0, ClusterId(0));
        assert_eq!(nearest.closest_open.unwrap().0, ClusterId(1));
    }
}
