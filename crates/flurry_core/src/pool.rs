//! # Unassigned Pool
//!
//! Particles that no cluster currently owns, waiting for reassignment.
//!
//! The pool is a FIFO queue of ids: particles are reassigned in the order
//! they were evicted, which keeps replays deterministic. A particle is in
//! the pool exactly when its `cluster()` is `None`; the reclusterer keeps
//! both sides in step.

use std::collections::VecDeque;

use crate::particle::ParticleId;

/// Queue of unassigned particle ids ("cluster zero").
#[derive(Clone, Debug, Default)]
pub struct UnassignedPool {
    pending: VecDeque<ParticleId>,
}

impl UnassignedPool {
    /// Creates a pool with room for `capacity` ids.
    ///
    /// Sized to the particle count so the queue never reallocates.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
        }
    }

    /// Number of unassigned particles.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if every particle is owned by a cluster.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns true if `particle` is waiting in the pool. `O(n)`.
    #[must_use]
    pub fn contains(&self, particle: ParticleId) -> bool {
        self.pending.contains(&particle)
    }

    /// Iterates pending ids in reassignment order.
    pub fn iter(&self) -> impl Iterator<Item = &ParticleId> {
        self.pending.iter()
    }

    pub(crate) fn push(&mut self, particle: ParticleId) {
        self.pending.push_back(particle);
    }

    pub(crate) fn pop(&mut self) -> Option<ParticleId> {
        self.pending.pop_front()
    }
}
