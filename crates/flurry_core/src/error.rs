//! # Clustering Error Types
//!
//! All errors that can occur in the clustering engine.
//!
//! Capacity contention is never an error: a full cluster is resolved by
//! eviction. Everything here is either a rejected input or a failed
//! self-check.

use thiserror::Error;

/// Errors that can occur in the clustering engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// The engine was asked to cluster zero particles.
    #[error("particle set is empty")]
    EmptyParticleSet,

    /// `half_cluster_size` was zero, so no cluster count can be derived.
    #[error("half cluster size must be greater than zero")]
    ZeroClusterSize,

    /// The derived cluster count came out as zero.
    #[error("degenerate cluster count: {particles} particles with half cluster size {half_cluster_size}")]
    DegenerateClusterCount {
        /// Number of particles.
        particles: usize,
        /// Requested half cluster size.
        half_cluster_size: usize,
    },

    /// More particles than the `u32` identity space can address.
    #[error("too many particles: {0}")]
    TooManyParticles(usize),

    /// A particle position contained NaN or infinity.
    #[error("particle {particle} has a non-finite position")]
    NonFinitePosition {
        /// The offending particle.
        particle: u32,
    },

    /// Particle id does not exist in the store.
    #[error("particle {particle} out of range: store holds {count}")]
    ParticleOutOfRange {
        /// The requested particle id.
        particle: u32,
        /// Number of particles in the store.
        count: usize,
    },

    /// Cluster id does not exist in the table.
    #[error("cluster {cluster} out of range: table holds {count}")]
    ClusterOutOfRange {
        /// The requested cluster id.
        cluster: u32,
        /// Number of clusters in the table.
        count: usize,
    },

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An ownership, capacity or conservation check failed.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

/// Result type for clustering operations.
pub type ClusterResult<T> = Result<T, ClusterError>;
