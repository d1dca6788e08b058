//! # FLURRY Core
//!
//! Online clustering for large, continuously moving particle fields.
//!
//! Particles are partitioned into `K = ceil(N / half_cluster_size)` clusters
//! of at most `C = 2 * half_cluster_size` members each, so renderers can
//! batch, cull or visualise particles per cluster without rebuilding a
//! spatial index every frame.
//!
//! ## Design Principles
//!
//! 1. **Arena + index** - clusters and the pool hold `ParticleId`s, never references
//! 2. **Bounded clusters** - a full cluster evicts its farthest member instead of growing
//! 3. **Incremental** - each tick touches a few evicted particles plus one centroid pass
//! 4. **Deterministic** - engine-owned ChaCha RNG, seeded from config
//!
//! ## Tick Pipeline
//!
//! ```text
//! kinematics (caller) -> drift eviction -> reassignment -> centroid means
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use flurry_core::{ClusterEngine, EngineConfig, LinearMotion};
//!
//! let config = EngineConfig::from_toml_file("config/engine.toml")?;
//! let mut engine = ClusterEngine::new(particles, config)?;
//!
//! let stats = engine.step(&mut LinearMotion, 1.0 / 60.0)?;
//! let vertices = engine.snapshot().gpu_vertices();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod cluster;
pub mod config;
pub mod engine;
pub mod error;
pub mod kinematics;
pub mod layout;
pub mod math;
pub mod particle;
pub mod pool;
pub mod recluster;
pub mod seeding;
pub mod snapshot;

pub use cluster::{Cluster, ClusterId, ClusterTable, Member, NearestClusters};
pub use config::{CentroidRespawn, EngineConfig};
pub use engine::ClusterEngine;
pub use error::{ClusterError, ClusterResult};
pub use kinematics::{Kinematics, LinearMotion};
pub use layout::{cube_lattice, lattice, lattice_len, Bounds};
pub use math::{Vec2, Vec3};
pub use particle::{Particle, ParticleId, ParticleStore, DEFAULT_PARTICLE_SIZE};
pub use pool::UnassignedPool;
pub use recluster::TickStats;
pub use seeding::SeedStats;
pub use snapshot::{gpu_bytes, EngineSnapshot, GpuParticle, ParticleView};
