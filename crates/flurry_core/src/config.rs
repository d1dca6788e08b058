//! # Engine Configuration
//!
//! Tuning for the clustering engine, loaded once at startup from TOML:
//!
//! ```toml
//! half_cluster_size = 64
//! reset_count = 32
//! seed = 7
//!
//! [centroid_respawn]
//! floor_height = -200.0
//! respawn_height = 240.0
//! ```
//!
//! Every key is optional; missing keys take the [`Default`] values.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};

/// Pulls chronically under-filled, low clusters back up to where new
/// particles appear.
///
/// Tuned for downward-moving fields (snow, rain): particles that fall out of
/// the bottom re-enter at the top, so a nearly empty cluster sitting low
/// is better used near the respawn height.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CentroidRespawn {
    /// Centroids with `y` below this are considered low.
    pub floor_height: f32,
    /// Height a low, under-filled centroid is moved to.
    pub respawn_height: f32,
}

/// Clustering engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Half the per-cluster capacity. `K = ceil(N / half_cluster_size)`.
    pub half_cluster_size: usize,
    /// Drift-correction evictions per tick.
    pub reset_count: usize,
    /// Seed for the engine-owned RNG.
    pub seed: u64,
    /// Optional respawn heuristic, off by default.
    pub centroid_respawn: Option<CentroidRespawn>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            half_cluster_size: 64,
            reset_count: 32,
            seed: 0,
            centroid_respawn: None,
        }
    }
}

impl EngineConfig {
    /// Creates the default configuration with the given half cluster size.
    #[must_use]
    pub fn with_half_cluster_size(half_cluster_size: usize) -> Self {
        Self {
            half_cluster_size,
            ..Self::default()
        }
    }

    /// Sets the drift-correction rounds per tick.
    #[must_use]
    pub const fn reset_count(mut self, reset_count: usize) -> Self {
        self.reset_count = reset_count;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Enables the centroid respawn heuristic.
    #[must_use]
    pub const fn centroid_respawn(mut self, respawn: CentroidRespawn) -> Self {
        self.centroid_respawn = Some(respawn);
        self
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidConfig`] on parse or validation failure.
    pub fn from_toml_str(source: &str) -> ClusterResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| ClusterError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidConfig`] if the file cannot be read,
    /// parsed or validated.
    pub fn from_toml_file(path: impl AsRef<Path>) -> ClusterResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            ClusterError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(
            "Loaded engine config from {} (half_cluster_size={}, reset_count={}, seed={})",
            path.display(),
            config.half_cluster_size,
            config.reset_count,
            config.seed
        );
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::ZeroClusterSize`] for a zero half size and
    /// [`ClusterError::InvalidConfig`] for non-finite respawn heights.
    pub fn validate(&self) -> ClusterResult<()> {
        if self.half_cluster_size == 0 {
            return Err(ClusterError::ZeroClusterSize);
        }
        if let Some(respawn) = self.centroid_respawn {
            if !respawn.floor_height.is_finite() || !respawn.respawn_height.is_finite() {
                return Err(ClusterError::InvalidConfig(
                    "centroid_respawn heights must be finite".to_string(),
                ));
            }
        }
        Ok(())
    }
}
