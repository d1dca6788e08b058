//! # Simulation Configuration
//!
//! Loaded once at startup from TOML. The `[engine]` table is passed
//! through to [`EngineConfig`] unchanged.
//!
//! ```toml
//! particles_per_dim = [32, 32, 32]
//! drift = 6.0
//! ticks = 600
//! fixed_dt = 0.016666668
//! report_every = 60
//!
//! [bounds]
//! min = { x = -250.0, y = -250.0, z = -250.0 }
//! max = { x = 250.0, y = 250.0, z = 250.0 }
//!
//! [fall_speed]
//! min = 10.0
//! max = 40.0
//!
//! [engine]
//! half_cluster_size = 64
//! ```

use std::path::{Path, PathBuf};

use flurry_core::{lattice_len, Bounds, CentroidRespawn, ClusterError, EngineConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from setting up or running a simulation.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// The config file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Parse or validation failure in the simulation settings.
    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),

    /// The clustering engine rejected its input.
    #[error(transparent)]
    Engine(#[from] ClusterError),
}

/// Result type for simulation operations.
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Range of initial fall speeds, in world units per second.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FallSpeed {
    /// Slowest flake
    pub min: f32,
    /// Fastest flake
    pub max: f32,
}

/// Snowfall simulation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Lattice size along x, y and z.
    pub particles_per_dim: [u32; 3],
    /// Box the snow falls through.
    pub bounds: Bounds,
    /// Initial fall speed range.
    pub fall_speed: FallSpeed,
    /// Horizontal sway amplitude, world units per second.
    pub drift: f32,
    /// Ticks to run.
    pub ticks: u64,
    /// Seconds per tick.
    pub fixed_dt: f32,
    /// Ticks between progress reports (0 disables them).
    pub report_every: u64,
    /// Clustering engine settings.
    pub engine: EngineConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let bounds = Bounds::default();
        Self {
            particles_per_dim: [32, 32, 32],
            bounds,
            fall_speed: FallSpeed { min: 10.0, max: 40.0 },
            drift: 6.0,
            ticks: 600,
            fixed_dt: 1.0 / 60.0,
            report_every: 60,
            engine: EngineConfig::default().centroid_respawn(default_respawn(bounds)),
        }
    }
}

/// Low clusters are lifted to just under the top of the box, where wrapped
/// flakes reappear.
fn default_respawn(bounds: Bounds) -> CentroidRespawn {
    let margin = bounds.extent().y * 0.1;
    CentroidRespawn {
        floor_height: bounds.min.y + margin,
        respawn_height: bounds.max.y - margin,
    }
}

impl SimulationConfig {
    /// Total particle count. Saturates for lattices [`Self::validate`]
    /// rejects as too large.
    #[must_use]
    pub fn particle_count(&self) -> usize {
        self.particles_per_dim
            .iter()
            .fold(1usize, |acc, &d| acc.saturating_mul(d as usize))
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::InvalidConfig`] on parse or validation
    /// failure.
    pub fn from_toml_str(source: &str) -> SimulationResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| SimulationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Io`] if the file cannot be read, otherwise
    /// see [`Self::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> SimulationResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| SimulationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!(
            "Loaded simulation config from {} ({} particles, {} ticks)",
            path.display(),
            config.particle_count(),
            config.ticks
        );
        Ok(config)
    }

    /// Checks value ranges, including the `[engine]` table.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> SimulationResult<()> {
        let invalid = |msg: &str| Err(SimulationError::InvalidConfig(msg.to_string()));

        if self.particles_per_dim.contains(&0) {
            return invalid("particles_per_dim must be non-zero on every axis");
        }
        if lattice_len(self.particles_per_dim).is_none() {
            return invalid("particles_per_dim holds more than u32::MAX particles");
        }
        if !self.bounds.is_valid() || self.bounds.extent().y <= 0.0 {
            return invalid("bounds must be finite with min below max");
        }
        let FallSpeed { min, max } = self.fall_speed;
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return invalid("fall_speed needs 0 <= min <= max");
        }
        if !self.drift.is_finite() || self.drift < 0.0 {
            return invalid("drift must be finite and non-negative");
        }
        if !self.fixed_dt.is_finite() || self.fixed_dt <= 0.0 {
            return invalid("fixed_dt must be positive");
        }
        if self.fall_speed.max * self.fixed_dt >= self.bounds.extent().y {
            return invalid("fall_speed.max * fixed_dt must be below the box height");
        }
        self.engine.validate()?;
        Ok(())
    }
}
