//! # Snowfall Simulation Loop
//!
//! ```text
//! each tick:
//!   snowfall kinematics -> ClusterEngine::tick -> timing + totals
//! every report_every ticks:
//!   log progress, move the highlight to the next cluster
//! ```
//!
//! Runs at a fixed time step so a given config replays identically.

use std::time::{Duration, Instant};

use flurry_core::{lattice, ClusterEngine, ClusterId, TickStats};

use crate::config::{SimulationConfig, SimulationResult};
use crate::frame_timer::FrameTimer;
use crate::snowfall::{seed_velocities, SnowfallKinematics};

/// Summary of a run so far.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationReport {
    /// Ticks completed.
    pub ticks: u64,
    /// Particle count (`N`).
    pub particles: usize,
    /// Cluster count (`K`).
    pub clusters: usize,
    /// Per-cluster capacity (`C`).
    pub capacity: usize,
    /// Drift-correction evictions over all ticks.
    pub drift_evictions: usize,
    /// Displacements over all ticks.
    pub displacements: usize,
    /// Reassignments over all ticks.
    pub reassigned: usize,
    /// Respawned centroids over all ticks.
    pub respawned_centroids: usize,
    /// Fewest members in any cluster right now.
    pub min_members: usize,
    /// Most members in any cluster right now.
    pub max_members: usize,
    /// Rolling average tick time.
    pub average_tick: Option<Duration>,
    /// Slowest tick.
    pub max_tick: Duration,
}

#[derive(Clone, Copy, Debug, Default)]
struct Totals {
    drift_evictions: usize,
    displacements: usize,
    reassigned: usize,
    respawned_centroids: usize,
}

impl Totals {
    fn add(&mut self, stats: &TickStats) {
        self.drift_evictions += stats.drift_evictions;
        self.displacements += stats.displacements;
        self.reassigned += stats.reassigned;
        self.respawned_centroids += stats.respawned_centroids;
    }
}

/// Snowfield plus clustering engine, advanced at a fixed step.
#[derive(Debug)]
pub struct Simulation {
    engine: ClusterEngine,
    kinematics: SnowfallKinematics,
    config: SimulationConfig,
    timer: FrameTimer,
    totals: Totals,
}

impl Simulation {
    /// Lays out the snowfield and builds the initial clustering.
    ///
    /// # Errors
    ///
    /// Returns a config error or whatever the engine rejects.
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;

        let mut particles = lattice(config.particles_per_dim, config.bounds)?;
        seed_velocities(&mut particles, config.fall_speed, config.engine.seed);
        let engine = ClusterEngine::new(particles, config.engine.clone())?;

        tracing::info!(
            "Snowfall ready: {} flakes, {} clusters of {}, dt {:.4}s",
            engine.particle_count(),
            engine.cluster_count(),
            engine.cluster_capacity(),
            config.fixed_dt
        );

        Ok(Self {
            engine,
            kinematics: SnowfallKinematics::new(config.bounds, config.drift),
            config,
            timer: FrameTimer::default(),
            totals: Totals::default(),
        })
    }

    /// The clustering engine.
    #[must_use]
    pub const fn engine(&self) -> &ClusterEngine {
        &self.engine
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Tick timing.
    #[must_use]
    pub const fn timer(&self) -> &FrameTimer {
        &self.timer
    }

    /// Advances one fixed step.
    ///
    /// # Errors
    ///
    /// Propagates engine errors.
    pub fn step(&mut self) -> SimulationResult<TickStats> {
        let start = Instant::now();
        let stats = self.engine.step(&mut self.kinematics, self.config.fixed_dt)?;
        self.timer.record(start.elapsed());
        self.totals.add(&stats);

        if self.config.report_every > 0 && stats.tick % self.config.report_every == 0 {
            self.cycle_highlight()?;
            let report = self.report();
            tracing::info!(
                "Tick {}: avg {:.3} ms, members {}..{}, {} reassigned, highlight {:?}",
                report.ticks,
                self.timer.average_ms(),
                report.min_members,
                report.max_members,
                report.reassigned,
                self.engine.highlight()
            );
        }
        Ok(stats)
    }

    /// Runs `ticks` steps.
    ///
    /// # Errors
    ///
    /// Stops at the first engine error.
    pub fn run_for(&mut self, ticks: u64) -> SimulationResult<SimulationReport> {
        for _ in 0..ticks {
            self.step()?;
        }
        Ok(self.report())
    }

    /// Runs the configured number of ticks.
    ///
    /// # Errors
    ///
    /// Stops at the first engine error.
    pub fn run(&mut self) -> SimulationResult<SimulationReport> {
        self.run_for(self.config.ticks)
    }

    /// Current summary.
    #[must_use]
    pub fn report(&self) -> SimulationReport {
        let counts = self.engine.snapshot().member_counts();
        SimulationReport {
            ticks: self.engine.ticks(),
            particles: self.engine.particle_count(),
            clusters: self.engine.cluster_count(),
            capacity: self.engine.cluster_capacity(),
            drift_evictions: self.totals.drift_evictions,
            displacements: self.totals.displacements,
            reassigned: self.totals.reassigned,
            respawned_centroids: self.totals.respawned_centroids,
            min_members: counts.iter().copied().min().unwrap_or(0),
            max_members: counts.iter().copied().max().unwrap_or(0),
            average_tick: self.timer.average(),
            max_tick: self.timer.max(),
        }
    }

    /// Moves the highlight to the next cluster, wrapping at the end.
    fn cycle_highlight(&mut self) -> SimulationResult<()> {
        let count = self.engine.cluster_count() as u32;
        let next = self.engine.highlight().map_or(0, |c| (c.0 + 1) % count);
        self.engine.set_highlight(Some(ClusterId(next)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flurry_core::EngineConfig;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            particles_per_dim: [6, 6, 6],
            report_every: 5,
            engine: EngineConfig::with_half_cluster_size(8).reset_count(6),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_run_for_counts_ticks() {
        let mut sim = Simulation::new(small_config()).unwrap();
        let report = sim.run_for(12).unwrap();

        assert_eq!(report.ticks, 12);
        assert_eq!(report.particles, 216);
        assert_eq!(report.clusters, 27);
        assert_eq!(report.capacity, 16);
        assert!(report.max_members <= 16);
        assert_eq!(sim.timer().recorded(), 12);
        sim.engine().check_invariants().unwrap();
    }

    #[test]
    fn test_highlight_cycles_on_reports() {
        let mut sim = Simulation::new(small_config()).unwrap();
        assert_eq!(sim.engine().highlight(), None);

        sim.run_for(5).unwrap();
        assert_eq!(sim.engine().highlight(), Some(ClusterId(0)));

        sim.run_for(5).unwrap();
        assert_eq!(sim.engine().highlight(), Some(ClusterId(1)));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SimulationConfig {
            fixed_dt: -1.0,
            ..small_config()
        };
        assert!(Simulation::new(config).is_err());
    }
}
