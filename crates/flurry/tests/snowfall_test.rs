//! Integration tests for the snowfall driver.

use flurry::{Simulation, SimulationConfig};
use flurry_core::{ClusterId, EngineConfig};

fn small_config(seed: u64) -> SimulationConfig {
    SimulationConfig {
        particles_per_dim: [8, 8, 8],
        ticks: 40,
        report_every: 0,
        engine: EngineConfig::with_half_cluster_size(16).reset_count(8).seed(seed),
        ..SimulationConfig::default()
    }
}

#[test]
fn test_shipped_config_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/snowfall.toml");
    let config = SimulationConfig::from_toml_file(path).unwrap();

    assert_eq!(config, SimulationConfig::default());
}

#[test]
fn test_snowfield_stays_clustered() {
    let mut sim = Simulation::new(small_config(1)).unwrap();

    for _ in 0..40 {
        let stats = sim.step().unwrap();
        assert_eq!(stats.stranded, 0);
        sim.engine().check_invariants().unwrap();
        assert_eq!(sim.engine().unassigned_count(), 0);
    }

    let bounds = sim.config().bounds;
    assert!(sim
        .engine()
        .particles()
        .iter()
        .all(|p| bounds.contains(p.position)));
}

#[test]
fn test_run_uses_configured_ticks() {
    let mut sim = Simulation::new(small_config(2)).unwrap();
    let report = sim.run().unwrap();

    assert_eq!(report.ticks, 40);
    assert_eq!(report.particles, 512);
    assert_eq!(report.clusters, 32);
    assert!(report.max_members <= report.capacity);
    assert!(report.drift_evictions <= 40 * 8);
    assert!(report.average_tick.is_some());
}

#[test]
fn test_oversize_lattice_is_rejected() {
    let config = SimulationConfig {
        particles_per_dim: [2000, 2000, 2000],
        ..small_config(0)
    };
    assert!(matches!(
        Simulation::new(config),
        Err(flurry::SimulationError::InvalidConfig(_))
    ));
}

#[test]
fn test_replay_is_deterministic() {
    let run = || {
        let mut sim = Simulation::new(small_config(9)).unwrap();
        sim.run().unwrap();
        let engine = sim.engine();
        let clusters: Vec<Option<ClusterId>> = engine.assignments().to_vec();
        (clusters, engine.snapshot().centroids())
    };

    assert_eq!(run(), run());
}

#[test]
fn test_gpu_vertices_after_run() {
    let mut sim = Simulation::new(small_config(4)).unwrap();
    sim.run_for(3).unwrap();

    let snapshot = sim.engine().snapshot();
    let vertices = snapshot.gpu_vertices();

    assert_eq!(vertices.len(), 512);
    assert_eq!(flurry_core::gpu_bytes(&vertices).len(), 512 * 36);
    assert!(vertices.iter().all(|v| v.cluster >= 0.0 && v.velocity[1] < 0.0));
}
