//! # Snowfall
//!
//! Headless snowfall run: lays out the snowfield, clusters it, advances it
//! at a fixed step and prints a summary.
//!
//! ```bash
//! snowfall --config crates/flurry/config/snowfall.toml --ticks 1200 -v
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use flurry::{Simulation, SimulationConfig, SimulationReport, SimulationResult};
use tracing_subscriber::{fmt, EnvFilter};

/// Snowfall clustering simulation
#[derive(Parser)]
#[command(name = "snowfall")]
#[command(author = "FLURRY Team")]
#[command(version)]
#[command(about = "Runs the FLURRY clustering engine over a falling snowfield")]
struct Cli {
    /// Simulation config (TOML). Built-in defaults if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of ticks to run
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Override the engine RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("snowfall: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> SimulationResult<SimulationReport> {
    let mut config = match &cli.config {
        Some(path) => SimulationConfig::from_toml_file(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(ticks) = cli.ticks {
        config.ticks = ticks;
    }
    if let Some(seed) = cli.seed {
        config.engine.seed = seed;
    }

    let mut simulation = Simulation::new(config)?;
    let report = simulation.run()?;
    simulation.engine().check_invariants()?;
    Ok(report)
}

fn print_summary(report: &SimulationReport) {
    let average_ms = report
        .average_tick
        .map_or(0.0, |d| d.as_secs_f64() * 1000.0);

    println!("═══════════════════════════════════════════════════════════");
    println!("                   SNOWFALL SUMMARY");
    println!("═══════════════════════════════════════════════════════════");
    println!("Ticks:              {}", report.ticks);
    println!("Particles:          {}", report.particles);
    println!("Clusters:           {} x capacity {}", report.clusters, report.capacity);
    println!("Members per cluster {}..{}", report.min_members, report.max_members);
    println!("Drift evictions:    {}", report.drift_evictions);
    println!("Displacements:      {}", report.displacements);
    println!("Reassigned:         {}", report.reassigned);
    println!("Respawned centroids {}", report.respawned_centroids);
    println!("Average tick:       {average_ms:.3} ms");
    println!("Slowest tick:       {:.3} ms", report.max_tick.as_secs_f64() * 1000.0);
}
