//! # FLURRY Snowfall Driver
//!
//! Drives [`flurry_core::ClusterEngine`] with a falling-snow particle field:
//! a lattice of flakes inside a box, each falling at its own speed with a
//! gentle sideways sway, wrapping back to the top after leaving the floor.
//!
//! ## Example
//!
//! ```rust,ignore
//! use flurry::{Simulation, SimulationConfig};
//!
//! let config = SimulationConfig::from_toml_file("config/snowfall.toml")?;
//! let report = Simulation::new(config)?.run()?;
//! println!("{} ticks, avg {:?}", report.ticks, report.average_tick);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod frame_timer;
pub mod simulation;
pub mod snowfall;

pub use config::{FallSpeed, SimulationConfig, SimulationError, SimulationResult};
pub use frame_timer::FrameTimer;
pub use simulation::{Simulation, SimulationReport};
pub use snowfall::{seed_velocities, SnowfallKinematics};
