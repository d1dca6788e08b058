//! Snowfall kinematics.
//!
//! Flakes fall at their own constant speed, sway sideways on a slow
//! per-flake phase, and re-enter at the top of the box after leaving the
//! bottom. Horizontal exits wrap to the opposite face.

use flurry_core::{Bounds, Kinematics, Particle, Vec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::config::FallSpeed;

/// Golden-ratio step between neighbouring flakes' sway phases.
const PHASE_STEP: f32 = 0.618_034;

/// Falling-snow motion inside a box.
#[derive(Clone, Debug)]
pub struct SnowfallKinematics {
    bounds: Bounds,
    drift: f32,
    elapsed: f32,
}

impl SnowfallKinematics {
    /// Creates the motion for `bounds` with sway amplitude `drift`.
    #[must_use]
    pub const fn new(bounds: Bounds, drift: f32) -> Self {
        Self {
            bounds,
            drift,
            elapsed: 0.0,
        }
    }

    /// Simulated seconds so far.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Sway velocity of the flake at slice index `index` (its id).
    fn sway(&self, index: usize) -> Vec3 {
        let phase = index as f32 * PHASE_STEP;
        Vec3::new(
            self.drift * (self.elapsed * 0.8 + phase).sin(),
            0.0,
            self.drift * (self.elapsed * 0.6 + phase * 1.3).cos(),
        )
    }
}

/// Wraps `value` into `[min, max]`, however far outside it landed.
fn wrap(value: f32, min: f32, max: f32) -> f32 {
    let extent = max - min;
    if value >= min && value <= max {
        value
    } else if extent > 0.0 {
        min + (value - min).rem_euclid(extent)
    } else {
        min
    }
}

impl Kinematics for SnowfallKinematics {
    fn advance(&mut self, particles: &mut [Particle], dt: f32) {
        let Bounds { min, max } = self.bounds;
        for (index, particle) in particles.iter_mut().enumerate() {
            let sway = self.sway(index);
            let mut position = particle.position + (particle.velocity + sway) * dt;

            // Snow only falls, so exits through the top are left alone.
            if position.y < min.y {
                position.y = wrap(position.y, min.y, max.y);
            }
            position.x = wrap(position.x, min.x, max.x);
            position.z = wrap(position.z, min.z, max.z);
            particle.position = position;
        }
        self.elapsed += dt;
    }
}

/// Gives every particle a downward velocity drawn from `fall_speed`.
///
/// Deterministic for a given `seed`.
pub fn seed_velocities(particles: &mut [Particle], fall_speed: FallSpeed, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for particle in particles {
        let speed = if fall_speed.max > fall_speed.min {
            rng.gen_range(fall_speed.min..fall_speed.max)
        } else {
            fall_speed.min
        };
        particle.velocity = Vec3::new(0.0, -speed, 0.0);
    }
}
