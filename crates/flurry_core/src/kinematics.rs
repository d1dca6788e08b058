//! External motion.
//!
//! The engine never moves particles itself. Callers either write positions
//! through [`ClusterEngine::particles_mut`](crate::ClusterEngine::particles_mut)
//! and then call `tick`, or hand a [`Kinematics`] to
//! [`ClusterEngine::step`](crate::ClusterEngine::step).

use crate::particle::Particle;

/// Advances particle positions by one time step.
///
/// Records hold position, velocity and size only. Implementations may
/// rewrite, replace or reorder them; cluster ownership stays keyed by id.
pub trait Kinematics {
    /// Moves every particle forward by `dt` seconds.
    fn advance(&mut self, particles: &mut [Particle], dt: f32);
}

impl<F> Kinematics for F
where
    F: FnMut(&mut [Particle], f32),
{
    fn advance(&mut self, particles: &mut [Particle], dt: f32) {
        self(particles, dt);
    }
}

/// Straight-line motion: `position += velocity * dt`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearMotion;

impl Kinematics for LinearMotion {
    fn advance(&mut self, particles: &mut [Particle], dt: f32) {
        for particle in particles {
            particle.position += particle.velocity * dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn test_linear_motion() {
        let mut particles = [Particle::new(
            Vec3::new(1.0, 10.0, 0.0),
            Vec3::new(0.0, -4.0, 2.0),
            crate::particle::DEFAULT_PARTICLE_SIZE,
        )];

        LinearMotion.advance(&mut particles, 0.5);

        assert_eq!(particles[0].position, Vec3::new(1.0, 8.0, 1.0));
    }

    #[test]
    fn test_closure_kinematics() {
        let mut particles = [Particle::at(Vec3::ZERO)];
        let mut calls = 0;
        let mut lift = |ps: &mut [Particle], dt: f32| {
            calls += 1;
            for p in ps {
                p.position.y += dt;
            }
        };

        lift.advance(&mut particles, 2.0);
        lift.advance(&mut particles, 1.0);

        assert_eq!(particles[0].position.y, 3.0);
        assert_eq!(calls, 2);
    }
}
