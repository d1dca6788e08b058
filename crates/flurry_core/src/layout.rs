//! Initial particle layouts.
//!
//! Particles start on a regular grid inside an axis-aligned box. Each
//! particle sits at the centre of its grid cell, so no two coincide and
//! nothing touches the box faces.

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};
use crate::math::Vec3;
use crate::particle::Particle;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: Vec3,
    /// Maximum corner
    pub max: Vec3,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: Vec3::splat(-250.0),
            max: Vec3::splat(250.0),
        }
    }
}

impl Bounds {
    /// Creates a box from its corners.
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Size along each axis.
    #[inline]
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns true if `point` lies inside the box (faces included).
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Returns true if both corners are finite and `min <= max` on every axis.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min.is_finite()
            && self.max.is_finite()
            && self.min.x <= self.max.x
            && self.min.y <= self.max.y
            && self.min.z <= self.max.z
    }

    fn cell_centre(&self, cell: [u32; 3], dims: [u32; 3]) -> Vec3 {
        let extent = self.extent();
        let axis = |i: usize, min: f32, size: f32| {
            min + size * ((cell[i] as f32 + 0.5) / dims[i] as f32)
        };
        Vec3::new(
            axis(0, self.min.x, extent.x),
            axis(1, self.min.y, extent.y),
            axis(2, self.min.z, extent.z),
        )
    }
}

/// Particle count of a `dims` lattice, `None` if `u32` ids cannot address it.
#[must_use]
pub fn lattice_len(dims: [u32; 3]) -> Option<usize> {
    let total = dims
        .iter()
        .try_fold(1u64, |acc, &d| acc.checked_mul(u64::from(d)))?;
    u32::try_from(total).ok().map(|n| n as usize)
}

/// Places `dims[0] * dims[1] * dims[2]` resting particles on a grid.
///
/// Particle `i` lands in cell `(i mod dx, (i / dx) mod dy, i / (dx * dy))`.
/// Any zero dimension yields an empty set.
///
/// # Errors
///
/// Returns [`ClusterError::TooManyParticles`] before allocating if the
/// lattice holds more particles than `u32` ids can address.
pub fn lattice(dims: [u32; 3], bounds: Bounds) -> ClusterResult<Vec<Particle>> {
    let total = lattice_len(dims).ok_or_else(|| {
        let wide = dims.iter().fold(1u128, |acc, &d| acc * u128::from(d));
        ClusterError::TooManyParticles(usize::try_from(wide).unwrap_or(usize::MAX))
    })?;
    Ok(grid(dims, total, bounds))
}

/// Places `count` resting particles on the smallest cube grid that fits them.
///
/// The grid has `ceil(cbrt(count))` cells per axis and is filled in the
/// same order as [`lattice`]; trailing cells stay empty.
#[must_use]
pub fn cube_lattice(count: usize, bounds: Bounds) -> Vec<Particle> {
    let side = cube_side(count);
    grid([side; 3], count, bounds)
}

fn grid(dims: [u32; 3], count: usize, bounds: Bounds) -> Vec<Particle> {
    if dims.contains(&0) {
        return Vec::new();
    }
    let dx = dims[0] as usize;
    let dy = dims[1] as usize;
    (0..count)
        .map(|i| {
            let cell = [(i % dx) as u32, ((i / dx) % dy) as u32, (i / (dx * dy)) as u32];
            Particle::at(bounds.cell_centre(cell, dims))
        })
        .collect()
}

/// Smallest `s` with `s^3 >= count`.
fn cube_side(count: usize) -> u32 {
    if count == 0 {
        return 0;
    }
    let mut side = (count as f64).cbrt().ceil() as u64;
    // Float cbrt can land one off either way.
    while side.pow(3) < count as u64 {
        side += 1;
    }
    while side > 1 && (side - 1).pow(3) >= count as u64 {
        side -= 1;
    }
    u32::try_from(side).unwrap_or(u32::MAX)
}
