pub mod body;
pub mod units;

pub use body::*;
pub use units::*;

use glam::{DVec3, Vec3};

/// Double-precision 3D vector used for every physical quantity in the engine.
pub type Vector3 = DVec3;

/// Vector operations specific to the astronomical simulation
pub trait AstronomicalMath {
    /// Convert position from simulation units to single-precision rendering coordinates
    fn to_render_coords(&self) -> Vec3;

    /// Distance between two points in AU
    fn distance_to(&self, other: &Self) -> f64;

    /// Squared separation with the softening term added
    fn softened_distance_squared(&self, other: &Self, softening: f64) -> f64;
}

impl AstronomicalMath for DVec3 {
    fn to_render_coords(&self) -> Vec3 {
        Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    fn distance_to(&self, other: &Self) -> f64 {
        (*self - *other).length()
    }

    fn softened_distance_squared(&self, other: &Self, softening: f64) -> f64 {
        (*other - *self).length_squared() + softening
    }
}

/// Small numeric helpers shared by the physics and orbit modules
pub struct MathUtils;

impl MathUtils {
    /// Gravitational acceleration exerted by `mass` located at `offset` from the query point.
    ///
    /// `softening` is added to the squared distance before the inverse cube is taken,
    /// so the result stays finite at zero separation.
    #[inline]
    pub fn softened_acceleration(mass: f64, offset: DVec3, softening: f64) -> DVec3 {
        let dist_sq = offset.length_squared() + softening;
        let inv_dist = 1.0 / dist_sq.sqrt();
        offset * (GRAVITATIONAL_CONSTANT * mass * inv_dist * inv_dist * inv_dist)
    }

    /// `acos` with the argument clamped to [-1, 1]
    #[inline]
    pub fn safe_acos(x: f64) -> f64 {
        x.clamp(-1.0, 1.0).acos()
    }

    /// Wrap an angle in degrees into [0, 360)
    #[inline]
    pub fn wrap_degrees(angle: f64) -> f64 {
        let wrapped = angle % 360.0;
        if wrapped < 0.0 { wrapped + 360.0 } else { wrapped }
    }

    #[inline]
    pub fn sq(x: f64) -> f64 {
        x * x
    }

    #[inline]
    pub fn cb(x: f64) -> f64 {
        x * x * x
    }
}
