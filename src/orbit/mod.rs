//! Keplerian orbital mechanics: elements to state vectors for seeding bodies,
//! and state vectors back to elements for drawing orbit curves.

pub mod elements;
pub mod kepler;

pub use elements::*;
pub use kepler::*;

use glam::DVec3;

/// Why a state vector could not be turned into a drawable ellipse
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitError {
    #[error("degenerate state: position, velocity or angular momentum is near zero")]
    Degenerate,
    #[error("orbit is not bound (parabolic or hyperbolic)")]
    Unbound,
}

/// Unit vectors P (towards periapsis) and Q (90° ahead in the orbital plane)
/// of the perifocal frame, expressed in inertial coordinates.
///
/// This is the 3-1-3 rotation R_z(Ω)·R_x(i)·R_z(ω) applied to the perifocal X and Y axes.
/// All angles are in radians.
pub fn perifocal_basis(inclination: f64, ascending_node: f64, arg_periapsis: f64) -> (DVec3, DVec3) {
    let (sin_o, cos_o) = ascending_node.sin_cos();
    let (sin_i, cos_i) = inclination.sin_cos();
    let (sin_w, cos_w) = arg_periapsis.sin_cos();

    let p = DVec3::new(
        cos_o * cos_w - sin_o * sin_w * cos_i,
        sin_o * cos_w + cos_o * sin_w * cos_i,
        sin_w * sin_i,
    );
    let q = DVec3::new(
        -cos_o * sin_w - sin_o * cos_w * cos_i,
        -sin_o * sin_w + cos_o * cos_w * cos_i,
        cos_w * sin_i,
    );
    (p, q)
}
