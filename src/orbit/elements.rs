//! State vectors to orbital elements, and sampled orbit curves for display.
use glam::DVec3;
use std::f64::consts::TAU;

use super::{OrbitError, perifocal_basis};
use crate::math::{Body, GRAVITATIONAL_CONSTANT, MathUtils};

/// Magnitudes below this are treated as zero when classifying orbits
const NEAR_ZERO: f64 = 1e-10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrbitStatus {
    Valid,
    /// Near-zero position, velocity or angular momentum
    #[default]
    Degenerate,
    /// Parabolic or hyperbolic
    Unbound,
}

/// Elements derived from an instantaneous state. Angles are in radians.
///
/// Only read the numeric fields when [`OrbitalElements::is_valid`] returns true.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrbitalElements {
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub longitude_asc_node: f64,
    pub arg_periapsis: f64,
    pub true_anomaly: f64,
    pub status: OrbitStatus,
}

impl OrbitalElements {
    fn invalid(status: OrbitStatus) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == OrbitStatus::Valid
    }

    pub fn validate(self) -> Result<Self, OrbitError> {
        match self.status {
            OrbitStatus::Valid => Ok(self),
            OrbitStatus::Degenerate => Err(OrbitError::Degenerate),
            OrbitStatus::Unbound => Err(OrbitError::Unbound),
        }
    }

    /// Semi-latus rectum p = a(1 - e²)
    pub fn semi_latus_rectum(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity * self.eccentricity)
    }
}

pub struct OrbitCalculator;

impl OrbitCalculator {
    /// Derive orbital elements from a position (AU) and velocity (AU/yr) relative
    /// to a central body with gravitational parameter `mu` (AU³/yr²).
    pub fn calculate_elements(pos: DVec3, vel: DVec3, mu: f64) -> OrbitalElements {
        let r = pos.length();
        let v = vel.length();
        if r < NEAR_ZERO || v < NEAR_ZERO {
            log::debug!("Rejecting orbit with near-zero state (r = {r:e}, v = {v:e})");
            return OrbitalElements::invalid(OrbitStatus::Degenerate);
        }

        let energy = 0.5 * v * v - mu / r;

        let h = pos.cross(vel);
        let h_mag = h.length();
        if h_mag < NEAR_ZERO {
            log::debug!("Rejecting radial orbit (|h| = {h_mag:e})");
            return OrbitalElements::invalid(OrbitStatus::Degenerate);
        }

        let e_vec = vel.cross(h) / mu - pos / r;
        let e = e_vec.length();
        if (e - 1.0).abs() < NEAR_ZERO || e > 1.0 {
            return OrbitalElements::invalid(OrbitStatus::Unbound);
        }

        let a = -mu / (2.0 * energy);
        if a <= 0.0 {
            return OrbitalElements::invalid(OrbitStatus::Unbound);
        }

        let inclination = MathUtils::safe_acos(h.z / h_mag);

        // Node vector n = k × h
        let n = DVec3::Z.cross(h);
        let n_mag = n.length();

        let mut longitude_asc_node = 0.0;
        if n_mag > NEAR_ZERO {
            longitude_asc_node = MathUtils::safe_acos(n.x / n_mag);
            if n.y < 0.0 {
                longitude_asc_node = TAU - longitude_asc_node;
            }
        }

        let mut arg_periapsis = 0.0;
        if n_mag > NEAR_ZERO && e > NEAR_ZERO {
            arg_periapsis = MathUtils::safe_acos(n.dot(e_vec) / (n_mag * e));
            if e_vec.z < 0.0 {
                arg_periapsis = TAU - arg_periapsis;
            }
        }

        let mut true_anomaly = 0.0;
        if e > NEAR_ZERO {
            true_anomaly = MathUtils::safe_acos(e_vec.dot(pos) / (e * r));
            if pos.dot(vel) < 0.0 {
                true_anomaly = TAU - true_anomaly;
            }
        }

        OrbitalElements {
            semi_major_axis: a,
            eccentricity: e,
            inclination,
            longitude_asc_node,
            arg_periapsis,
            true_anomaly,
            status: OrbitStatus::Valid,
        }
    }

    /// Elements of `body` around `central`, using the relative state and the combined mass
    pub fn elements_relative_to(body: &Body, central: &Body) -> OrbitalElements {
        let mu = GRAVITATIONAL_CONSTANT * (central.mass + body.mass);
        Self::calculate_elements(
            body.position - central.position,
            body.velocity - central.velocity,
            mu,
        )
    }

    /// Elements of `body` around its parent when it has one, otherwise around `primary`.
    ///
    /// Returns `None` when the body is the primary itself or names a parent that is not present.
    pub fn elements_for(body: &Body, bodies: &[Body], primary: &Body) -> Option<OrbitalElements> {
        let central = match &body.parent {
            Some(parent) => bodies.iter().find(|b| &b.name == parent)?,
            None => primary,
        };
        if std::ptr::eq(central, body) {
            return None;
        }
        Some(Self::elements_relative_to(body, central))
    }

    /// Sample `num_points + 1` points of the ellipse, uniformly in true anomaly over [0, 2π].
    ///
    /// Points are relative to the focus. Invalid or non-elliptical orbits give an empty path.
    pub fn generate_orbit_path(orbit: &OrbitalElements, num_points: usize) -> Vec<DVec3> {
        if !orbit.is_valid() || orbit.eccentricity >= 1.0 || num_points == 0 {
            return Vec::new();
        }

        let e = orbit.eccentricity;
        let p = orbit.semi_latus_rectum();
        let (p_axis, q_axis) = perifocal_basis(
            orbit.inclination,
            orbit.longitude_asc_node,
            orbit.arg_periapsis,
        );

        (0..=num_points)
            .map(|j| {
                let nu = TAU * j as f64 / num_points as f64;
                let (sin_nu, cos_nu) = nu.sin_cos();
                let r = p / (1.0 + e * cos_nu);
                p_axis * (r * cos_nu) + q_axis * (r * sin_nu)
            })
            .collect()
    }
}
