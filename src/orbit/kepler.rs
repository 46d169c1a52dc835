//! Keplerian elements to Cartesian state conversion.
use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::perifocal_basis;
use crate::math::{Body, GRAVITATIONAL_CONSTANT};

pub const MAX_ITERATIONS: u32 = 100;
pub const TOLERANCE: f64 = 1e-12;

/// Six classical orbital elements. Angles are in degrees, the semi-major axis in AU.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerianElements {
    /// Semi-major axis (AU)
    pub a: f64,
    /// Eccentricity, 0 <= e < 1
    pub e: f64,
    /// Inclination (degrees)
    pub i: f64,
    /// Longitude of the ascending node (degrees)
    pub omega_node: f64,
    /// Argument of periapsis (degrees)
    pub arg_periapsis: f64,
    /// Mean anomaly at epoch (degrees)
    pub mean_anomaly: f64,
}

impl KeplerianElements {
    pub const fn new(
        a: f64,
        e: f64,
        i: f64,
        omega_node: f64,
        arg_periapsis: f64,
        mean_anomaly: f64,
    ) -> Self {
        Self {
            a,
            e,
            i,
            omega_node,
            arg_periapsis,
            mean_anomaly,
        }
    }
}

/// Result of solving Kepler's equation.
///
/// `converged` is false when the iteration cap was hit before the Newton step dropped
/// below [`TOLERANCE`]; `eccentric_anomaly` then holds the best estimate reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeplerSolution {
    pub eccentric_anomaly: f64,
    pub iterations: u32,
    pub converged: bool,
}

pub struct KeplerianSolver;

impl KeplerianSolver {
    /// Solve M = E - e·sin(E) for the eccentric anomaly E with Newton-Raphson.
    ///
    /// Both anomalies are in radians. The initial guess is M for e < 0.8 and π otherwise.
    pub fn solve_kepler_equation(mean_anomaly: f64, eccentricity: f64) -> KeplerSolution {
        Self::solve_kepler_equation_within(mean_anomaly, eccentricity, MAX_ITERATIONS)
    }

    /// [`KeplerianSolver::solve_kepler_equation`] with an explicit iteration cap
    pub fn solve_kepler_equation_within(
        mean_anomaly: f64,
        eccentricity: f64,
        max_iterations: u32,
    ) -> KeplerSolution {
        let mut e_anomaly = if eccentricity < 0.8 {
            mean_anomaly
        } else {
            std::f64::consts::PI
        };

        for iteration in 1..=max_iterations {
            let f = e_anomaly - eccentricity * e_anomaly.sin() - mean_anomaly;
            let f_prime = 1.0 - eccentricity * e_anomaly.cos();
            let delta = -f / f_prime;
            e_anomaly += delta;

            if delta.abs() < TOLERANCE {
                return KeplerSolution {
                    eccentric_anomaly: e_anomaly,
                    iterations: iteration,
                    converged: true,
                };
            }
        }

        log::warn!(
            "Kepler equation did not converge after {max_iterations} iterations (M = {mean_anomaly}, e = {eccentricity})"
        );
        KeplerSolution {
            eccentric_anomaly: e_anomaly,
            iterations: max_iterations,
            converged: false,
        }
    }

    /// Convert an eccentric anomaly to the true anomaly (radians)
    pub fn eccentric_to_true_anomaly(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
        let (sin_e, cos_e) = eccentric_anomaly.sin_cos();
        let y = (1.0 - eccentricity * eccentricity).sqrt() * sin_e;
        let x = cos_e - eccentricity;
        y.atan2(x)
    }

    /// Position (AU) and velocity (AU/yr) relative to a central mass given in solar masses.
    pub fn keplerian_to_cartesian(elements: &KeplerianElements, central_mass: f64) -> (DVec3, DVec3) {
        let a = elements.a;
        let e = elements.e;

        let solution = Self::solve_kepler_equation(elements.mean_anomaly.to_radians(), e);
        let e_anomaly = solution.eccentric_anomaly;
        let nu = Self::eccentric_to_true_anomaly(e_anomaly, e);

        let r = a * (1.0 - e * e_anomaly.cos());
        let (sin_nu, cos_nu) = nu.sin_cos();

        let mu = GRAVITATIONAL_CONSTANT * central_mass;
        let h = (mu * a * (1.0 - e * e)).sqrt();

        let x_orb = r * cos_nu;
        let y_orb = r * sin_nu;
        let vx_orb = -(mu / h) * sin_nu;
        let vy_orb = (mu / h) * (e + cos_nu);

        let (p, q) = perifocal_basis(
            elements.i.to_radians(),
            elements.omega_node.to_radians(),
            elements.arg_periapsis.to_radians(),
        );

        (p * x_orb + q * y_orb, p * vx_orb + q * vy_orb)
    }

    /// Build a body on the given orbit around a central mass at the origin
    pub fn create_body_from_keplerian(
        name: impl Into<String>,
        mass: f64,
        radius: f64,
        elements: &KeplerianElements,
        central_mass: f64,
    ) -> Body {
        let (position, velocity) = Self::keplerian_to_cartesian(elements, central_mass);
        Body::new(name, mass, radius, position, velocity)
    }

    /// Orbital period in years from Kepler's third law
    pub fn orbital_period(semi_major_axis: f64, central_mass: f64) -> f64 {
        let mu = GRAVITATIONAL_CONSTANT * central_mass;
        2.0 * std::f64::consts::PI * (semi_major_axis.powi(3) / mu).sqrt()
    }
}
