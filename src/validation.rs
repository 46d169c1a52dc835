//! Long-run accuracy checks: conservation drift and Earth's orbital period.
use glam::DVec3;
use std::fmt;

use crate::math::{self, AstronomicalMath, Body, DEFAULT_THETA};
use crate::orbit::OrbitCalculator;
use crate::physics::PhysicsEngine;
use crate::{OrreryError, OrreryResult};

/// Maximum relative energy drift for a passing run
pub const ENERGY_DRIFT_LIMIT: f64 = 5e-4;

/// Maximum absolute momentum drift (M☉·AU/yr) for a passing run
pub const MOMENTUM_DRIFT_LIMIT: f64 = 1e-8;

/// Maximum distance (AU) between Earth's start and end positions after whole years
pub const PERIOD_DISTANCE_LIMIT: f64 = 0.1;

/// Conservation quantities are sampled every this many steps
const SAMPLE_INTERVAL: usize = 100;

const QUICK_SAMPLE_INTERVAL: usize = 10;

const EARTH: &str = "Earth";

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub years: f64,
    pub steps: usize,
    pub max_energy_drift: f64,
    pub max_momentum_drift: f64,
    /// Distance between Earth's initial and final positions (AU)
    pub earth_period_error: f64,
    /// Earth's final osculating semi-major axis around the most massive other body (AU)
    pub earth_semi_major_axis: Option<f64>,
}

impl ValidationReport {
    pub fn energy_ok(&self) -> bool {
        self.max_energy_drift < ENERGY_DRIFT_LIMIT
    }

    pub fn momentum_ok(&self) -> bool {
        self.max_momentum_drift < MOMENTUM_DRIFT_LIMIT
    }

    pub fn period_ok(&self) -> bool {
        self.earth_period_error < PERIOD_DISTANCE_LIMIT
    }

    pub fn passed(&self) -> bool {
        self.energy_ok() && self.momentum_ok() && self.period_ok()
    }
}

fn verdict(ok: bool) -> &'static str {
    if ok { "PASS" } else { "FAIL" }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== VALIDATION REPORT ===")?;
        writeln!(f, "Results after {} year(s), {} steps:", self.years, self.steps)?;
        writeln!(
            f,
            "  Energy conservation:   {} (max drift: {:.6}%)",
            verdict(self.energy_ok()),
            self.max_energy_drift * 100.0
        )?;
        writeln!(
            f,
            "  Momentum conservation: {} (max drift: {:e})",
            verdict(self.momentum_ok()),
            self.max_momentum_drift
        )?;
        writeln!(
            f,
            "  Earth orbital period:  {} (distance from start: {:.6} AU)",
            verdict(self.period_ok()),
            self.earth_period_error
        )?;
        if let Some(a) = self.earth_semi_major_axis {
            writeln!(f, "  Earth semi-major axis: {a:.6} AU")?;
        }
        write!(
            f,
            "Overall: {}",
            if self.passed() { "PASSED" } else { "FAILED" }
        )
    }
}

fn relative_drift(current: f64, initial: f64) -> f64 {
    ((current - initial) / initial).abs()
}

fn earth_position(bodies: &[Body]) -> Option<DVec3> {
    bodies.iter().find(|b| b.name == EARTH).map(|b| b.position)
}

/// Semi-major axis of Earth around the heaviest other body, or its parent when tagged.
///
/// `None` when Earth is missing or has nothing to orbit. An unbound or degenerate orbit
/// is an error.
fn earth_semi_major_axis(bodies: &[Body]) -> OrreryResult<Option<f64>> {
    let Some(earth) = bodies.iter().find(|b| b.name == EARTH) else {
        return Ok(None);
    };
    let Some(primary) = bodies
        .iter()
        .filter(|b| b.name != EARTH)
        .max_by(|a, b| a.mass.total_cmp(&b.mass))
    else {
        return Ok(None);
    };

    match OrbitCalculator::elements_for(earth, bodies, primary) {
        Some(elements) => Ok(Some(elements.validate()?.semi_major_axis)),
        None => Ok(None),
    }
}

/// Integrate a copy of `bodies` with Verlet for `years` and measure conservation and
/// Earth's return to its starting point, using `softening` for forces and energies.
///
/// Bodies should already be barycentric. Fails when no body is named "Earth", or when
/// Earth ends the run on an unbound orbit.
pub fn validate_orbital_periods(
    mut bodies: Vec<Body>,
    dt: f64,
    years: f64,
    softening: f64,
) -> OrreryResult<ValidationReport> {
    if !(dt > 0.0 && dt.is_finite()) {
        return Err(OrreryError::Physics(format!(
            "validation timestep must be positive, got {dt}"
        )));
    }
    let earth_start = earth_position(&bodies)
        .ok_or_else(|| OrreryError::Physics("Earth not found in simulation".to_string()))?;

    let mut engine = PhysicsEngine::new(softening, DEFAULT_THETA);
    engine.calculate_accelerations(&mut bodies);

    let initial_energy = engine.total_energy(&bodies);
    let initial_momentum = math::total_momentum(&bodies);
    let mut max_energy_drift = 0.0_f64;
    let mut max_momentum_drift = 0.0_f64;

    let steps = (years / dt).round() as usize;
    for step in 0..steps {
        engine.step_verlet(&mut bodies, dt);

        if step % SAMPLE_INTERVAL == 0 {
            let energy = engine.total_energy(&bodies);
            max_energy_drift = max_energy_drift.max(relative_drift(energy, initial_energy));

            let momentum = math::total_momentum(&bodies);
            max_momentum_drift = max_momentum_drift.max((momentum - initial_momentum).length());
        }
    }

    // Earth may have merged into another body during the run
    let earth_end = earth_position(&bodies).ok_or_else(|| {
        OrreryError::Physics("Earth was absorbed in a collision during validation".to_string())
    })?;

    let report = ValidationReport {
        years,
        steps,
        max_energy_drift,
        max_momentum_drift,
        earth_period_error: earth_end.distance_to(&earth_start),
        earth_semi_major_axis: earth_semi_major_axis(&bodies)?,
    };

    if report.passed() {
        log::info!("Validation passed over {years} year(s)");
    } else {
        log::warn!("Validation failed over {years} year(s)\n{report}");
    }
    Ok(report)
}

/// Maximum relative energy drift over `steps` Verlet steps, sampled every 10 steps
pub fn quick_energy_check(mut bodies: Vec<Body>, steps: usize, dt: f64, softening: f64) -> f64 {
    let mut engine = PhysicsEngine::new(softening, DEFAULT_THETA);
    engine.calculate_accelerations(&mut bodies);

    let initial_energy = engine.total_energy(&bodies);
    let mut max_drift = 0.0_f64;

    for step in 0..steps {
        engine.step_verlet(&mut bodies, dt);
        if step % QUICK_SAMPLE_INTERVAL == 0 {
            max_drift = max_drift.max(relative_drift(engine.total_energy(&bodies), initial_energy));
        }
    }
    max_drift
}
