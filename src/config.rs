//! Simulation run settings, read from RON.
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ephemeris::Preset;
use crate::math::{DEFAULT_THETA, DEFAULT_TIMESTEP, SOFTENING_EPSILON};
use crate::physics::{Integrator, PhysicsEngine};
use crate::{OrreryError, OrreryResult};

/// Settings for a headless run. Missing fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub preset: Preset,
    pub integrator: Integrator,
    /// Largest sub-step in years
    pub base_timestep: f64,
    /// Barnes-Hut opening angle
    pub theta: f64,
    /// Added to squared separations in AU²
    pub softening: f64,
    /// Shrink sub-steps during close encounters
    pub adaptive: bool,
    /// Frame duration as a multiple of the base timestep
    pub time_rate: f64,
    pub frames: usize,
    pub asteroids: usize,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            preset: Preset::default(),
            integrator: Integrator::default(),
            base_timestep: DEFAULT_TIMESTEP,
            theta: DEFAULT_THETA,
            softening: SOFTENING_EPSILON,
            adaptive: true,
            time_rate: 1.0,
            frames: 365,
            asteroids: 0,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    pub fn from_ron_str(source: &str) -> OrreryResult<Self> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> OrreryResult<Self> {
        let path = path.as_ref();
        log::info!("Loading configuration from {}", path.display());
        let source = std::fs::read_to_string(path)?;
        Self::from_ron_str(&source)
    }

    pub fn to_ron_string(&self) -> OrreryResult<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| OrreryError::Config(e.to_string()))
    }

    pub fn validate(&self) -> OrreryResult<()> {
        if !(self.base_timestep > 0.0 && self.base_timestep.is_finite()) {
            return Err(OrreryError::Config(format!(
                "base_timestep must be positive, got {}",
                self.base_timestep
            )));
        }
        if !(self.theta > 0.0) {
            return Err(OrreryError::Config(format!(
                "theta must be positive, got {}",
                self.theta
            )));
        }
        if !(self.softening >= 0.0) {
            return Err(OrreryError::Config(format!(
                "softening must not be negative, got {}",
                self.softening
            )));
        }
        if !(self.time_rate > 0.0 && self.time_rate.is_finite()) {
            return Err(OrreryError::Config(format!(
                "time_rate must be positive, got {}",
                self.time_rate
            )));
        }
        Ok(())
    }

    /// Simulated years advanced per frame
    pub fn frame_time(&self) -> f64 {
        self.base_timestep * self.time_rate
    }

    pub fn engine(&self) -> PhysicsEngine {
        PhysicsEngine::new(self.softening, self.theta)
    }
}
