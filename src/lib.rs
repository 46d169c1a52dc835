pub mod config;
pub mod ephemeris;
pub mod math;
pub mod orbit;
pub mod physics;
pub mod validation;

pub use config::SimulationConfig;
pub use math::{Body, Vector3};
pub use physics::{Integrator, PhysicsEngine};

use anyhow::Result;

#[derive(thiserror::Error, Debug)]
pub enum OrreryError {
    #[error("Physics simulation error: {0}")]
    Physics(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Orbit error: {0}")]
    Orbit(#[from] orbit::OrbitError),
    #[error("Config parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type OrreryResult<T> = Result<T, OrreryError>;
