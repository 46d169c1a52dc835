//! Gravitational N-body integration
pub mod engine;
pub mod octree;

pub use engine::*;
pub use octree::{OctreeNode, OctreePool};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stepping scheme used to advance the body collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Integrator {
    /// Symplectic kick-drift-kick with direct O(N²) forces
    #[default]
    Verlet,
    /// Classical 4th-order Runge-Kutta with direct forces
    Rk4,
    /// Kick-drift-kick with octree-approximated forces
    BarnesHut,
}

impl fmt::Display for Integrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Integrator::Verlet => "Velocity Verlet",
            Integrator::Rk4 => "RK4",
            Integrator::BarnesHut => "Barnes-Hut",
        };
        f.write_str(name)
    }
}
