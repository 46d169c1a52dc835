//! Physics body representation for the N-body simulation
use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use std::collections::VecDeque;

use super::{AstronomicalMath, MathUtils};

/// Maximum number of points kept in a body's trail
pub const MAX_TRAIL_POINTS: usize = 500;

/// Bounded history of recent positions, read by the rendering layer to draw trails.
#[derive(Debug, Clone, PartialEq)]
pub struct Trail {
    /// Ring buffer of positions in AU, oldest first
    positions: VecDeque<DVec3>,

    max_points: usize,

    /// Minimum distance a body must travel before a new point is recorded
    segment_length: f64,
}

impl Trail {
    pub fn new(max_points: usize, segment_length: f64) -> Self {
        Self {
            positions: VecDeque::with_capacity(max_points.min(MAX_TRAIL_POINTS)),
            max_points,
            segment_length,
        }
    }

    /// Record a position if the body has moved at least `segment_length` since the last point
    pub fn update_position(&mut self, position: DVec3) {
        let moved_enough = match self.positions.back() {
            Some(last) => (position - *last).length() >= self.segment_length,
            None => true,
        };
        if !moved_enough {
            return;
        }

        self.positions.push_back(position);
        while self.positions.len() > self.max_points {
            self.positions.pop_front();
        }
    }

    pub fn points(&self) -> impl ExactSizeIterator<Item = &DVec3> {
        self.positions.iter()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

}

impl Default for Trail {
    fn default() -> Self {
        Self::new(MAX_TRAIL_POINTS, 0.0)
    }
}

/// A celestial body in the simulation.
///
/// Units: mass in solar masses, lengths in AU, time in years. Mass must be strictly
/// positive; the integrators divide by it without checking.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Display identifier, not required to be unique
    pub name: String,

    /// Mass in solar masses
    pub mass: f64,

    /// Radius in AU, used for collisions and rendering
    pub radius: f64,

    /// Position in AU
    pub position: DVec3,

    /// Velocity in AU per year
    pub velocity: DVec3,

    /// Acceleration in AU per year squared
    pub acceleration: DVec3,

    /// Rotation angle in degrees, kept in [0, 360)
    pub rotation_angle: f64,

    /// Rotation speed in degrees per year
    pub rotation_speed: f64,

    /// Axial tilt in degrees
    pub axial_tilt: f64,

    /// Name of the body this one orbits, for satellites
    pub parent: Option<String>,

    pub trail: Trail,
}

impl Body {
    pub fn new(
        name: impl Into<String>,
        mass: f64,
        radius: f64,
        position: DVec3,
        velocity: DVec3,
    ) -> Self {
        Self {
            name: name.into(),
            mass,
            radius,
            position,
            velocity,
            acceleration: DVec3::ZERO,
            rotation_angle: 0.0,
            rotation_speed: 0.0,
            axial_tilt: 0.0,
            parent: None,
            trail: Trail::default(),
        }
    }

    pub fn with_rotation(mut self, rotation_speed: f64, axial_tilt: f64) -> Self {
        self.rotation_speed = rotation_speed;
        self.axial_tilt = axial_tilt;
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn reset_acceleration(&mut self) {
        self.acceleration = DVec3::ZERO;
    }

    pub fn update_rotation(&mut self, dt: f64) {
        self.rotation_angle = MathUtils::wrap_degrees(self.rotation_angle + self.rotation_speed * dt);
    }

    /// Drift the position by a full step, advancing rotation and recording the trail
    pub fn update_position(&mut self, dt: f64) {
        self.position += self.velocity * dt;
        self.update_rotation(dt);
        self.trail.update_position(self.position);
    }

    /// Kick the velocity using the stored acceleration
    pub fn update_velocity(&mut self, dt: f64) {
        self.velocity += self.acceleration * dt;
    }

    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.length_squared()
    }

    pub fn momentum(&self) -> DVec3 {
        self.velocity * self.mass
    }
}

/// Reduced precision body data for rendering
/// Uses f32 for GPU compatibility and smaller memory footprint
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RenderBody {
    pub position: [f32; 3],
    pub radius: f32,
    pub velocity: [f32; 3],
    pub mass: f32,
    pub rotation_angle: f32,
    pub axial_tilt: f32,
    pub _padding: [f32; 2],
}

impl From<&Body> for RenderBody {
    fn from(body: &Body) -> Self {
        Self {
            position: body.position.to_render_coords().to_array(),
            radius: body.radius as f32,
            velocity: body.velocity.to_render_coords().to_array(),
            mass: body.mass as f32,
            rotation_angle: body.rotation_angle as f32,
            axial_tilt: body.axial_tilt as f32,
            _padding: [0.0; 2],
        }
    }
}

/// Snapshot every body for upload to a renderer
pub fn render_snapshot(bodies: &[Body]) -> Vec<RenderBody> {
    bodies.iter().map(RenderBody::from).collect()
}

pub fn total_mass(bodies: &[Body]) -> f64 {
    bodies.iter().map(|b| b.mass).sum()
}

pub fn total_momentum(bodies: &[Body]) -> DVec3 {
    bodies.iter().map(Body::momentum).sum()
}

/// Mass-weighted mean position, or the origin for an empty set
pub fn center_of_mass(bodies: &[Body]) -> DVec3 {
    let mass = total_mass(bodies);
    if mass <= 0.0 {
        return DVec3::ZERO;
    }
    bodies.iter().map(|b| b.position * b.mass).sum::<DVec3>() / mass
}

/// Shift the system into its barycentric frame: zero total momentum, centre of mass at the origin.
pub fn convert_to_barycentric(bodies: &mut [Body]) {
    let mass = total_mass(bodies);
    if bodies.is_empty() || mass <= 0.0 {
        return;
    }

    let v_cm = total_momentum(bodies) / mass;
    let r_cm = center_of_mass(bodies);
    for body in bodies.iter_mut() {
        body.velocity -= v_cm;
        body.position -= r_cm;
    }
    log::debug!(
        "Converted {} bodies to barycentric frame (v_cm = {:.3e} AU/yr)",
        bodies.len(),
        v_cm.length()
    );
}
