//! Force accumulation, time stepping, collisions and diagnostics.
//!
//! Every stepping call transforms the body collection by one timestep and runs to
//! completion. Scratch buffers (octree pool, RK4 stages, collision marks) belong to the
//! engine instance and are reused across calls, so an engine must not be shared between
//! threads stepping different collections at once.
use glam::DVec3;

use super::{Integrator, OctreePool};
use crate::math::{
    self, AstronomicalMath, Body, DEFAULT_THETA, GRAVITATIONAL_CONSTANT, MathUtils,
    SOFTENING_EPSILON,
};
use crate::{OrreryError, OrreryResult};

/// Scale factor between the closest separation (AU) and the adaptive timestep (years)
const ADAPTIVE_SAFETY: f64 = 0.01;

/// Lower bound of the adaptive timestep as a fraction of the base timestep
const ADAPTIVE_MIN_FRACTION: f64 = 0.01;

const ROUNDING_FRACTION: f64 = 1e-9;

/// Per-stage state for the RK4 integrator, sized on demand
#[derive(Debug, Default)]
struct Rk4Scratch {
    positions: Vec<DVec3>,
    velocities: Vec<DVec3>,
    masses: Vec<f64>,
    trial_positions: Vec<DVec3>,
    k_vel: [Vec<DVec3>; 4],
    k_acc: [Vec<DVec3>; 4],
}

impl Rk4Scratch {
    fn load(&mut self, bodies: &[Body]) {
        let n = bodies.len();
        self.positions.clear();
        self.velocities.clear();
        self.masses.clear();
        self.positions.extend(bodies.iter().map(|b| b.position));
        self.velocities.extend(bodies.iter().map(|b| b.velocity));
        self.masses.extend(bodies.iter().map(|b| b.mass));
        self.trial_positions.resize(n, DVec3::ZERO);
        for stage in self.k_vel.iter_mut().chain(self.k_acc.iter_mut()) {
            stage.resize(n, DVec3::ZERO);
        }
    }

    /// Evaluate stage `stage` from the previous stage's derivatives scaled by `h`
    fn evaluate_stage(&mut self, stage: usize, h: f64, softening: f64) {
        for i in 0..self.positions.len() {
            let (dp, dv) = match stage.checked_sub(1) {
                Some(prev) => (self.k_vel[prev][i] * h, self.k_acc[prev][i] * h),
                None => (DVec3::ZERO, DVec3::ZERO),
            };
            self.trial_positions[i] = self.positions[i] + dp;
            self.k_vel[stage][i] = self.velocities[i] + dv;
        }

        pairwise_accelerations(
            &self.trial_positions,
            &self.masses,
            &mut self.k_acc[stage],
            softening,
        );
    }
}

/// Kinetic, potential and total energy plus total momentum of a body set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    pub kinetic_energy: f64,
    pub potential_energy: f64,
    pub total_energy: f64,
    pub momentum: DVec3,
}

/// N-body integrator holding its reusable scratch state
#[derive(Debug)]
pub struct PhysicsEngine {
    softening: f64,
    theta: f64,
    octree: OctreePool,
    rk4: Rk4Scratch,
    absorbed: Vec<bool>,
}

impl Default for PhysicsEngine {
    fn default() -> Self {
        Self::new(SOFTENING_EPSILON, DEFAULT_THETA)
    }
}

impl PhysicsEngine {
    pub fn new(softening: f64, theta: f64) -> Self {
        Self {
            softening,
            theta,
            octree: OctreePool::new(),
            rk4: Rk4Scratch::default(),
            absorbed: Vec::new(),
        }
    }

    pub fn softening(&self) -> f64 {
        self.softening
    }

    /// Opening angle used by [`PhysicsEngine::step`] for Barnes-Hut
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Overwrite every body's acceleration with the direct pairwise sum.
    ///
    /// Each unordered pair is visited once and Newton's third law is applied symmetrically.
    pub fn calculate_accelerations(&self, bodies: &mut [Body]) {
        for body in bodies.iter_mut() {
            body.reset_acceleration();
        }

        for i in 0..bodies.len() {
            let (head, tail) = bodies.split_at_mut(i + 1);
            let bi = &mut head[i];
            let mut acc_i = DVec3::ZERO;

            for bj in tail.iter_mut() {
                let r = bj.position - bi.position;
                let dist_sq = bi.position.softened_distance_squared(&bj.position, self.softening);
                let inv_dist = 1.0 / dist_sq.sqrt();
                let f = r * (GRAVITATIONAL_CONSTANT * inv_dist * inv_dist * inv_dist);

                acc_i += f * bj.mass;
                bj.acceleration -= f * bi.mass;
            }

            bi.acceleration += acc_i;
        }
    }

    /// Velocity Verlet: half kick, drift, collisions, new accelerations, half kick.
    ///
    /// Expects `acceleration` to be current on entry, e.g. from a prior
    /// [`PhysicsEngine::calculate_accelerations`] call.
    pub fn step_verlet(&mut self, bodies: &mut Vec<Body>, dt: f64) {
        let half_dt = 0.5 * dt;
        for body in bodies.iter_mut() {
            body.update_velocity(half_dt);
            body.update_position(dt);
        }

        self.handle_collisions(bodies);
        self.calculate_accelerations(bodies);

        for body in bodies.iter_mut() {
            body.update_velocity(half_dt);
        }
    }

    /// Classical RK4 on the coupled position/velocity system with weights (1, 2, 2, 1) / 6.
    pub fn step_rk4(&mut self, bodies: &mut Vec<Body>, dt: f64) {
        if bodies.is_empty() {
            return;
        }

        let softening = self.softening;
        let scratch = &mut self.rk4;
        scratch.load(bodies);
        scratch.evaluate_stage(0, 0.0, softening);
        scratch.evaluate_stage(1, 0.5 * dt, softening);
        scratch.evaluate_stage(2, 0.5 * dt, softening);
        scratch.evaluate_stage(3, dt, softening);

        let weight = dt / 6.0;
        let [kv1, kv2, kv3, kv4] = &scratch.k_vel;
        let [ka1, ka2, ka3, ka4] = &scratch.k_acc;
        for (i, body) in bodies.iter_mut().enumerate() {
            body.position += (kv1[i] + kv2[i] * 2.0 + kv3[i] * 2.0 + kv4[i]) * weight;
            body.velocity += (ka1[i] + ka2[i] * 2.0 + ka3[i] * 2.0 + ka4[i]) * weight;
            body.update_rotation(dt);
            body.trail.update_position(body.position);
        }

        self.handle_collisions(bodies);
        self.calculate_accelerations(bodies);
    }

    /// Kick-drift-kick like [`PhysicsEngine::step_verlet`], with accelerations from an
    /// octree rebuilt at the drifted positions.
    pub fn step_barnes_hut(&mut self, bodies: &mut Vec<Body>, dt: f64, theta: f64) {
        let half_dt = 0.5 * dt;
        for body in bodies.iter_mut() {
            body.update_velocity(half_dt);
            body.update_position(dt);
        }

        self.handle_collisions(bodies);
        self.calculate_tree_accelerations(bodies, theta);

        for body in bodies.iter_mut() {
            body.update_velocity(half_dt);
        }
    }

    /// Rebuild the octree from current positions and set every acceleration from it
    pub fn calculate_tree_accelerations(&mut self, bodies: &mut [Body], theta: f64) {
        if self.octree.build(bodies).is_none() {
            return;
        }
        for index in 0..bodies.len() {
            let acceleration = self
                .octree
                .acceleration_on(index, bodies, theta, self.softening);
            bodies[index].acceleration = acceleration;
        }
    }

    /// Fill accelerations the way `integrator` will read them on its next step
    pub fn prime(&mut self, integrator: Integrator, bodies: &mut [Body]) {
        match integrator {
            Integrator::BarnesHut => self.calculate_tree_accelerations(bodies, self.theta),
            Integrator::Verlet | Integrator::Rk4 => self.calculate_accelerations(bodies),
        }
    }

    /// Advance one step with the chosen integrator
    pub fn step(&mut self, integrator: Integrator, bodies: &mut Vec<Body>, dt: f64) {
        match integrator {
            Integrator::Verlet => self.step_verlet(bodies, dt),
            Integrator::Rk4 => self.step_rk4(bodies, dt),
            Integrator::BarnesHut => self.step_barnes_hut(bodies, dt, self.theta),
        }
    }

    /// Advance by `frame_time` years in sub-steps of at most `base_dt`, shrinking them
    /// during close encounters when `adaptive` is set. The final sub-step is truncated
    /// to land on `frame_time`. Returns the number of sub-steps taken.
    ///
    /// Bodies whose accelerations are all zero are treated as unprimed and get forces
    /// computed before the first Verlet or Barnes-Hut half-kick.
    pub fn advance_frame(
        &mut self,
        integrator: Integrator,
        bodies: &mut Vec<Body>,
        frame_time: f64,
        base_dt: f64,
        adaptive: bool,
    ) -> OrreryResult<usize> {
        if !(base_dt > 0.0 && base_dt.is_finite()) {
            return Err(OrreryError::Physics(format!(
                "base timestep must be positive and finite, got {base_dt}"
            )));
        }
        if !(frame_time >= 0.0 && frame_time.is_finite()) {
            return Err(OrreryError::Physics(format!(
                "frame time must be non-negative and finite, got {frame_time}"
            )));
        }

        if integrator != Integrator::Rk4 && bodies.iter().all(|b| b.acceleration == DVec3::ZERO) {
            self.prime(integrator, bodies);
        }

        // Remainders this far below the smallest sub-step are accumulated rounding
        let tolerance = base_dt * ROUNDING_FRACTION;
        let mut elapsed = 0.0;
        let mut substeps = 0;
        while frame_time - elapsed > tolerance {
            let dt = if adaptive {
                get_adaptive_timestep(bodies, base_dt)
            } else {
                base_dt
            };
            let dt = dt.min(frame_time - elapsed);

            self.step(integrator, bodies, dt);
            elapsed += dt;
            substeps += 1;
        }

        log::trace!("Advanced {frame_time} yr in {substeps} sub-steps with {integrator}");
        Ok(substeps)
    }

    /// Merge every overlapping pair into one body, conserving mass and momentum.
    ///
    /// The lower-index body of a pair absorbs the other and keeps being tested against
    /// the remaining bodies. Absorbed bodies are dropped in a single pass at the end.
    /// Returns the number of merges.
    pub fn handle_collisions(&mut self, bodies: &mut Vec<Body>) -> usize {
        let n = bodies.len();
        self.absorbed.clear();
        self.absorbed.resize(n, false);

        let mut merges = 0;
        for i in 0..n {
            if self.absorbed[i] {
                continue;
            }
            for j in (i + 1)..n {
                if self.absorbed[j] {
                    continue;
                }

                let (head, tail) = bodies.split_at_mut(j);
                let survivor = &mut head[i];
                let other = &tail[0];
                let radius_sum = survivor.radius + other.radius;
                if (other.position - survivor.position).length_squared() < MathUtils::sq(radius_sum) {
                    log::info!("Collision: {} absorbed {}", survivor.name, other.name);
                    merge_into(survivor, other);
                    self.absorbed[j] = true;
                    merges += 1;
                }
            }
        }

        if merges > 0 {
            let absorbed = &self.absorbed;
            let mut index = 0;
            bodies.retain(|_| {
                let keep = !absorbed[index];
                index += 1;
                keep
            });
        }
        merges
    }

    /// Total mechanical energy using this engine's softening
    pub fn total_energy(&self, bodies: &[Body]) -> f64 {
        calculate_total_energy(bodies, self.softening)
    }

    pub fn diagnostics(&self, bodies: &[Body]) -> Diagnostics {
        let kinetic_energy: f64 = bodies.iter().map(Body::kinetic_energy).sum();
        let potential_energy = potential_energy(bodies, self.softening);
        Diagnostics {
            kinetic_energy,
            potential_energy,
            total_energy: kinetic_energy + potential_energy,
            momentum: math::total_momentum(bodies),
        }
    }
}

/// Fold `other` into `survivor`: masses add, position and velocity become mass-weighted
/// means, and the radius is that of a sphere holding both volumes.
fn merge_into(survivor: &mut Body, other: &Body) {
    let (m1, m2) = (survivor.mass, other.mass);
    let mass = m1 + m2;

    survivor.name = format!("{}-{}", survivor.name, other.name);
    survivor.position = (survivor.position * m1 + other.position * m2) / mass;
    survivor.velocity = (survivor.velocity * m1 + other.velocity * m2) / mass;
    survivor.acceleration = (survivor.acceleration * m1 + other.acceleration * m2) / mass;
    survivor.radius = (MathUtils::cb(survivor.radius) + MathUtils::cb(other.radius)).cbrt();
    survivor.mass = mass;
}

/// Direct pairwise accelerations for bare position and mass arrays
fn pairwise_accelerations(positions: &[DVec3], masses: &[f64], out: &mut [DVec3], softening: f64) {
    out.fill(DVec3::ZERO);
    let n = positions.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let r = positions[j] - positions[i];
            let dist_sq = r.length_squared() + softening;
            let inv_dist3 = 1.0 / (dist_sq * dist_sq.sqrt());
            let f = r * (GRAVITATIONAL_CONSTANT * inv_dist3);
            out[i] += f * masses[j];
            out[j] -= f * masses[i];
        }
    }
}

/// Recommended timestep: `0.01·sqrt(min separation²)` clamped to `[base_dt / 100, base_dt]`.
///
/// Fewer than two bodies, or a non-positive `base_dt`, yields `base_dt` unchanged.
pub fn get_adaptive_timestep(bodies: &[Body], base_dt: f64) -> f64 {
    if !(base_dt > 0.0) {
        return base_dt;
    }

    let mut min_dist_sq = f64::INFINITY;
    for (i, a) in bodies.iter().enumerate() {
        for b in &bodies[i + 1..] {
            min_dist_sq = min_dist_sq.min((b.position - a.position).length_squared());
        }
    }

    (ADAPTIVE_SAFETY * min_dist_sq.sqrt()).clamp(base_dt * ADAPTIVE_MIN_FRACTION, base_dt)
}

fn potential_energy(bodies: &[Body], softening: f64) -> f64 {
    let mut potential = 0.0;
    for (i, a) in bodies.iter().enumerate() {
        for b in &bodies[i + 1..] {
            let distance = a.position.distance_to(&b.position) + softening;
            potential -= GRAVITATIONAL_CONSTANT * a.mass * b.mass / distance;
        }
    }
    potential
}

/// Kinetic plus pairwise potential energy. Diagnostic only; never fed back into stepping.
pub fn calculate_total_energy(bodies: &[Body], softening: f64) -> f64 {
    let kinetic: f64 = bodies.iter().map(Body::kinetic_energy).sum();
    kinetic + potential_energy(bodies, softening)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    fn sun_earth() -> Vec<Body> {
        vec![
            Body::new("Sun", 1.0, 0.00465, DVec3::ZERO, DVec3::ZERO),
            Body::new("Earth", 3e-6, 4.26e-5, DVec3::X, DVec3::new(0.0, TAU, 0.0)),
        ]
    }

    fn triangle() -> Vec<Body> {
        vec![
            Body::new("a", 1.0, 0.0, DVec3::new(1.0, 0.0, 0.0), DVec3::ZERO),
            Body::new("b", 2.0, 0.0, DVec3::new(-1.0, 1.0, 0.0), DVec3::ZERO),
            Body::new("c", 0.5, 0.0, DVec3::new(0.0, -2.0, 1.0), DVec3::ZERO),
        ]
    }

    #[test]
    fn test_accelerations_obey_third_law() {
        let engine = PhysicsEngine::default();
        let mut bodies = triangle();
        engine.calculate_accelerations(&mut bodies);

        let net_force: DVec3 = bodies.iter().map(|b| b.acceleration * b.mass).sum();
        assert!(net_force.length() < 1e-12);
    }

    #[test]
    fn test_accelerations_overwrite_previous_values() {
        let engine = PhysicsEngine::default();
        let mut bodies = sun_earth();
        bodies[1].acceleration = DVec3::splat(100.0);
        engine.calculate_accelerations(&mut bodies);

        // Earth feels G·M☉ / 1 AU² toward the Sun
        assert!((bodies[1].acceleration.x + GRAVITATIONAL_CONSTANT).abs() < 1e-6);
        assert!(bodies[1].acceleration.y.abs() < 1e-12);
    }

    #[test]
    fn test_rk4_scratch_matches_direct_sum() {
        let engine = PhysicsEngine::default();
        let mut bodies = triangle();
        engine.calculate_accelerations(&mut bodies);

        let positions: Vec<DVec3> = bodies.iter().map(|b| b.position).collect();
        let masses: Vec<f64> = bodies.iter().map(|b| b.mass).collect();
        let mut out = vec![DVec3::ONE; 3];
        pairwise_accelerations(&positions, &masses, &mut out, SOFTENING_EPSILON);

        for (body, acc) in bodies.iter().zip(&out) {
            assert!((body.acceleration - *acc).length() < 1e-12);
        }
    }

    #[test]
    fn test_rk4_circular_orbit_is_accurate() {
        let mut engine = PhysicsEngine::default();
        let mut bodies = sun_earth();
        engine.calculate_accelerations(&mut bodies);

        let initial_energy = engine.total_energy(&bodies);
        for _ in 0..1000 {
            engine.step_rk4(&mut bodies, 0.001);
        }
        let drift = ((engine.total_energy(&bodies) - initial_energy) / initial_energy).abs();
        assert!(drift < 1e-6, "energy drift {drift}");

        let radius = (bodies[1].position - bodies[0].position).length();
        assert!((radius - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_collision_merge_conserves_mass_and_momentum() {
        let mut engine = PhysicsEngine::default();
        let mut bodies = vec![
            Body::new("a", 1.0, 0.1, DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0)),
            Body::new("b", 3.0, 0.1, DVec3::new(0.15, 0.0, 0.0), DVec3::new(0.0, 2.0, 0.0)),
            Body::new("c", 1.0, 0.1, DVec3::new(5.0, 0.0, 0.0), DVec3::ZERO),
        ];
        let mass_before = math::total_mass(&bodies);
        let momentum_before = math::total_momentum(&bodies);

        let merges = engine.handle_collisions(&mut bodies);

        assert_eq!(merges, 1);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].name, "a-b");
        assert_eq!(bodies[1].name, "c");
        assert!((math::total_mass(&bodies) - mass_before).abs() < 1e-12);
        assert!((math::total_momentum(&bodies) - momentum_before).length() < 1e-12);
        assert!((bodies[0].radius - 0.002_f64.cbrt()).abs() < 1e-12);
        assert!((bodies[0].position.x - 0.1125).abs() < 1e-12);
    }

    #[test]
    fn test_chain_collision_absorbs_all() {
        let mut engine = PhysicsEngine::default();
        let mut bodies: Vec<Body> = (0..4)
            .map(|i| Body::new(format!("p{i}"), 1.0, 0.2, DVec3::new(i as f64 * 0.1, 0.0, 0.0), DVec3::ZERO))
            .collect();

        let merges = engine.handle_collisions(&mut bodies);
        assert_eq!(merges, 3);
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0].mass, 4.0);
    }

    #[test]
    fn test_adaptive_timestep_bounds() {
        let base_dt = 0.01;
        let mut bodies = sun_earth();
        assert_eq!(get_adaptive_timestep(&bodies, base_dt), base_dt);

        bodies[1].position = DVec3::new(1e-12, 0.0, 0.0);
        assert_eq!(get_adaptive_timestep(&bodies, base_dt), base_dt * 0.01);

        bodies[1].position = DVec3::new(1e6, 0.0, 0.0);
        assert_eq!(get_adaptive_timestep(&bodies, base_dt), base_dt);

        // 0.5 AU asks for 0.005 yr: inside [0.001, 0.1], below the floor of [0.01, 1]
        bodies[1].position = DVec3::new(0.5, 0.0, 0.0);
        let dt = get_adaptive_timestep(&bodies, 0.1);
        assert!((dt - 0.005).abs() < 1e-15);
        assert_eq!(get_adaptive_timestep(&bodies, 1.0), 0.01);

        assert_eq!(get_adaptive_timestep(&bodies[..1], base_dt), base_dt);
    }

    #[test]
    fn test_total_energy_of_circular_orbit() {
        let bodies = sun_earth();
        let energy = calculate_total_energy(&bodies, 0.0);
        let expected = 0.5 * 3e-6 * TAU * TAU - GRAVITATIONAL_CONSTANT * 3e-6;
        assert!((energy - expected).abs() < 1e-15);
    }

    #[test]
    fn test_diagnostics_sum() {
        let engine = PhysicsEngine::default();
        let bodies = sun_earth();
        let d = engine.diagnostics(&bodies);

        assert!((d.kinetic_energy + d.potential_energy - d.total_energy).abs() < 1e-18);
        assert!((d.total_energy - engine.total_energy(&bodies)).abs() < 1e-18);
        assert!((d.momentum.y - 3e-6 * TAU).abs() < 1e-18);
    }

    #[test]
    fn test_advance_frame_lands_on_frame_time() {
        let mut engine = PhysicsEngine::default();
        let mut bodies = sun_earth();
        engine.calculate_accelerations(&mut bodies);

        let substeps = engine
            .advance_frame(Integrator::Verlet, &mut bodies, 0.0105, 0.001, false)
            .unwrap();
        assert_eq!(substeps, 11);

        // A 1 AU separation asks for 0.01 yr, so the base timestep caps each sub-step
        let substeps = engine
            .advance_frame(Integrator::Verlet, &mut bodies, 0.01, 0.001, true)
            .unwrap();
        assert_eq!(substeps, 10);

        // Close pair is held to the minimum of base_dt / 100
        let mut close = vec![
            Body::new("a", 1e-9, 0.0, DVec3::ZERO, DVec3::ZERO),
            Body::new("b", 1e-9, 0.0, DVec3::new(1e-6, 0.0, 0.0), DVec3::ZERO),
        ];
        engine.calculate_accelerations(&mut close);
        let substeps = engine
            .advance_frame(Integrator::Verlet, &mut close, 0.001, 0.001, true)
            .unwrap();
        assert_eq!(substeps, 100);
    }

    #[test]
    fn test_advance_frame_primes_zero_accelerations() {
        for integrator in [Integrator::Verlet, Integrator::BarnesHut] {
            let mut primed_engine = PhysicsEngine::default();
            let mut primed = sun_earth();
            primed_engine.prime(integrator, &mut primed);
            primed_engine
                .advance_frame(integrator, &mut primed, 0.01, 0.001, false)
                .unwrap();

            let mut engine = PhysicsEngine::default();
            let mut unprimed = sun_earth();
            engine
                .advance_frame(integrator, &mut unprimed, 0.01, 0.001, false)
                .unwrap();

            for (a, b) in primed.iter().zip(&unprimed) {
                assert_eq!(a.position, b.position, "{integrator}");
                assert_eq!(a.velocity, b.velocity, "{integrator}");
            }
        }
    }

    #[test]
    fn test_advance_frame_rejects_bad_timestep() {
        let mut engine = PhysicsEngine::default();
        let mut bodies = sun_earth();
        assert!(engine.advance_frame(Integrator::Rk4, &mut bodies, 0.1, 0.0, true).is_err());
        assert!(engine.advance_frame(Integrator::Rk4, &mut bodies, -1.0, 0.1, true).is_err());
    }

    #[test]
    fn test_barnes_hut_step_matches_verlet_for_two_bodies() {
        let mut verlet = PhysicsEngine::default();
        let mut tree = PhysicsEngine::default();
        let mut a = sun_earth();
        verlet.calculate_accelerations(&mut a);
        let mut b = a.clone();

        for _ in 0..100 {
            verlet.step_verlet(&mut a, 0.001);
            tree.step_barnes_hut(&mut b, 0.001, 0.5);
        }

        for (x, y) in a.iter().zip(&b) {
            assert!((x.position - y.position).length() < 1e-9);
            assert!((x.velocity - y.velocity).length() < 1e-9);
        }
    }
}
