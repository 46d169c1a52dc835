use glam::DVec3;
use orrery::ephemeris::{Preset, add_asteroid_belt, load_preset};
use orrery::orbit::OrbitCalculator;
use orrery::physics::{PhysicsEngine, calculate_total_energy, get_adaptive_timestep};
use orrery::{Body, Integrator, SimulationConfig, math};
use std::f64::consts::TAU;

fn barycentric(preset: Preset) -> Vec<Body> {
    let mut bodies = load_preset(preset);
    math::convert_to_barycentric(&mut bodies);
    bodies
}

fn relative_drift(current: f64, initial: f64) -> f64 {
    ((current - initial) / initial).abs()
}

#[test]
fn verlet_conserves_energy_for_inner_planets() {
    let mut engine = PhysicsEngine::default();
    let mut bodies = barycentric(Preset::InnerPlanets);
    engine.calculate_accelerations(&mut bodies);

    let initial = engine.total_energy(&bodies);
    for _ in 0..1000 {
        engine.step_verlet(&mut bodies, 0.001);
    }

    let drift = relative_drift(engine.total_energy(&bodies), initial);
    assert!(drift < 1e-3, "energy drift {drift}");
    assert_eq!(bodies.len(), 6);
}

#[test]
fn rk4_conserves_energy_for_inner_planets() {
    let mut engine = PhysicsEngine::default();
    let mut bodies = barycentric(Preset::InnerPlanets);
    let initial = engine.total_energy(&bodies);

    for _ in 0..1000 {
        engine.step_rk4(&mut bodies, 0.001);
    }

    let drift = relative_drift(engine.total_energy(&bodies), initial);
    assert!(drift < 1e-5, "energy drift {drift}");
}

#[test]
fn barnes_hut_matches_direct_sum_at_small_theta() {
    let mut bodies = load_preset(Preset::FullSolarSystem);
    add_asteroid_belt(&mut bodies, 300, 11);

    let mut engine = PhysicsEngine::default();
    engine.calculate_accelerations(&mut bodies);
    let direct: Vec<DVec3> = bodies.iter().map(|b| b.acceleration).collect();

    engine.calculate_tree_accelerations(&mut bodies, 0.1);
    for (body, exact) in bodies.iter().zip(&direct) {
        let error = (body.acceleration - *exact).length() / exact.length();
        assert!(error < 0.01, "{}: relative error {error}", body.name);
    }
}

#[test]
fn barnes_hut_tracks_verlet_over_a_year() {
    let mut direct = barycentric(Preset::OuterGiants);
    let mut engine = PhysicsEngine::default();
    engine.calculate_accelerations(&mut direct);
    let mut tree = direct.clone();

    for _ in 0..365 {
        engine.step_verlet(&mut direct, 1.0 / 365.25);
        engine.step_barnes_hut(&mut tree, 1.0 / 365.25, 0.5);
    }

    for (a, b) in direct.iter().zip(&tree) {
        let separation = (a.position - b.position).length();
        assert!(separation < 1e-3, "{} diverged by {separation} AU", a.name);
    }
}

#[test]
fn adaptive_timestep_stays_in_bounds() {
    let base_dt = 1.0 / 365.25;
    let mut bodies = load_preset(Preset::FullSolarSystem);
    add_asteroid_belt(&mut bodies, 100, 3);

    let dt = get_adaptive_timestep(&bodies, base_dt);
    assert!(dt >= base_dt / 100.0 && dt <= base_dt);

    // The Earth-Moon separation is under 0.0027 AU, which pins the step to its floor
    assert!((dt - base_dt / 100.0).abs() < 1e-15);

    let distant = vec![
        Body::new("a", 1.0, 0.0, DVec3::ZERO, DVec3::ZERO),
        Body::new("b", 1.0, 0.0, DVec3::new(0.2, 0.0, 0.0), DVec3::ZERO),
    ];
    let dt = get_adaptive_timestep(&distant, base_dt);
    assert!((dt - 0.002).abs() < 1e-15);
}

#[test]
fn head_on_collision_merges_into_one_body() {
    let mut engine = PhysicsEngine::default();
    let mut bodies = vec![
        Body::new("A", 0.5, 0.02, DVec3::new(-0.05, 0.0, 0.0), DVec3::ZERO),
        Body::new("B", 0.5, 0.02, DVec3::new(0.05, 0.0, 0.0), DVec3::ZERO),
    ];
    engine.calculate_accelerations(&mut bodies);
    let initial_momentum = math::total_momentum(&bodies);

    let mut steps = 0;
    while bodies.len() > 1 && steps < 1000 {
        engine.step_verlet(&mut bodies, 0.001);
        steps += 1;
    }

    assert_eq!(bodies.len(), 1, "no merge after {steps} steps");
    assert_eq!(bodies[0].name, "A-B");
    assert_eq!(bodies[0].mass, 1.0);
    assert!((math::total_momentum(&bodies) - initial_momentum).length() < 1e-9);
    assert!((bodies[0].radius - (2.0 * 0.02_f64.powi(3)).cbrt()).abs() < 1e-12);
}

#[test]
fn collisions_conserve_mass_and_momentum_under_each_integrator() {
    for integrator in [Integrator::Verlet, Integrator::Rk4, Integrator::BarnesHut] {
        let mut engine = PhysicsEngine::default();
        let mut bodies = vec![
            Body::new("a", 0.3, 0.05, DVec3::new(-0.2, 0.01, 0.0), DVec3::new(2.0, 0.0, 0.0)),
            Body::new("b", 0.2, 0.05, DVec3::new(0.2, -0.01, 0.0), DVec3::new(-2.0, 0.5, 0.0)),
        ];
        engine.calculate_accelerations(&mut bodies);
        let mass = math::total_mass(&bodies);
        let momentum = math::total_momentum(&bodies);

        for _ in 0..200 {
            engine.step(integrator, &mut bodies, 0.0005);
        }

        assert_eq!(bodies.len(), 1, "{integrator}: no merge");
        assert!((math::total_mass(&bodies) - mass).abs() < 1e-12);
        assert!(
            (math::total_momentum(&bodies) - momentum).length() < 1e-6,
            "{integrator}: momentum drift"
        );
    }
}

#[test]
fn earth_returns_after_one_year() {
    let mut engine = PhysicsEngine::default();
    let mut bodies = vec![
        Body::new("Sun", 1.0, 0.00465, DVec3::ZERO, DVec3::ZERO),
        Body::new("Earth", 3e-6, 4.26e-5, DVec3::X, DVec3::new(0.0, TAU, 0.0)),
    ];
    engine.calculate_accelerations(&mut bodies);
    let start = bodies[1].position;

    for _ in 0..1000 {
        engine.step_verlet(&mut bodies, 0.001);
    }

    assert!((bodies[1].position - start).length() < 0.1);
}

#[test]
fn barycentric_conversion_zeroes_momentum() {
    let bodies = barycentric(Preset::FullSolarSystem);
    assert!(math::total_momentum(&bodies).length() < 1e-15);
    assert!(math::center_of_mass(&bodies).length() < 1e-12);
}

#[test]
fn moon_keeps_orbiting_earth() {
    let mut engine = PhysicsEngine::default();
    let mut bodies = barycentric(Preset::EarthMoonSystem);
    engine.calculate_accelerations(&mut bodies);

    engine
        .advance_frame(Integrator::Verlet, &mut bodies, 0.25, 0.001, true)
        .unwrap();

    let earth = bodies.iter().find(|b| b.name == "Earth").unwrap();
    let moon = bodies.iter().find(|b| b.name == "Moon").unwrap();
    let orbit = OrbitCalculator::elements_relative_to(moon, earth);
    assert!(orbit.is_valid());
    assert!((orbit.semi_major_axis - 0.00257).abs() < 2e-4);
}

#[test]
fn configured_run_stays_finite() {
    let config = SimulationConfig::from_ron_str(
        "(preset: FullSolarSystem, integrator: BarnesHut, asteroids: 50, frames: 30)",
    )
    .unwrap();

    let mut bodies = load_preset(config.preset);
    add_asteroid_belt(&mut bodies, config.asteroids, config.seed);
    math::convert_to_barycentric(&mut bodies);

    let mut engine = config.engine();
    engine.calculate_accelerations(&mut bodies);
    let initial = calculate_total_energy(&bodies, config.softening);

    for _ in 0..config.frames {
        let substeps = engine
            .advance_frame(
                config.integrator,
                &mut bodies,
                config.frame_time(),
                config.base_timestep,
                config.adaptive,
            )
            .unwrap();
        assert!(substeps >= 1);
    }

    assert_eq!(bodies.len(), 65);
    assert!(bodies.iter().all(|b| b.position.is_finite() && b.velocity.is_finite()));
    let drift = relative_drift(calculate_total_energy(&bodies, config.softening), initial);
    assert!(drift < 1e-2, "energy drift {drift}");
}
