//! J2000 solar system data, scenario presets and the procedural asteroid belt.
use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;

use crate::math::{Body, DAYS_PER_YEAR, EARTH_MASS_SOLAR, GRAVITATIONAL_CONSTANT, km_to_au};
use crate::orbit::{KeplerianElements, KeplerianSolver};

const SUN_MASS: f64 = 1.0;
const SUN_RADIUS: f64 = km_to_au(695_700.0);

/// Inner and outer edge of the asteroid belt (AU)
const BELT_INNER_RADIUS: f64 = 2.2;
const BELT_OUTER_RADIUS: f64 = 3.2;
/// Half-thickness of the belt above and below the ecliptic (AU)
const BELT_HALF_THICKNESS: f64 = 0.1;
const ASTEROID_MASS: f64 = 1e-10;
const ASTEROID_RADIUS: f64 = 1e-4;

/// Static description of a catalogued body. Rotation is given in degrees per day.
#[derive(Debug, Clone, Copy)]
pub struct PlanetData {
    pub name: &'static str,
    pub mass: f64,
    pub radius: f64,
    pub rotation_speed: f64,
    pub axial_tilt: f64,
    pub elements: KeplerianElements,
}

impl PlanetData {
    /// Body on its J2000 heliocentric orbit around a Sun at the origin
    pub fn to_body(&self) -> Body {
        KeplerianSolver::create_body_from_keplerian(
            self.name,
            self.mass,
            self.radius,
            &self.elements,
            SUN_MASS,
        )
        .with_rotation(self.rotation_speed * DAYS_PER_YEAR, self.axial_tilt)
    }
}

/// Planets with J2000 mean elements, ordered by distance from the Sun
pub const PLANETS: [PlanetData; 8] = [
    PlanetData {
        name: "Mercury",
        mass: 1.6601e-7,
        radius: km_to_au(2_439.7),
        rotation_speed: 6.0,
        axial_tilt: 0.03,
        elements: KeplerianElements::new(0.38709927, 0.20563593, 7.00497902, 48.33076593, 77.45779628, 252.25032350),
    },
    PlanetData {
        name: "Venus",
        mass: 2.4478e-6,
        radius: km_to_au(6_051.8),
        rotation_speed: -1.4,
        axial_tilt: 177.3,
        elements: KeplerianElements::new(0.72333566, 0.00677672, 3.39467605, 76.67984255, 131.60246718, 181.97909950),
    },
    PlanetData {
        name: "Earth",
        mass: EARTH_MASS_SOLAR,
        radius: km_to_au(6_371.0),
        rotation_speed: 360.0,
        axial_tilt: 23.44,
        elements: KeplerianElements::new(1.00000261, 0.01671123, -0.00001531, 0.0, 102.93768193, 100.46457166),
    },
    PlanetData {
        name: "Mars",
        mass: 3.2271e-7,
        radius: km_to_au(3_389.5),
        rotation_speed: 350.0,
        axial_tilt: 25.19,
        elements: KeplerianElements::new(1.52371034, 0.09339410, 1.84969142, 49.55953891, 336.04084219, 355.45332854),
    },
    PlanetData {
        name: "Jupiter",
        mass: 9.5479e-4,
        radius: km_to_au(69_911.0),
        rotation_speed: 870.0,
        axial_tilt: 3.13,
        elements: KeplerianElements::new(5.20288700, 0.04838624, 1.30439695, 100.47390909, 14.72847983, 34.39644051),
    },
    PlanetData {
        name: "Saturn",
        mass: 2.8588e-4,
        radius: km_to_au(58_232.0),
        rotation_speed: 810.0,
        axial_tilt: 26.73,
        elements: KeplerianElements::new(9.53667594, 0.05386179, 2.48599187, 113.66242448, 92.59887831, 49.95424423),
    },
    PlanetData {
        name: "Uranus",
        mass: 4.3662e-5,
        radius: km_to_au(25_362.0),
        rotation_speed: -500.0,
        axial_tilt: 97.77,
        elements: KeplerianElements::new(19.18916464, 0.04725744, 0.77263783, 74.01692503, 170.95427630, 313.23810451),
    },
    PlanetData {
        name: "Neptune",
        mass: 5.1513e-5,
        radius: km_to_au(24_622.0),
        rotation_speed: 530.0,
        axial_tilt: 28.32,
        elements: KeplerianElements::new(30.06992276, 0.00859048, 1.77004347, 131.78422574, 44.96476227, 304.88003086),
    },
];

pub const DWARF_PLANETS: [PlanetData; 5] = [
    PlanetData {
        name: "Pluto",
        mass: 6.58e-9,
        radius: km_to_au(1_188.3),
        rotation_speed: -56.4,
        axial_tilt: 122.53,
        elements: KeplerianElements::new(39.48211675, 0.24882730, 17.14001206, 110.30393684, 224.06891629, 238.92903833),
    },
    PlanetData {
        name: "Ceres",
        mass: 4.7e-10,
        radius: km_to_au(469.7),
        rotation_speed: 952.0,
        axial_tilt: 4.0,
        elements: KeplerianElements::new(2.7658, 0.0760, 10.59, 80.33, 73.60, 27.19),
    },
    PlanetData {
        name: "Eris",
        mass: 8.27e-9,
        radius: km_to_au(1_163.0),
        rotation_speed: 14.0,
        axial_tilt: 78.0,
        elements: KeplerianElements::new(67.67, 0.4417, 44.04, 35.95, 151.43, 204.16),
    },
    PlanetData {
        name: "Makemake",
        mass: 1.5e-9,
        radius: km_to_au(715.0),
        rotation_speed: 38.0,
        axial_tilt: 0.0,
        elements: KeplerianElements::new(45.79, 0.159, 29.0, 79.3, 298.0, 139.0),
    },
    PlanetData {
        name: "Haumea",
        mass: 2.0e-9,
        radius: km_to_au(500.0),
        rotation_speed: 929.0,
        axial_tilt: 0.0,
        elements: KeplerianElements::new(43.13, 0.195, 28.2, 122.1, 239.5, 205.0),
    },
];

/// The Moon, with elements relative to Earth
pub const MOON: PlanetData = PlanetData {
    name: "Moon",
    mass: 3.694e-8,
    radius: km_to_au(1_737.4),
    rotation_speed: 13.2,
    axial_tilt: 6.68,
    elements: KeplerianElements::new(0.00257, 0.0549, 5.145, 125.08, 318.15, 135.27),
};

fn sun() -> Body {
    Body::new("Sun", SUN_MASS, SUN_RADIUS, DVec3::ZERO, DVec3::ZERO)
        .with_rotation(13.0 * DAYS_PER_YEAR, 7.25)
}

/// Seed the Moon on its orbit around `earth`, tagged with Earth as parent
fn moon_around(earth: &Body) -> Body {
    let (rel_pos, rel_vel) =
        KeplerianSolver::keplerian_to_cartesian(&MOON.elements, earth.mass + MOON.mass);
    Body::new(
        MOON.name,
        MOON.mass,
        MOON.radius,
        earth.position + rel_pos,
        earth.velocity + rel_vel,
    )
    .with_rotation(MOON.rotation_speed * DAYS_PER_YEAR, MOON.axial_tilt)
    .with_parent(earth.name.clone())
}

/// Sun, eight planets, the Moon and five dwarf planets at the J2000 epoch.
///
/// Positions are heliocentric; convert to barycentric before integrating.
pub fn load_solar_system_j2000() -> Vec<Body> {
    let mut system = Vec::with_capacity(1 + PLANETS.len() + 1 + DWARF_PLANETS.len());
    system.push(sun());
    system.extend(PLANETS.iter().map(PlanetData::to_body));

    if let Some(earth) = system.iter().find(|b| b.name == "Earth") {
        let moon = moon_around(earth);
        system.push(moon);
    }

    system.extend(DWARF_PLANETS.iter().map(PlanetData::to_body));
    log::debug!("Loaded {} bodies from J2000 ephemeris", system.len());
    system
}

/// Predefined starting scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Preset {
    #[default]
    FullSolarSystem,
    InnerPlanets,
    OuterGiants,
    EarthMoonSystem,
    BinaryStarTest,
}

impl Preset {
    pub fn display_name(&self) -> &'static str {
        match self {
            Preset::FullSolarSystem => "Full Solar System",
            Preset::InnerPlanets => "Inner Planets",
            Preset::OuterGiants => "Outer Giants",
            Preset::EarthMoonSystem => "Earth-Moon System",
            Preset::BinaryStarTest => "Binary Star Test",
        }
    }

    /// Names of the catalogued bodies kept alongside the Sun
    fn members(&self) -> &'static [&'static str] {
        match self {
            Preset::InnerPlanets => &["Mercury", "Venus", "Earth", "Mars", "Moon"],
            Preset::OuterGiants => &["Jupiter", "Saturn", "Uranus", "Neptune"],
            Preset::EarthMoonSystem => &["Earth", "Moon"],
            Preset::FullSolarSystem | Preset::BinaryStarTest => &[],
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Build the bodies for a preset, heliocentric and unprimed
pub fn load_preset(preset: Preset) -> Vec<Body> {
    let bodies = match preset {
        Preset::FullSolarSystem => load_solar_system_j2000(),
        Preset::BinaryStarTest => binary_stars(0.5, 1.0),
        Preset::InnerPlanets | Preset::OuterGiants | Preset::EarthMoonSystem => {
            let members = preset.members();
            let mut system = vec![sun()];
            system.extend(
                load_solar_system_j2000()
                    .into_iter()
                    .filter(|b| members.contains(&b.name.as_str())),
            );
            system
        }
    };

    log::info!("Loaded preset '{}' with {} bodies", preset, bodies.len());
    bodies
}

/// Two equal stars `separation` AU apart on a mutual circular orbit about their barycenter
fn binary_stars(star_mass: f64, separation: f64) -> Vec<Body> {
    // Each star circles at r = d/2 under G·m / d², so v² = G·m / (2d)
    let speed = (GRAVITATIONAL_CONSTANT * star_mass / (2.0 * separation)).sqrt();
    let half = 0.5 * separation;

    vec![
        Body::new(
            "Star A",
            star_mass,
            0.004,
            DVec3::new(-half, 0.0, 0.0),
            DVec3::new(0.0, -speed, 0.0),
        )
        .with_rotation(15.0 * DAYS_PER_YEAR, 0.0),
        Body::new(
            "Star B",
            star_mass,
            0.004,
            DVec3::new(half, 0.0, 0.0),
            DVec3::new(0.0, speed, 0.0),
        )
        .with_rotation(15.0 * DAYS_PER_YEAR, 0.0),
    ]
}

/// Append `count` asteroids on circular heliocentric orbits between 2.2 and 3.2 AU.
///
/// The same `seed` always produces the same belt.
pub fn add_asteroid_belt(bodies: &mut Vec<Body>, count: usize, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    bodies.reserve(count);

    for i in 0..count {
        let distance = rng.random_range(BELT_INNER_RADIUS..BELT_OUTER_RADIUS);
        let angle = rng.random_range(0.0..TAU);
        let height = rng.random_range(-BELT_HALF_THICKNESS..BELT_HALF_THICKNESS);
        let speed = (GRAVITATIONAL_CONSTANT * SUN_MASS / distance).sqrt();
        let (sin_a, cos_a) = angle.sin_cos();

        bodies.push(Body::new(
            format!("Asteroid {}", i + 1),
            ASTEROID_MASS,
            ASTEROID_RADIUS,
            DVec3::new(distance * cos_a, distance * sin_a, height),
            DVec3::new(-speed * sin_a, speed * cos_a, 0.0),
        ));
    }

    if count > 0 {
        log::info!("Added {count} asteroids (seed {seed})");
    }
}
