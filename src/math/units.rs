//! Physical constants and unit conversions for the simulation.
//! Distances are in AU, times in Julian years and masses in solar masses,
//! which reduces the gravitational constant to 4π².

/// Gravitational constant in AU³ M☉⁻¹ yr⁻²
pub const GRAVITATIONAL_CONSTANT: f64 = 4.0 * std::f64::consts::PI * std::f64::consts::PI;

/// Softening term added to squared distances (AU²) before any inverse-distance computation.
///
/// 1e-9 AU² corresponds to a length scale of about 3e-5 AU (roughly 4700 km), small enough
/// to keep the Moon's 0.00257 AU orbit Keplerian while capping forces at zero separation.
pub const SOFTENING_EPSILON: f64 = 1e-9;

/// Default Barnes-Hut opening angle
pub const DEFAULT_THETA: f64 = 0.5;

/// Days per Julian year
pub const DAYS_PER_YEAR: f64 = 365.25;

/// Default timestep of one day, in years
pub const DEFAULT_TIMESTEP: f64 = 1.0 / DAYS_PER_YEAR;

/// One Astronomical Unit in meters
pub const AU_TO_METERS: f64 = 1.495_978_707e11;

/// Earth mass in solar masses
pub const EARTH_MASS_SOLAR: f64 = 3.003_489_596_32e-6;

/// Conversion from kilometers to astronomical units
pub const fn km_to_au(km: f64) -> f64 {
    km * 1000.0 / AU_TO_METERS
}
