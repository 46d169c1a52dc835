use anyhow::Result;
use orrery::ephemeris::{add_asteroid_belt, load_preset};
use orrery::{SimulationConfig, math, validation};
use std::env;

/// Timestep used for the one-year validation run
const VALIDATION_DT: f64 = 0.001;

fn main() -> Result<()> {
    env_logger::init();

    let config = match env::args().nth(1) {
        Some(path) => SimulationConfig::load(path)?,
        None => {
            log::info!("No configuration file given, using defaults");
            SimulationConfig::default()
        }
    };

    log::info!(
        "Preset: {}, integrator: {}, base dt: {:.6} yr, frames: {}",
        config.preset,
        config.integrator,
        config.base_timestep,
        config.frames
    );

    let mut bodies = load_preset(config.preset);
    add_asteroid_belt(&mut bodies, config.asteroids, config.seed);
    math::convert_to_barycentric(&mut bodies);
    let initial_state = bodies.clone();

    let mut engine = config.engine();
    engine.calculate_accelerations(&mut bodies);
    let initial = engine.diagnostics(&bodies);

    let frame_time = config.frame_time();
    let report_every = (config.frames / 10).max(1);
    let mut substeps = 0;

    for frame in 1..=config.frames {
        substeps += engine.advance_frame(
            config.integrator,
            &mut bodies,
            frame_time,
            config.base_timestep,
            config.adaptive,
        )?;

        if frame % report_every == 0 || frame == config.frames {
            let energy = engine.total_energy(&bodies);
            log::info!(
                "Frame {frame}: t = {:.4} yr, {} bodies, energy drift {:.3e}",
                frame as f64 * frame_time,
                bodies.len(),
                ((energy - initial.total_energy) / initial.total_energy).abs()
            );
        }
    }

    let last = engine.diagnostics(&bodies);
    println!(
        "{} finished: {} frames, {} sub-steps, {} bodies remaining",
        config.preset,
        config.frames,
        substeps,
        bodies.len()
    );
    println!(
        "Energy {:.9e} -> {:.9e}, momentum drift {:.3e}",
        initial.total_energy,
        last.total_energy,
        (last.momentum - initial.momentum).length()
    );

    if initial_state.iter().any(|b| b.name == "Earth") {
        let report = validation::validate_orbital_periods(
            initial_state,
            VALIDATION_DT,
            1.0,
            config.softening,
        )?;
        println!("{report}");
    }

    Ok(())
}
