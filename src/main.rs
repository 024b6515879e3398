//! Headless runner: load an image, run the engine, save the last frame.
//!
//! ```text
//! pixel-drift <input> <output.png> [frames] [params.json]
//! ```

use std::error::Error;
use std::process::ExitCode;

use pixel_drift::prelude::*;

const DEFAULT_FRAMES: u32 = 300;

fn run() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        return Err("usage: pixel-drift <input> <output.png> [frames] [params.json]".into());
    };
    let frames: u32 = match args.next() {
        Some(s) => s.parse()?,
        None => DEFAULT_FRAMES,
    };
    let params = match args.next() {
        Some(path) => Params::from_json(&std::fs::read_to_string(path)?)?,
        None => Params::default(),
    };

    let img = image::open(&input)?.to_rgba8();
    let mut sim = Simulation::new().with_params(params);
    sim.load_rgba_image(&img)?;
    log::info!("Running {} frames of {} field", frames, sim.params().flow_field_type);

    let mut clock = FrameClock::fixed(1.0 / 30.0);
    let mut last = None;
    for _ in 0..frames {
        if let Some(frame) = sim.tick(clock.update()) {
            last = Some(frame);
        }
    }

    let frame = last.ok_or("no frames rendered")?;
    frame.to_image().save(&output)?;
    println!("{}", sim.stats().to_json()?);
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pixel-drift: {}", e);
            ExitCode::FAILURE
        }
    }
}
