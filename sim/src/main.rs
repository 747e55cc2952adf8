use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use cube_field::Clip;

mod audio;
mod config;
mod driver;

use config::SimConfig;
use driver::Simulation;

/// Headless cube field: spawns a grid in front of a fixed viewer and plays a keyword script
/// against it.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// JSON settings file; built-in defaults are used when omitted
    config: Option<PathBuf>,

    /// Override the simulated duration in seconds
    #[arg(short, long)]
    duration: Option<f32>,

    /// Print the effective settings as JSON and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match SimConfig::load(path) {
            Ok(config) => config,
            Err(err) => {
                log::error!("{err}");
                return ExitCode::FAILURE;
            }
        },
        None => SimConfig::default(),
    };
    if let Some(duration) = args.duration {
        config.duration_secs = duration;
    }
    if let Err(err) = config.validate() {
        log::error!("{err}");
        return ExitCode::FAILURE;
    }

    if args.print_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                log::error!("failed to serialize config: {err}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    log::info!(
        "simulating {:.1}s at {} fps, {} scripted keywords",
        config.duration_secs,
        config.frame_rate,
        config.script.len()
    );

    let mut sim = Simulation::new(&config);
    sim.run(config.duration());
    let summary = sim.summary();
    let (idle, launched, returning) = sim.phase_counts();

    log::info!(
        "done after {} frames ({:.2}s): {} keywords, {} grids, {} collisions, {} cues, {} returns",
        summary.frames,
        sim.elapsed().as_secs_f32(),
        summary.keywords,
        summary.grids_created,
        summary.collisions,
        summary.cues,
        summary.returned
    );
    let manager = sim.manager();
    let audio = manager.audio();
    log::info!(
        "cubes: {} total, {idle} idle, {launched} launched, {returning} returning",
        manager.field().len()
    );
    log::info!(
        "cues: {} total, {} bounce-together, {} bounce-other",
        audio.total(),
        audio.count(Clip::BounceTogether),
        audio.count(Clip::BounceOther)
    );

    let sunk = sim.sunk_cubes(config.floor_height);
    if sunk > 0 {
        log::warn!("{sunk} cubes ended up below the floor");
    }
    ExitCode::SUCCESS
}
