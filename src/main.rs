//! Flappy Autopilot headless runner
//!
//! Runs the fixed-timestep loop without a renderer and reports how the run went.

#[cfg(not(target_arch = "wasm32"))]
use std::path::PathBuf;
#[cfg(not(target_arch = "wasm32"))]
use std::process::ExitCode;

#[cfg(not(target_arch = "wasm32"))]
use clap::Parser;

#[cfg(not(target_arch = "wasm32"))]
use flappy_autopilot::consts::SIM_DT;
#[cfg(not(target_arch = "wasm32"))]
use flappy_autopilot::sim::{SimError, SimulationMode, SimulationState, TickInput, TickOutcome, tick};
#[cfg(not(target_arch = "wasm32"))]
use flappy_autopilot::{SettingsError, Tuning};

#[cfg(not(target_arch = "wasm32"))]
#[derive(Parser)]
#[command(name = "flappy-autopilot", about = "Headless flap simulation runner")]
struct Cli {
    /// Who flaps: manual or autopilot
    #[arg(long, default_value_t = SimulationMode::Autopilot)]
    mode: SimulationMode,

    /// Random seed for the pipe sequence
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Simulated duration in seconds
    #[arg(long, default_value_t = 60.0)]
    seconds: f64,

    /// JSON tuning file (defaults are used for missing fields)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Flap every N seconds in manual mode
    #[arg(long)]
    flap_every: Option<f64>,

    /// Print the final snapshot as JSON
    #[arg(long)]
    snapshot: bool,
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("failed to encode snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Embedders drive the simulation through the library
}

#[cfg(not(target_arch = "wasm32"))]
fn run(cli: &Cli) -> Result<(), RunError> {
    let tuning = match &cli.settings {
        Some(path) => Tuning::load(path)?,
        None => Tuning::default(),
    };

    let mut state = SimulationState::new(cli.seed, tuning, cli.mode)?;
    log::info!("Flappy Autopilot starting: mode={} seed={}", cli.mode, cli.seed);

    let total_ticks = (cli.seconds.max(0.0) / SIM_DT).round() as u64;
    let flap_interval = cli
        .flap_every
        .filter(|secs| *secs > 0.0)
        .map(|secs| ((secs / SIM_DT).round() as u64).max(1));

    let mut resets = 0u32;
    for n in 0..total_ticks {
        let input = TickInput {
            flap: flap_interval.is_some_and(|every| n % every == 0),
            ..Default::default()
        };
        if tick(&mut state, &input, SIM_DT)? == TickOutcome::Reset {
            resets += 1;
        }
    }

    log::info!(
        "Ran {} ticks ({:.2}s): score {}, best {}, resets {}",
        state.time_ticks,
        state.time_ticks as f64 * SIM_DT,
        state.score,
        state.best_score,
        resets
    );

    if cli.snapshot {
        println!("{}", serde_json::to_string_pretty(&state.snapshot())?);
    }
    Ok(())
}
