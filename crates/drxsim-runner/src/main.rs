//! DRX simulator CLI
//!
//! ```bash
//! # Stock parameters, 10 s, seed 1
//! drxsim
//!
//! # Legacy configuration file, 60 s, per-event trace on stdout
//! drxsim -f lte.cfg -l 60 -v
//!
//! # YAML model, machine-readable report
//! drxsim -f model.yaml -s 7 --json
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use drxsim_model::SimulationConfig;
use drxsim_runner::{build_simulation, create_event_loop, load_model, RunError, RunOverrides};
use tracing_subscriber::EnvFilter;

/// Discrete-event simulator of LTE discontinuous reception between one base
/// station and one terminal.
#[derive(Parser, Debug)]
#[command(name = "drxsim")]
#[command(version, about, long_about = None)]
struct Args {
    /// Simulation length in seconds
    #[arg(short = 'l', long = "length")]
    length: Option<f64>,

    /// Seed of the traffic generators
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Model file, YAML (.yaml/.yml) or legacy line format
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// Print one line per handled event
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print the final report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)),
        )
        .init();

    drxsim_metrics::describe_metrics();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), RunError> {
    let mut config = match &args.file {
        Some(path) => load_model(path)?,
        None => SimulationConfig::default(),
    };
    RunOverrides {
        length_s: args.length,
        seed: args.seed,
        verbose: args.verbose,
    }
    .apply(&mut config)?;

    let simulation = build_simulation(&config)?;
    let stats = create_event_loop(simulation).run()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", stats.report);
    }
    Ok(())
}
