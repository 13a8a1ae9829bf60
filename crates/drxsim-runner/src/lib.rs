//! Run orchestration for the DRX simulator.
//!
//! Loads a model, builds the two traffic sources and the [`Simulation`], and
//! drives it to the end of the run.
//!
//! ```rust,ignore
//! use drxsim_runner::{build_simulation, create_event_loop, load_model};
//!
//! let config = load_model("model.yaml")?;
//! let simulation = build_simulation(&config)?;
//! let stats = create_event_loop(simulation).run()?;
//! print!("{}", stats.report);
//! ```

use std::time::Instant;

use drxsim_common::{EventTracer, SimError};
use drxsim_lte::{Simulation, SimulationReport};
use drxsim_model::{ModelError, SimulationConfig};
use drxsim_traffic::TrafficError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub use drxsim_common::SimTime;
pub use drxsim_model::{load_model, load_model_from_str};

// ============================================================================
// Errors
// ============================================================================

/// Anything that can stop a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Traffic(#[from] TrafficError),

    #[error("simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("cannot encode report: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Command-Line Overrides
// ============================================================================

/// Run options given on the command line. Set fields replace the model's.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOverrides {
    pub length_s: Option<f64>,
    pub seed: Option<u64>,
    /// Only ever turns tracing on.
    pub verbose: bool,
}

impl RunOverrides {
    /// Apply the overrides and re-validate the result.
    pub fn apply(&self, config: &mut SimulationConfig) -> Result<(), RunError> {
        if let Some(length_s) = self.length_s {
            config.simulation.length_s = length_s;
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = seed;
        }
        config.simulation.verbose |= self.verbose;
        config.validate()?;
        Ok(())
    }
}

// ============================================================================
// Building
// ============================================================================

/// Build a simulation whose trace goes to stdout when the model is verbose.
pub fn build_simulation(config: &SimulationConfig) -> Result<Simulation, RunError> {
    build_simulation_with_tracer(config, EventTracer::from_verbose(config.simulation.verbose))
}

/// Build a simulation with an explicit trace destination.
pub fn build_simulation_with_tracer(
    config: &SimulationConfig,
    tracer: EventTracer,
) -> Result<Simulation, RunError> {
    let downlink = config.downlink_source()?;
    let uplink = config.uplink_source()?;
    info!(
        "Runner: {}s run, seed {}, downlink {}, uplink {}",
        config.simulation.length_s,
        config.simulation.seed,
        downlink.name(),
        uplink.name()
    );
    Ok(Simulation::new(config.clone(), downlink, uplink, tracer)?)
}

/// Wrap a built simulation for running.
pub fn create_event_loop(simulation: Simulation) -> EventLoop {
    EventLoop { simulation }
}

// ============================================================================
// Event Loop
// ============================================================================

/// Outcome of a complete run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Events dispatched, including the initial ones.
    pub total_events: u64,
    /// Time of the last dispatched event.
    pub simulation_time_s: f64,
    pub report: SimulationReport,
}

/// Drives a [`Simulation`] until its schedule is empty.
pub struct EventLoop {
    simulation: Simulation,
}

impl EventLoop {
    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn into_simulation(self) -> Simulation {
        self.simulation
    }

    /// Run to completion and collect the statistics.
    pub fn run(&mut self) -> Result<SimulationStats, RunError> {
        let started = Instant::now();
        let total_events = self.simulation.run()?;
        let elapsed = started.elapsed();

        let simulation_time_s = self.simulation.now().as_secs_f64();
        let events_per_sec = if elapsed.as_secs_f64() > 0.0 {
            total_events as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        info!(
            "Runner: {} events in {:.3}s wall time ({:.0} events/s)",
            total_events,
            elapsed.as_secs_f64(),
            events_per_sec
        );

        Ok(SimulationStats {
            total_events,
            simulation_time_s,
            report: self.simulation.report(),
        })
    }
}

/// Load, build and run in one call.
pub fn run_model(config: &SimulationConfig) -> Result<SimulationStats, RunError> {
    let simulation = build_simulation(config)?;
    create_event_loop(simulation).run()
}
