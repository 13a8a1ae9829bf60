//! Node models of the DRX simulator.
//!
//! - [`NodeCore`] - FIFO queueing, delay and arrival-rate statistics shared by
//!   both ends of the link
//! - [`BaseStation`] - downlink node and the DRX exit controller with its
//!   adaptive queue threshold
//! - [`Terminal`] - uplink node and the power-state machine
//! - [`Simulation`] - owns the [`SimContext`] and both nodes, and dispatches
//!   events to them
//!
//! ```rust,ignore
//! use drxsim_lte::Simulation;
//!
//! let mut sim = Simulation::new(config, downlink, uplink, EventTracer::disabled())?;
//! sim.run()?;
//! println!("{}", sim.report());
//! ```

mod context;
pub mod enb;
pub mod node;
mod report;
mod simulation;
pub mod ue;

pub use context::SimContext;
pub use enb::BaseStation;
pub use node::{NodeCore, NodeReport, QueuedPacket};
pub use report::{SimulationReport, StateTime};
pub use simulation::Simulation;
pub use ue::{Terminal, TerminalStatus};
