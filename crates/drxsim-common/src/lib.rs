//! Common types for the DRX simulator.
//!
//! This crate holds everything the simulation engine and the node models share:
//! - [`SimTime`] - nanosecond-resolution simulation instants
//! - [`Event`] / [`EventPayload`] - the closed set of simulation events
//! - [`EventQueue`] - the time-ordered pending-event schedule
//! - [`UeState`] / [`NodeRole`] - terminal power states and node roles
//! - [`SimError`] - fatal simulation errors
//! - [`tracer`] - the per-event verbose trace

pub mod error;
pub mod event;
pub mod queue;
pub mod state;
pub mod time;
pub mod tracer;

pub use error::{SimError, SimResult};
pub use event::{Event, EventKind, EventPayload, NodeRole, PacketId};
pub use queue::{EventQueue, ScheduleOutcome};
pub use state::UeState;
pub use time::SimTime;
pub use tracer::{EventTracer, TraceBuffer, TraceRecord};
