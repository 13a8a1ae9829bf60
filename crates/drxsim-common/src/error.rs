//! Simulation errors.

use crate::{EventKind, NodeRole, PacketId, SimTime};
use thiserror::Error;

/// Fatal conditions raised by the engine or the node models.
///
/// All of these indicate a broken invariant, so the run is aborted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// An event was scheduled before the current simulation time.
    #[error("event scheduled at {requested}s is earlier than the simulation clock ({current}s)")]
    NonCausalEvent { requested: SimTime, current: SimTime },

    /// A completed transmission does not match the head of the node's queue.
    #[error("{role}: transmission of packet {actual} does not match queue head {}", fmt_head(.expected))]
    FifoViolation {
        role: NodeRole,
        expected: Option<PacketId>,
        actual: PacketId,
    },

    /// An event was addressed to a node that cannot handle it.
    #[error("{role} cannot handle {kind}")]
    InvalidDispatch { role: NodeRole, kind: EventKind },
}

fn fmt_head(expected: &Option<PacketId>) -> String {
    match expected {
        Some(id) => id.to_string(),
        None => "(empty queue)".to_string(),
    }
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
