//! Simulation events.
//!
//! The event set is closed: every event is addressed to one of the two node
//! roles and carries one of four payloads. The engine dispatches on the
//! `(NodeRole, EventPayload)` pair with a plain `match`.

use crate::{SimTime, UeState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a packet, unique within one simulation run.
pub type PacketId = u64;

// ============================================================================
// Node Roles
// ============================================================================

/// The two nodes of the simulated link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeRole {
    /// The base station (eNB), source of downlink traffic.
    BaseStation,
    /// The terminal (UE), source of uplink traffic.
    Terminal,
}

impl NodeRole {
    /// Short tag used in traces, reports and metric labels.
    pub fn tag(self) -> &'static str {
        match self {
            NodeRole::BaseStation => "ENB",
            NodeRole::Terminal => "UE",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ============================================================================
// Event Payloads
// ============================================================================

/// Operation carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventPayload {
    /// A packet enters the node's queue.
    PacketArrival { packet_id: PacketId },
    /// The head packet of the node's queue finishes its one-subframe transmission.
    PacketTransmission { packet_id: PacketId },
    /// An arrival was refused because the queue was full.
    PacketDrop,
    /// The terminal enters `new_state`.
    StateTransition { new_state: UeState },
}

/// Payload discriminant without data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PacketArrival,
    PacketTransmission,
    PacketDrop,
    StateTransition,
}

impl EventKind {
    /// Name printed in the verbose trace.
    pub fn name(self) -> &'static str {
        match self {
            EventKind::PacketArrival => "PacketArrivalEvent",
            EventKind::PacketTransmission => "PacketTransmissionEvent",
            EventKind::PacketDrop => "PacketDropEvent",
            EventKind::StateTransition => "StateTransitionEvent",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl EventPayload {
    /// The payload's kind.
    pub fn kind(&self) -> EventKind {
        match self {
            EventPayload::PacketArrival { .. } => EventKind::PacketArrival,
            EventPayload::PacketTransmission { .. } => EventKind::PacketTransmission,
            EventPayload::PacketDrop => EventKind::PacketDrop,
            EventPayload::StateTransition { .. } => EventKind::StateTransition,
        }
    }

    /// Packet id carried by arrival and transmission payloads.
    pub fn packet_id(&self) -> Option<PacketId> {
        match self {
            EventPayload::PacketArrival { packet_id }
            | EventPayload::PacketTransmission { packet_id } => Some(*packet_id),
            _ => None,
        }
    }
}

// ============================================================================
// Event
// ============================================================================

/// A scheduled simulation event.
///
/// Two events are duplicates when time, target and payload are all equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Event {
    /// When the event fires.
    pub time: SimTime,
    /// The node that handles it.
    pub target: NodeRole,
    /// What happens.
    pub payload: EventPayload,
}

impl Event {
    pub fn new(time: SimTime, target: NodeRole, payload: EventPayload) -> Self {
        Event {
            time,
            target,
            payload,
        }
    }

    pub fn arrival(time: SimTime, target: NodeRole, packet_id: PacketId) -> Self {
        Event::new(time, target, EventPayload::PacketArrival { packet_id })
    }

    pub fn transmission(time: SimTime, target: NodeRole, packet_id: PacketId) -> Self {
        Event::new(time, target, EventPayload::PacketTransmission { packet_id })
    }

    pub fn packet_drop(time: SimTime, target: NodeRole) -> Self {
        Event::new(time, target, EventPayload::PacketDrop)
    }

    /// State transitions are always addressed to the terminal.
    pub fn state_transition(time: SimTime, new_state: UeState) -> Self {
        Event::new(
            time,
            NodeRole::Terminal,
            EventPayload::StateTransition { new_state },
        )
    }

    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// One-line human readable description, used in logs and error messages.
    pub fn describe(&self) -> String {
        match self.payload {
            EventPayload::PacketArrival { packet_id }
            | EventPayload::PacketTransmission { packet_id } => {
                format!("{} {} {} packet={}", self.time, self.target, self.kind(), packet_id)
            }
            EventPayload::PacketDrop => format!("{} {} {}", self.time, self.target, self.kind()),
            EventPayload::StateTransition { new_state } => {
                format!("{} {} {} {}", self.time, self.target, self.kind(), new_state)
            }
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_detection_uses_all_fields() {
        let t = SimTime::from_millis(5);
        let a = Event::arrival(t, NodeRole::BaseStation, 7);
        assert_eq!(a, Event::arrival(t, NodeRole::BaseStation, 7));
        assert_ne!(a, Event::arrival(t, NodeRole::Terminal, 7));
        assert_ne!(a, Event::arrival(t, NodeRole::BaseStation, 8));
        assert_ne!(a, Event::transmission(t, NodeRole::BaseStation, 7));
        assert_ne!(a, Event::arrival(SimTime::from_millis(6), NodeRole::BaseStation, 7));
    }

    #[test]
    fn test_state_transition_targets_terminal() {
        let e = Event::state_transition(SimTime::ZERO, UeState::Connected);
        assert_eq!(e.target, NodeRole::Terminal);
        assert_eq!(e.kind(), EventKind::StateTransition);
        assert_eq!(e.payload.packet_id(), None);
    }

    #[test]
    fn test_describe() {
        let e = Event::transmission(SimTime::from_millis(11), NodeRole::BaseStation, 0);
        assert_eq!(e.describe(), "0.011000000 ENB PacketTransmissionEvent packet=0");
        let s = Event::state_transition(SimTime::from_millis(1), UeState::ConnectedDrx);
        assert_eq!(s.describe(), "0.001000000 UE StateTransitionEvent CONNECTED_DRX");
    }
}
