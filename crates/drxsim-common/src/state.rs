//! Terminal power states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Power state of the terminal (UE).
///
/// Variant order is the order used by the end-of-run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UeState {
    /// Radio switched off.
    Disconnected,
    /// Idle-mode sleep between paging occasions.
    IdleDrx,
    /// Idle-mode paging occasion.
    IdleListening,
    /// Connection setup in progress.
    Connecting,
    /// Connected, no transfer in progress.
    Connected,
    /// Connected, uplink transfer.
    ConnectedTx,
    /// Connected, downlink transfer.
    ConnectedRx,
    /// Connected, uplink and downlink transfer.
    ConnectedTxRx,
    /// Connected-mode DRX sleep.
    ConnectedDrx,
}

impl UeState {
    /// Every state, in report order.
    pub const ALL: [UeState; 9] = [
        UeState::Disconnected,
        UeState::IdleDrx,
        UeState::IdleListening,
        UeState::Connecting,
        UeState::Connected,
        UeState::ConnectedTx,
        UeState::ConnectedRx,
        UeState::ConnectedTxRx,
        UeState::ConnectedDrx,
    ];

    /// Position of this state in [`UeState::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical upper-case name, as printed in traces and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            UeState::Disconnected => "DISCONNECTED",
            UeState::IdleDrx => "IDLE_DRX",
            UeState::IdleListening => "IDLE_LISTENING",
            UeState::Connecting => "CONNECTING",
            UeState::Connected => "CONNECTED",
            UeState::ConnectedTx => "CONNECTED_TX",
            UeState::ConnectedRx => "CONNECTED_RX",
            UeState::ConnectedTxRx => "CONNECTED_TX_RX",
            UeState::ConnectedDrx => "CONNECTED_DRX",
        }
    }

    /// True for the three active-transfer micro-states.
    pub fn is_transferring(self) -> bool {
        matches!(
            self,
            UeState::ConnectedTx | UeState::ConnectedRx | UeState::ConnectedTxRx
        )
    }
}

impl fmt::Display for UeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_all_order() {
        for (i, state) in UeState::ALL.iter().enumerate() {
            assert_eq!(state.index(), i);
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(UeState::ConnectedTxRx.to_string(), "CONNECTED_TX_RX");
        assert_eq!(UeState::IdleListening.to_string(), "IDLE_LISTENING");
    }

    #[test]
    fn test_serde_name_matches_display() {
        for state in UeState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state));
        }
    }
}
