//! End-of-run report.

use crate::node::NodeReport;
use drxsim_common::UeState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cumulative time the terminal spent in one state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTime {
    pub state: UeState,
    pub seconds: f64,
    /// Share of the run length.
    pub percent: f64,
}

/// Everything printed at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    /// Run length in seconds.
    pub length_s: f64,
    pub enb: NodeReport,
    /// Time-weighted average queue threshold, adaptive mode only.
    pub enb_average_threshold: Option<f64>,
    pub ue: NodeReport,
    /// One entry per state, in [`UeState::ALL`] order.
    pub ue_states: Vec<StateTime>,
}

impl SimulationReport {
    /// Seconds spent in `state`.
    pub fn seconds_in(&self, state: UeState) -> f64 {
        self.ue_states
            .iter()
            .find(|s| s.state == state)
            .map_or(0.0, |s| s.seconds)
    }

    /// Sum of the per-state times; equals the run length.
    pub fn total_state_time(&self) -> f64 {
        self.ue_states.iter().map(|s| s.seconds).sum()
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.enb)?;
        if let Some(threshold) = self.enb_average_threshold {
            writeln!(f, "ENB average DRX queue threshold: {:.9}", threshold)?;
        }
        writeln!(f, "{}", self.ue)?;
        for entry in &self.ue_states {
            writeln!(
                f,
                "UE time in state {}: {:.9} {:.2} %",
                entry.state, entry.seconds, entry.percent
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(tag: &str, sent: u64) -> NodeReport {
        NodeReport {
            node: tag.to_string(),
            received: sent,
            sent,
            dropped: 0,
            queued: 0,
            average_delay_s: (sent > 0).then_some(0.0),
            max_delay_s: (sent > 0).then_some(0.0),
        }
    }

    fn report(threshold: Option<f64>) -> SimulationReport {
        SimulationReport {
            length_s: 2.0,
            enb: node("ENB", 4),
            enb_average_threshold: threshold,
            ue: node("UE", 0),
            ue_states: UeState::ALL
                .iter()
                .map(|&state| {
                    let seconds = match state {
                        UeState::Connected => 1.5,
                        UeState::ConnectedDrx => 0.5,
                        _ => 0.0,
                    };
                    StateTime {
                        state,
                        seconds,
                        percent: 100.0 * seconds / 2.0,
                    }
                })
                .collect(),
        }
    }

    #[test]
    fn test_text_format() {
        let text = report(Some(3.25)).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "ENB packets: received 4 sent 4 dropped 0");
        assert_eq!(lines[1], "ENB packet delay: average 0.000000000 max 0.000000000");
        assert_eq!(lines[2], "ENB average DRX queue threshold: 3.250000000");
        assert_eq!(lines[3], "UE packets: received 0 sent 0 dropped 0");
        assert_eq!(lines[4], "UE time in state DISCONNECTED: 0.000000000 0.00 %");
        assert!(lines.contains(&"UE time in state CONNECTED: 1.500000000 75.00 %"));
        assert_eq!(lines.len(), 4 + UeState::ALL.len());
    }

    #[test]
    fn test_threshold_line_only_when_adaptive() {
        let text = report(None).to_string();
        assert!(!text.contains("queue threshold"));
    }

    #[test]
    fn test_lookup_helpers() {
        let report = report(None);
        assert_eq!(report.seconds_in(UeState::ConnectedDrx), 0.5);
        assert_eq!(report.total_state_time(), 2.0);
    }

    #[test]
    fn test_json_round_trip() {
        let report = report(Some(1.0));
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"CONNECTED_DRX\""));
        let back: SimulationReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
