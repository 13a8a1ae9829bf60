//! Legacy line-oriented configuration format.
//!
//! ```text
//! ; comment
//! PSF 0.001
//! DL_TRAFFIC pareto 0.1 2.5
//! UL_TRAFFIC trace uplink.txt
//! RRC_CONNECTED_DRX 32 64 2 2 10 0 1000 64
//! RRC_IDLE_DRX 1280 43 10000 260
//! ```
//!
//! `RRC_CONNECTED_DRX` fields are short cycle, long cycle, short cycle timer,
//! on duration, inactivity timer, queue threshold, then the delay threshold
//! (read only when the queue threshold is not 1) and the target average delay
//! (read only when the queue threshold is 0). `RRC_IDLE_DRX` fields are
//! cycle, on duration, inactivity timer and connection delay.
//!
//! Run length, seed and verbosity are not part of this format; they come from
//! the command line. Unknown keys are ignored.

use crate::config::{SimulationConfig, TrafficSpec, DEFAULT_PARETO_ALPHA};
use crate::ModelError;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

/// Parse a legacy configuration, starting from the defaults.
pub fn parse_legacy(text: &str) -> Result<SimulationConfig, ModelError> {
    let mut config = SimulationConfig::default();
    for (i, raw) in text.lines().enumerate() {
        let line = Line::new(i + 1, raw);
        let Some(key) = line.fields.first().copied() else {
            continue;
        };
        if key.starts_with(';') {
            continue;
        }
        match key {
            "PSF" => config.lte.subframe_s = line.parse(1, "physical subframe duration")?,
            "DL_TRAFFIC" => config.downlink.traffic = line.traffic("downlink")?,
            "UL_TRAFFIC" => config.uplink.traffic = line.traffic("uplink")?,
            "RRC_CONNECTED_DRX" => {
                let drx = &mut config.connected_drx;
                const WHAT: &str = "RRC_CONNECTED DRX configuration";
                drx.short_cycle = line.parse(1, WHAT)?;
                drx.long_cycle = line.parse(2, WHAT)?;
                drx.short_cycle_timer = line.parse(3, WHAT)?;
                drx.on_duration = line.parse(4, WHAT)?;
                drx.inactivity_timer = line.parse(5, WHAT)?;
                drx.queue_threshold = line.parse(6, WHAT)?;
                if drx.queue_threshold != 1 {
                    if let Some(v) = line.parse_optional(7, WHAT)? {
                        drx.delay_threshold = v;
                    }
                    if drx.queue_threshold == 0 {
                        if let Some(v) = line.parse_optional(8, WHAT)? {
                            drx.target_avg_delay = v;
                        }
                    }
                }
            }
            "RRC_IDLE_DRX" => {
                const WHAT: &str = "RRC_IDLE DRX configuration";
                config.idle_drx.cycle = line.parse(1, WHAT)?;
                config.idle_drx.on_duration = line.parse(2, WHAT)?;
                config.idle_drx.inactivity_timer = line.parse(3, WHAT)?;
                config.lte.connection_delay = line.parse(4, WHAT)?;
            }
            other => debug!("legacy config line {}: ignoring key {}", line.number, other),
        }
    }
    Ok(config)
}

struct Line<'a> {
    number: usize,
    fields: Vec<&'a str>,
}

impl<'a> Line<'a> {
    fn new(number: usize, raw: &'a str) -> Self {
        Line {
            number,
            fields: raw.split_whitespace().collect(),
        }
    }

    fn error(&self, message: impl Into<String>) -> ModelError {
        ModelError::Legacy {
            line: self.number,
            message: message.into(),
        }
    }

    fn parse<T: FromStr>(&self, index: usize, what: &str) -> Result<T, ModelError> {
        self.parse_optional(index, what)?
            .ok_or_else(|| self.error(format!("missing value in {what}")))
    }

    fn parse_optional<T: FromStr>(&self, index: usize, what: &str) -> Result<Option<T>, ModelError> {
        match self.fields.get(index) {
            None => Ok(None),
            Some(s) => s
                .parse()
                .map(Some)
                .map_err(|_| self.error(format!("invalid {what}: {s:?}"))),
        }
    }

    fn traffic(&self, direction: &str) -> Result<TrafficSpec, ModelError> {
        let distribution = self
            .fields
            .get(1)
            .copied()
            .ok_or_else(|| self.error(format!("missing {direction} traffic distribution")))?;
        let rate_what = format!("{direction} packet rate");
        Ok(match distribution {
            "deterministic" => TrafficSpec::Deterministic {
                rate: self.parse(2, &rate_what)?,
            },
            "poisson" => TrafficSpec::Poisson {
                rate: self.parse(2, &rate_what)?,
            },
            "pareto" => TrafficSpec::Pareto {
                rate: self.parse(2, &rate_what)?,
                alpha: self
                    .parse_optional(3, &format!("{direction} alpha parameter"))?
                    .unwrap_or(DEFAULT_PARETO_ALPHA),
            },
            "trace" => TrafficSpec::Trace {
                path: self
                    .fields
                    .get(2)
                    .copied()
                    .map(PathBuf::from)
                    .ok_or_else(|| self.error(format!("missing {direction} trace file")))?,
            },
            "silent" => TrafficSpec::Silent,
            other => {
                return Err(self.error(format!(
                    "invalid {direction} traffic distribution {other:?}"
                )))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_file() {
        let text = "\
; sample configuration
PSF 0.002
DL_TRAFFIC pareto 0.2 1.8
UL_TRAFFIC poisson 0.05
RRC_CONNECTED_DRX 16 128 4 3 20 0 500 32
RRC_IDLE_DRX 2560 40 5000 100
";
        let config = parse_legacy(text).unwrap();
        assert_eq!(config.lte.subframe_s, 0.002);
        assert_eq!(
            config.downlink.traffic,
            TrafficSpec::Pareto { rate: 0.2, alpha: 1.8 }
        );
        assert_eq!(config.uplink.traffic, TrafficSpec::Poisson { rate: 0.05 });
        let drx = config.connected_drx;
        assert_eq!(
            (drx.short_cycle, drx.long_cycle, drx.short_cycle_timer, drx.on_duration),
            (16, 128, 4, 3)
        );
        assert_eq!(drx.inactivity_timer, 20);
        assert_eq!(drx.queue_threshold, 0);
        assert_eq!(drx.delay_threshold, 500);
        assert_eq!(drx.target_avg_delay, 32);
        assert_eq!(config.idle_drx.cycle, 2560);
        assert_eq!(config.idle_drx.on_duration, 40);
        assert_eq!(config.idle_drx.inactivity_timer, 5000);
        assert_eq!(config.lte.connection_delay, 100);
    }

    #[test]
    fn test_conditional_fields_ignored_for_threshold_one() {
        let config = parse_legacy("RRC_CONNECTED_DRX 32 64 2 2 10 1 7 9\n").unwrap();
        assert_eq!(config.connected_drx.delay_threshold, 1000);
        assert_eq!(config.connected_drx.target_avg_delay, 64);
    }

    #[test]
    fn test_target_only_read_in_adaptive_mode() {
        let config = parse_legacy("RRC_CONNECTED_DRX 32 64 2 2 10 4 300 9\n").unwrap();
        assert_eq!(config.connected_drx.queue_threshold, 4);
        assert_eq!(config.connected_drx.delay_threshold, 300);
        assert_eq!(config.connected_drx.target_avg_delay, 64);
    }

    #[test]
    fn test_trace_and_default_alpha() {
        let config = parse_legacy("DL_TRAFFIC trace dl.txt\nUL_TRAFFIC pareto 0.1\n").unwrap();
        assert_eq!(
            config.downlink.traffic,
            TrafficSpec::Trace { path: PathBuf::from("dl.txt") }
        );
        assert_eq!(
            config.uplink.traffic,
            TrafficSpec::Pareto { rate: 0.1, alpha: DEFAULT_PARETO_ALPHA }
        );
    }

    #[test]
    fn test_comments_blank_and_unknown_lines() {
        let config = parse_legacy(";PSF 5\n\n   \nFOO bar\n").unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = parse_legacy("PSF 0.001\nPSF fast\n").unwrap_err();
        match err {
            ModelError::Legacy { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("physical subframe"), "{message}");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            parse_legacy("UL_TRAFFIC uniform 0.1\n"),
            Err(ModelError::Legacy { line: 1, .. })
        ));
        assert!(matches!(
            parse_legacy("RRC_IDLE_DRX 1280 43\n"),
            Err(ModelError::Legacy { line: 1, .. })
        ));
    }
}
