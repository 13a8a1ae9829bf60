//! Run configuration.
//!
//! All DRX and idle-mode durations are counted in subframes. Traffic rates are
//! in packets per subframe.

use crate::ModelError;
use drxsim_common::SimTime;
use drxsim_traffic::{
    per_second, DeterministicSource, ParetoSource, PoissonSource, SilentSource, TraceSource,
    TrafficError, TrafficSource,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Pareto shape used when none is given.
pub const DEFAULT_PARETO_ALPHA: f64 = 2.5;

// ============================================================================
// Top Level
// ============================================================================

/// Complete description of one simulation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub simulation: RunConfig,
    pub lte: LteConfig,
    pub connected_drx: ConnectedDrxConfig,
    pub idle_drx: IdleDrxConfig,
    pub downlink: LinkConfig,
    pub uplink: LinkConfig,
}

/// Run length, seed and output options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Simulated time in seconds.
    pub length_s: f64,
    pub seed: u64,
    /// Print one trace line per handled event.
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            length_s: 10.0,
            seed: 1,
            verbose: false,
        }
    }
}

/// Radio-level parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LteConfig {
    /// Subframe length in seconds. One packet is sent per subframe.
    pub subframe_s: f64,
    /// Subframes needed to reach CONNECTED from an idle state.
    pub connection_delay: u32,
    /// Switch the radio off instead of entering idle-mode DRX.
    pub disconnect_radio: bool,
}

impl Default for LteConfig {
    fn default() -> Self {
        LteConfig {
            subframe_s: 0.001,
            connection_delay: 260,
            disconnect_radio: false,
        }
    }
}

/// Connected-mode DRX parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectedDrxConfig {
    pub short_cycle: u32,
    pub long_cycle: u32,
    /// Consecutive short cycles before switching to the long cycle.
    pub short_cycle_timer: u32,
    pub on_duration: u32,
    pub inactivity_timer: u32,
    /// Downlink queue depth that wakes the terminal. `0` selects the
    /// adaptive threshold.
    pub queue_threshold: u32,
    /// Delay budget. Also the ceiling of the adaptive threshold. `0`
    /// disables the delay-based wake-up.
    pub delay_threshold: u32,
    /// Average delay the adaptive threshold aims for.
    pub target_avg_delay: u32,
}

impl Default for ConnectedDrxConfig {
    fn default() -> Self {
        ConnectedDrxConfig {
            short_cycle: 32,
            long_cycle: 64,
            short_cycle_timer: 2,
            on_duration: 2,
            inactivity_timer: 10,
            queue_threshold: 1,
            delay_threshold: 1000,
            target_avg_delay: 64,
        }
    }
}

impl ConnectedDrxConfig {
    pub fn is_adaptive(&self) -> bool {
        self.queue_threshold == 0
    }
}

/// Idle-mode DRX parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdleDrxConfig {
    pub cycle: u32,
    pub on_duration: u32,
    /// Subframes of inactivity before leaving connected mode.
    pub inactivity_timer: u32,
}

impl Default for IdleDrxConfig {
    fn default() -> Self {
        IdleDrxConfig {
            cycle: 1280,
            on_duration: 43,
            inactivity_timer: 10000,
        }
    }
}

/// One direction of the link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    pub traffic: TrafficSpec,
    /// Queue capacity in packets, `0` for unbounded.
    pub max_queue_size: u32,
}

impl Default for LinkConfig {
    fn default() -> Self {
        LinkConfig {
            traffic: TrafficSpec::default(),
            max_queue_size: 0,
        }
    }
}

// ============================================================================
// Traffic
// ============================================================================

/// Arrival process of one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "distribution", rename_all = "lowercase")]
pub enum TrafficSpec {
    Deterministic {
        rate: f64,
    },
    Poisson {
        rate: f64,
    },
    Pareto {
        rate: f64,
        #[serde(default = "default_alpha")]
        alpha: f64,
    },
    Trace {
        path: PathBuf,
    },
    Silent,
}

fn default_alpha() -> f64 {
    DEFAULT_PARETO_ALPHA
}

impl Default for TrafficSpec {
    fn default() -> Self {
        TrafficSpec::Deterministic { rate: 0.1 }
    }
}

impl TrafficSpec {
    /// Distribution name as written in configuration files.
    pub fn distribution(&self) -> &'static str {
        match self {
            TrafficSpec::Deterministic { .. } => "deterministic",
            TrafficSpec::Poisson { .. } => "poisson",
            TrafficSpec::Pareto { .. } => "pareto",
            TrafficSpec::Trace { .. } => "trace",
            TrafficSpec::Silent => "silent",
        }
    }

    /// Build the source.
    ///
    /// `subframe_s` converts the per-subframe rate; `horizon_s` is needed by
    /// trace replay to signal exhaustion.
    pub fn build(
        &self,
        seed: u64,
        subframe_s: f64,
        horizon_s: f64,
    ) -> Result<Box<dyn TrafficSource>, TrafficError> {
        Ok(match self {
            TrafficSpec::Deterministic { rate } => {
                Box::new(DeterministicSource::new(per_second(*rate, subframe_s))?)
            }
            TrafficSpec::Poisson { rate } => {
                Box::new(PoissonSource::new(per_second(*rate, subframe_s), seed)?)
            }
            TrafficSpec::Pareto { rate, alpha } => Box::new(ParetoSource::new(
                per_second(*rate, subframe_s),
                *alpha,
                seed,
            )?),
            TrafficSpec::Trace { path } => Box::new(TraceSource::from_path(path, horizon_s)?),
            TrafficSpec::Silent => Box::new(SilentSource),
        })
    }

    fn validate(&self, field: &'static str) -> Result<(), ModelError> {
        let rate = match self {
            TrafficSpec::Deterministic { rate } | TrafficSpec::Poisson { rate } => *rate,
            TrafficSpec::Pareto { rate, alpha } => {
                if !(alpha.is_finite() && *alpha > 1.0) {
                    return Err(ModelError::invalid(
                        field,
                        format!("Pareto alpha must be greater than 1, got {alpha}"),
                    ));
                }
                *rate
            }
            TrafficSpec::Trace { .. } | TrafficSpec::Silent => return Ok(()),
        };
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ModelError::invalid(
                field,
                format!("rate must be positive, got {rate}"),
            ));
        }
        if rate > 1.0 {
            warn!(
                "{}: {} packets per subframe exceeds the one-packet-per-subframe link capacity",
                field, rate
            );
        }
        Ok(())
    }

    /// Make a relative trace path relative to `base` instead of the working directory.
    pub(crate) fn resolve_paths(&mut self, base: &Path) {
        if let TrafficSpec::Trace { path } = self {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

// ============================================================================
// Derived Values and Validation
// ============================================================================

impl SimulationConfig {
    /// End of the run.
    pub fn horizon(&self) -> SimTime {
        SimTime::from_secs(self.simulation.length_s)
    }

    /// Subframe length.
    pub fn subframe(&self) -> SimTime {
        SimTime::from_secs(self.lte.subframe_s)
    }

    pub fn is_adaptive(&self) -> bool {
        self.connected_drx.is_adaptive()
    }

    /// Seed of the downlink source. The uplink uses the next seed so the two
    /// directions are independent.
    pub fn downlink_seed(&self) -> u64 {
        self.simulation.seed
    }

    pub fn uplink_seed(&self) -> u64 {
        self.simulation.seed.wrapping_add(1)
    }

    /// Build the base station's traffic source.
    pub fn downlink_source(&self) -> Result<Box<dyn TrafficSource>, TrafficError> {
        self.downlink.traffic.build(
            self.downlink_seed(),
            self.lte.subframe_s,
            self.simulation.length_s,
        )
    }

    /// Build the terminal's traffic source.
    pub fn uplink_source(&self) -> Result<Box<dyn TrafficSource>, TrafficError> {
        self.uplink.traffic.build(
            self.uplink_seed(),
            self.lte.subframe_s,
            self.simulation.length_s,
        )
    }

    /// Check every value against its allowed range.
    pub fn validate(&self) -> Result<(), ModelError> {
        let length = self.simulation.length_s;
        if !(length.is_finite() && length > 0.0) {
            return Err(ModelError::invalid(
                "simulation.length_s",
                format!("must be positive, got {length}"),
            ));
        }
        let subframe = self.lte.subframe_s;
        if !(subframe.is_finite() && subframe > 0.0) {
            return Err(ModelError::invalid(
                "lte.subframe_s",
                format!("must be positive, got {subframe}"),
            ));
        }
        if self.subframe() == SimTime::ZERO {
            return Err(ModelError::invalid(
                "lte.subframe_s",
                "must be at least one nanosecond",
            ));
        }

        let drx = &self.connected_drx;
        if drx.on_duration < 1 {
            return Err(ModelError::invalid(
                "connected_drx.on_duration",
                "must be at least one subframe",
            ));
        }
        if drx.short_cycle < drx.on_duration {
            return Err(ModelError::invalid(
                "connected_drx.short_cycle",
                format!(
                    "cycle {} is shorter than on_duration {}",
                    drx.short_cycle, drx.on_duration
                ),
            ));
        }
        if drx.long_cycle < drx.on_duration {
            return Err(ModelError::invalid(
                "connected_drx.long_cycle",
                format!(
                    "cycle {} is shorter than on_duration {}",
                    drx.long_cycle, drx.on_duration
                ),
            ));
        }
        if drx.is_adaptive() && drx.delay_threshold < 1 {
            return Err(ModelError::invalid(
                "connected_drx.delay_threshold",
                "the adaptive queue threshold needs a delay threshold of at least 1",
            ));
        }
        if drx.short_cycle > drx.long_cycle {
            warn!(
                "connected_drx: short cycle {} is longer than long cycle {}",
                drx.short_cycle, drx.long_cycle
            );
        }

        let idle = &self.idle_drx;
        if idle.cycle < idle.on_duration {
            return Err(ModelError::invalid(
                "idle_drx.cycle",
                format!(
                    "cycle {} is shorter than on_duration {}",
                    idle.cycle, idle.on_duration
                ),
            ));
        }

        self.downlink.traffic.validate("downlink.traffic")?;
        self.uplink.traffic.validate("uplink.traffic")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.simulation.length_s, 10.0);
        assert_eq!(config.simulation.seed, 1);
        assert_eq!(config.lte.connection_delay, 260);
        assert_eq!(config.connected_drx.short_cycle, 32);
        assert_eq!(config.connected_drx.queue_threshold, 1);
        assert_eq!(config.idle_drx.cycle, 1280);
        assert_eq!(config.downlink.traffic, TrafficSpec::Deterministic { rate: 0.1 });
        assert_eq!(config.horizon(), SimTime::from_millis(10_000));
        assert_eq!(config.subframe(), SimTime::from_millis(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_seeds_differ_per_direction() {
        let config = SimulationConfig::default();
        assert_ne!(config.downlink_seed(), config.uplink_seed());
    }

    #[test]
    fn test_validation_failures() {
        let mut config = SimulationConfig::default();
        config.simulation.length_s = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ModelError::Invalid { field: "simulation.length_s", .. })
        ));

        let mut config = SimulationConfig::default();
        config.connected_drx.on_duration = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.connected_drx.short_cycle = 1;
        assert!(matches!(
            config.validate(),
            Err(ModelError::Invalid { field: "connected_drx.short_cycle", .. })
        ));

        let mut config = SimulationConfig::default();
        config.connected_drx.queue_threshold = 0;
        config.connected_drx.delay_threshold = 0;
        assert!(matches!(
            config.validate(),
            Err(ModelError::Invalid { field: "connected_drx.delay_threshold", .. })
        ));

        let mut config = SimulationConfig::default();
        config.idle_drx.on_duration = 2000;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.uplink.traffic = TrafficSpec::Pareto { rate: 0.1, alpha: 1.0 };
        assert!(matches!(
            config.validate(),
            Err(ModelError::Invalid { field: "uplink.traffic", .. })
        ));

        let mut config = SimulationConfig::default();
        config.downlink.traffic = TrafficSpec::Poisson { rate: -1.0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_static_threshold_allows_zero_delay_threshold() {
        let mut config = SimulationConfig::default();
        config.connected_drx.delay_threshold = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_build_sources() {
        let config = SimulationConfig::default();
        let mut dl = config.downlink_source().unwrap();
        assert_eq!(dl.name(), "deterministic");
        assert!((dl.next_arrival() - 0.01).abs() < 1e-12);

        let silent = TrafficSpec::Silent.build(1, 0.001, 1.0).unwrap();
        assert_eq!(silent.name(), "silent");
    }

    #[test]
    fn test_resolve_relative_trace_path() {
        let mut spec = TrafficSpec::Trace {
            path: PathBuf::from("dl.txt"),
        };
        spec.resolve_paths(Path::new("/models"));
        assert_eq!(
            spec,
            TrafficSpec::Trace {
                path: PathBuf::from("/models/dl.txt")
            }
        );

        let mut absolute = TrafficSpec::Trace {
            path: PathBuf::from("/abs/dl.txt"),
        };
        absolute.resolve_paths(Path::new("/models"));
        assert_eq!(
            absolute,
            TrafficSpec::Trace {
                path: PathBuf::from("/abs/dl.txt")
            }
        );
    }
}
