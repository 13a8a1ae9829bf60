//! Packet arrival processes.
//!
//! A [`TrafficSource`] hands out absolute arrival instants, in seconds, one at
//! a time. The simulator asks for the next instant every time it handles an
//! arrival, so a source only ever has to look one packet ahead.
//!
//! Rates are given in packets per second; [`per_second`] converts the
//! packets-per-subframe figures used in run configurations.

mod error;
mod random;
mod trace;

pub use error::TrafficError;
pub use random::{ParetoSource, PoissonSource};
pub use trace::TraceSource;

/// Generator of packet arrival instants.
pub trait TrafficSource: Send {
    /// Absolute time of the next arrival, in seconds.
    ///
    /// Successive calls return non-decreasing values. A source with nothing
    /// left to deliver returns an instant past the simulation horizon.
    fn next_arrival(&mut self) -> f64;

    /// Short name of the arrival process.
    fn name(&self) -> &'static str;
}

impl<T: TrafficSource + ?Sized> TrafficSource for Box<T> {
    fn next_arrival(&mut self) -> f64 {
        (**self).next_arrival()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Convert a rate in packets per subframe to packets per second.
pub fn per_second(rate_per_subframe: f64, subframe_s: f64) -> f64 {
    rate_per_subframe / subframe_s
}

pub(crate) fn check_rate(rate: f64) -> Result<(), TrafficError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        Err(TrafficError::InvalidRate(rate))
    }
}

// ============================================================================
// Deterministic
// ============================================================================

/// Evenly spaced arrivals, `1 / rate` seconds apart.
#[derive(Debug, Clone)]
pub struct DeterministicSource {
    interval: f64,
    arrival_time: f64,
}

impl DeterministicSource {
    /// `rate` in packets per second.
    pub fn new(rate: f64) -> Result<Self, TrafficError> {
        check_rate(rate)?;
        Ok(DeterministicSource {
            interval: 1.0 / rate,
            arrival_time: 0.0,
        })
    }
}

impl TrafficSource for DeterministicSource {
    fn next_arrival(&mut self) -> f64 {
        self.arrival_time += self.interval;
        self.arrival_time
    }

    fn name(&self) -> &'static str {
        "deterministic"
    }
}

// ============================================================================
// Silent
// ============================================================================

/// A source that never produces a packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSource;

impl TrafficSource for SilentSource {
    fn next_arrival(&mut self) -> f64 {
        f64::INFINITY
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}
