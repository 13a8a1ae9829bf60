//! Simulation time.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// A simulation instant or duration, counted in nanoseconds.
///
/// Every event time passes through this type, so all scheduling happens on a
/// 1 ns grid: converting from floating-point seconds rounds to the nearest
/// nanosecond. Two events computed along different arithmetic paths therefore
/// compare equal whenever they agree to the nanosecond.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SimTime(u64);

impl SimTime {
    /// The start of every simulation run.
    pub const ZERO: SimTime = SimTime(0);

    /// The largest representable instant.
    pub const MAX: SimTime = SimTime(u64::MAX);

    /// Create a time from a raw nanosecond count.
    #[inline]
    pub const fn from_nanos(nanos: u64) -> Self {
        SimTime(nanos)
    }

    /// Create a time from microseconds.
    #[inline]
    pub const fn from_micros(micros: u64) -> Self {
        SimTime(micros * 1_000)
    }

    /// Create a time from milliseconds.
    #[inline]
    pub const fn from_millis(millis: u64) -> Self {
        SimTime(millis * 1_000_000)
    }

    /// Create a time from seconds, rounded to the nearest nanosecond.
    ///
    /// Negative and NaN inputs map to [`SimTime::ZERO`]; values too large to
    /// represent (including `+inf`) saturate at [`SimTime::MAX`].
    pub fn from_secs(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            return SimTime::ZERO;
        }
        // `as` saturates for out-of-range floats.
        SimTime((secs * NANOS_PER_SEC).round() as u64)
    }

    /// Raw nanosecond count.
    #[inline]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Time in seconds.
    #[inline]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / NANOS_PER_SEC
    }

    /// `self - earlier`, or zero if `earlier` is later than `self`.
    #[inline]
    pub fn saturating_sub(self, earlier: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(earlier.0))
    }

    /// `self + delta`, saturating at [`SimTime::MAX`].
    #[inline]
    pub fn saturating_add(self, delta: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(delta.0))
    }
}

impl Add for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> SimTime {
        self.saturating_add(rhs)
    }
}

impl AddAssign for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        *self = *self + rhs;
    }
}

/// Multiples of a duration, e.g. `subframe * cycle_length`.
impl Mul<u32> for SimTime {
    type Output = SimTime;

    fn mul(self, rhs: u32) -> SimTime {
        SimTime(self.0.saturating_mul(u64::from(rhs)))
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.9}", self.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_secs_rounds_to_nanos() {
        assert_eq!(SimTime::from_secs(0.001).as_nanos(), 1_000_000);
        assert_eq!(SimTime::from_secs(1.000_000_000_4).as_nanos(), 1_000_000_000);
        assert_eq!(SimTime::from_secs(1.000_000_000_6).as_nanos(), 1_000_000_001);
    }

    #[test]
    fn test_accumulated_float_error_is_absorbed() {
        // 100 additions of 0.01 drift away from 1.0 in binary floating point.
        let mut t = 0.0f64;
        for _ in 0..100 {
            t += 0.01;
        }
        assert_ne!(t, 1.0);
        assert_eq!(SimTime::from_secs(t), SimTime::from_millis(1000));
    }

    #[test]
    fn test_from_secs_edge_values() {
        assert_eq!(SimTime::from_secs(-1.0), SimTime::ZERO);
        assert_eq!(SimTime::from_secs(f64::NAN), SimTime::ZERO);
        assert_eq!(SimTime::from_secs(f64::INFINITY), SimTime::MAX);
    }

    #[test]
    fn test_arithmetic() {
        let sf = SimTime::from_millis(1);
        assert_eq!(sf * 32, SimTime::from_millis(32));
        assert_eq!(SimTime::from_millis(10) + sf, SimTime::from_millis(11));
        assert_eq!(sf.saturating_sub(SimTime::from_millis(5)), SimTime::ZERO);
        assert_eq!(SimTime::MAX + sf, SimTime::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(SimTime::from_millis(10).to_string(), "0.010000000");
    }
}
