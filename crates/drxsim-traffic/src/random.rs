//! Random arrival processes.
//!
//! Each source owns its own seeded generator so a run is reproducible from
//! its seed alone, independently of any other source in the process.

use crate::{check_rate, TrafficError, TrafficSource};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, Pareto};

/// Memoryless arrivals: exponential inter-arrival times with mean `1 / rate`.
#[derive(Debug, Clone)]
pub struct PoissonSource {
    rng: ChaCha8Rng,
    interarrival: Exp<f64>,
    arrival_time: f64,
}

impl PoissonSource {
    /// `rate` in packets per second.
    pub fn new(rate: f64, seed: u64) -> Result<Self, TrafficError> {
        check_rate(rate)?;
        let interarrival = Exp::new(rate).map_err(|_| TrafficError::InvalidRate(rate))?;
        Ok(PoissonSource {
            rng: ChaCha8Rng::seed_from_u64(seed),
            interarrival,
            arrival_time: 0.0,
        })
    }
}

impl TrafficSource for PoissonSource {
    fn next_arrival(&mut self) -> f64 {
        self.arrival_time += self.interarrival.sample(&mut self.rng);
        self.arrival_time
    }

    fn name(&self) -> &'static str {
        "poisson"
    }
}

/// Heavy-tailed arrivals: Pareto inter-arrival times with shape `alpha`.
///
/// The scale is `(alpha - 1) / alpha / rate`, which makes the mean
/// inter-arrival time `1 / rate`.
#[derive(Debug, Clone)]
pub struct ParetoSource {
    rng: ChaCha8Rng,
    interarrival: Pareto<f64>,
    arrival_time: f64,
}

impl ParetoSource {
    /// `rate` in packets per second, `alpha > 1`.
    pub fn new(rate: f64, alpha: f64, seed: u64) -> Result<Self, TrafficError> {
        check_rate(rate)?;
        if !(alpha.is_finite() && alpha > 1.0) {
            return Err(TrafficError::InvalidShape(alpha));
        }
        let scale = (alpha - 1.0) / alpha / rate;
        let interarrival =
            Pareto::new(scale, alpha).map_err(|_| TrafficError::InvalidShape(alpha))?;
        Ok(ParetoSource {
            rng: ChaCha8Rng::seed_from_u64(seed),
            interarrival,
            arrival_time: 0.0,
        })
    }
}

impl TrafficSource for ParetoSource {
    fn next_arrival(&mut self) -> f64 {
        self.arrival_time += self.interarrival.sample(&mut self.rng);
        self.arrival_time
    }

    fn name(&self) -> &'static str {
        "pareto"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn mean_interarrival(source: &mut dyn TrafficSource, n: usize) -> f64 {
        let mut last = 0.0;
        for _ in 0..n {
            let t = source.next_arrival();
            assert!(t >= last);
            last = t;
        }
        last / n as f64
    }

    #[test]
    fn test_poisson_mean_matches_rate() {
        let mut source = PoissonSource::new(100.0, 1).unwrap();
        let mean = mean_interarrival(&mut source, 50_000);
        assert_relative_eq!(mean, 0.01, max_relative = 0.05);
    }

    #[test]
    fn test_pareto_mean_matches_rate() {
        let mut source = ParetoSource::new(100.0, 2.5, 1).unwrap();
        let mean = mean_interarrival(&mut source, 200_000);
        assert_relative_eq!(mean, 0.01, max_relative = 0.1);
    }

    #[test]
    fn test_pareto_minimum_is_scale() {
        let alpha = 2.5;
        let rate = 100.0;
        let scale = (alpha - 1.0) / alpha / rate;
        let mut source = ParetoSource::new(rate, alpha, 3).unwrap();
        let mut last = 0.0;
        for _ in 0..1000 {
            let t = source.next_arrival();
            assert!(t - last >= scale * (1.0 - 1e-12));
            last = t;
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = PoissonSource::new(50.0, 42).unwrap();
        let mut b = PoissonSource::new(50.0, 42).unwrap();
        for _ in 0..100 {
            assert_eq!(a.next_arrival(), b.next_arrival());
        }
    }

    #[test]
    fn test_different_seed_different_sequence() {
        let mut a = PoissonSource::new(50.0, 1).unwrap();
        let mut b = PoissonSource::new(50.0, 2).unwrap();
        let sa: Vec<f64> = (0..10).map(|_| a.next_arrival()).collect();
        let sb: Vec<f64> = (0..10).map(|_| b.next_arrival()).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn test_pareto_shape_must_exceed_one() {
        assert!(matches!(
            ParetoSource::new(1.0, 1.0, 0),
            Err(TrafficError::InvalidShape(_))
        ));
        assert!(matches!(
            ParetoSource::new(1.0, 0.5, 0),
            Err(TrafficError::InvalidShape(_))
        ));
        assert!(matches!(
            ParetoSource::new(0.0, 2.0, 0),
            Err(TrafficError::InvalidRate(_))
        ));
    }
}
