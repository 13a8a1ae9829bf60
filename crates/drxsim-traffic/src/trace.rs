//! Trace replay.
//!
//! A trace is a text file with one inter-arrival time in seconds per line.
//! Only the first whitespace-separated field of a line is read, so traces
//! may carry extra columns. Blank lines are skipped.

use crate::{TrafficError, TrafficSource};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

/// Replays recorded inter-arrival times.
///
/// Once the trace is exhausted every call returns `horizon + 1` second, which
/// the event queue discards.
#[derive(Debug, Clone)]
pub struct TraceSource {
    interarrivals: Vec<f64>,
    position: usize,
    arrival_time: f64,
    exhausted_at: f64,
}

impl TraceSource {
    /// Load a trace file. `horizon_s` is the run length in seconds.
    pub fn from_path(path: impl AsRef<Path>, horizon_s: f64) -> Result<Self, TrafficError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| TrafficError::TraceIo {
            path: path.to_path_buf(),
            source,
        })?;
        let source = Self::from_reader(file, horizon_s).map_err(|e| match e {
            TrafficError::TraceIo { source, .. } => TrafficError::TraceIo {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        debug!(
            "TraceSource: loaded {} interarrival times from {}",
            source.interarrivals.len(),
            path.display()
        );
        Ok(source)
    }

    /// Read a trace from any reader.
    pub fn from_reader(reader: impl Read, horizon_s: f64) -> Result<Self, TrafficError> {
        let mut interarrivals = Vec::new();
        for (i, line) in BufReader::new(reader).lines().enumerate() {
            let line = line.map_err(|source| TrafficError::TraceIo {
                path: "<reader>".into(),
                source,
            })?;
            let Some(field) = line.split_whitespace().next() else {
                continue;
            };
            let value: f64 = field
                .parse()
                .ok()
                .filter(|v: &f64| v.is_finite() && *v >= 0.0)
                .ok_or_else(|| TrafficError::InvalidInterarrival {
                    line: i + 1,
                    value: field.to_string(),
                })?;
            interarrivals.push(value);
        }
        Ok(TraceSource {
            interarrivals,
            position: 0,
            arrival_time: 0.0,
            exhausted_at: horizon_s + 1.0,
        })
    }

    /// Inter-arrival times not yet replayed.
    pub fn remaining(&self) -> usize {
        self.interarrivals.len() - self.position
    }
}

impl TrafficSource for TraceSource {
    fn next_arrival(&mut self) -> f64 {
        match self.interarrivals.get(self.position) {
            Some(dt) => {
                self.position += 1;
                self.arrival_time += dt;
                self.arrival_time
            }
            None => self.exhausted_at,
        }
    }

    fn name(&self) -> &'static str {
        "trace"
    }
}
