//! Error types for traffic sources.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a traffic source.
#[derive(Debug, Error)]
pub enum TrafficError {
    /// Rate is not a positive finite number.
    #[error("invalid packet rate {0}: must be positive and finite")]
    InvalidRate(f64),

    /// Pareto shape parameter out of range.
    #[error("invalid Pareto shape {0}: must be greater than 1")]
    InvalidShape(f64),

    /// Trace file could not be read.
    #[error("cannot read trace file {path}: {source}")]
    TraceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A trace line does not hold a valid inter-arrival time.
    #[error("trace line {line}: invalid interarrival time {value:?}")]
    InvalidInterarrival { line: usize, value: String },
}
