use drxsim_traffic::TrafficError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating a run configuration.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML syntax or schema error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A value is out of its allowed range.
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Malformed line in a legacy configuration file.
    #[error("config line {line}: {message}")]
    Legacy { line: usize, message: String },

    /// Traffic source could not be built.
    #[error(transparent)]
    Traffic(#[from] TrafficError),
}

impl ModelError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ModelError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
