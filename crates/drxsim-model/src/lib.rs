//! Run configuration for the DRX simulator.
//!
//! A run is described by a [`SimulationConfig`], read either from a YAML
//! model file or from the legacy line-oriented format (see [`legacy`]).
//! Every field has a default, so an empty file describes the stock run.
//!
//! ```yaml
//! simulation: { length_s: 10.0, seed: 1 }
//! connected_drx: { queue_threshold: 0, delay_threshold: 200 }
//! downlink:
//!   traffic: { distribution: poisson, rate: 0.05 }
//! uplink:
//!   traffic: { distribution: silent }
//! ```

mod config;
mod error;
pub mod legacy;

pub use config::{
    ConnectedDrxConfig, IdleDrxConfig, LinkConfig, LteConfig, RunConfig, SimulationConfig,
    TrafficSpec, DEFAULT_PARETO_ALPHA,
};
pub use error::ModelError;
pub use legacy::parse_legacy;

use std::path::Path;
use tracing::debug;

/// Parse a YAML model.
///
/// Relative trace paths are left as written.
pub fn load_model_from_str(yaml: &str) -> Result<SimulationConfig, ModelError> {
    let config: SimulationConfig = serde_yaml::from_str(yaml)?;
    config.validate()?;
    Ok(config)
}

/// Load a model file.
///
/// Files ending in `.yaml` or `.yml` are read as YAML, anything else in the
/// legacy format. Relative trace paths are resolved against the directory of
/// the model file.
pub fn load_model(path: impl AsRef<Path>) -> Result<SimulationConfig, ModelError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut config = if is_yaml_path(path) {
        serde_yaml::from_str(&text)?
    } else {
        parse_legacy(&text)?
    };

    if let Some(dir) = path.parent() {
        config.downlink.traffic.resolve_paths(dir);
        config.uplink.traffic.resolve_paths(dir);
    }
    config.validate()?;
    debug!(
        "Loaded model {}: downlink {}, uplink {}",
        path.display(),
        config.downlink.traffic.distribution(),
        config.uplink.traffic.distribution()
    );
    Ok(config)
}

/// Whether a model path names a YAML file.
pub fn is_yaml_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
