use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const BUILTIN_SIMULATION_CONFIG: &str = include_str!("data/simulation_config.json");
pub const CONFIG_PATH_ENV: &str = "AUTOPILOT_CONFIG_PATH";

/// Session-level tunables. Model weights and clamps are constants in their
/// modules and are deliberately not configurable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub base_seed: u64,
    pub tick_interval_ms: u64,
    pub snapshot_top_exceptions: usize,
    pub cost_index_history_limit: usize,
    pub overflow_relief_days: u32,
    pub expedite_default_qty: u32,
    pub transfer_qty_cap: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            base_seed: 20251212,
            tick_interval_ms: 1200,
            snapshot_top_exceptions: 30,
            cost_index_history_limit: 28,
            overflow_relief_days: 3,
            expedite_default_qty: 1200,
            transfer_qty_cap: 2200,
        }
    }
}

#[derive(Debug, Error)]
pub enum SimulationConfigError {
    #[error("failed to parse simulation config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read simulation config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SimulationConfig {
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_SIMULATION_CONFIG).unwrap_or_default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, SimulationConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, SimulationConfigError> {
        let contents =
            fs::read_to_string(path).map_err(|source| SimulationConfigError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_json_str(&contents)
    }
}

/// Loads the config named by `AUTOPILOT_CONFIG_PATH`, falling back to the
/// builtin document when the variable is unset or the file is unusable.
pub fn load_simulation_config_from_env() -> SimulationConfig {
    let Some(path) = env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from) else {
        tracing::info!(
            target: "supply_autopilot::config",
            "simulation_config.loaded=builtin"
        );
        return SimulationConfig::builtin();
    };

    match SimulationConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "supply_autopilot::config",
                path = %path.display(),
                "simulation_config.loaded=file"
            );
            config
        }
        Err(err) => {
            tracing::warn!(
                target: "supply_autopilot::config",
                path = %path.display(),
                error = %err,
                "simulation_config.load_failed"
            );
            SimulationConfig::builtin()
        }
    }
}
