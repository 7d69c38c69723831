//! Solver configuration.

use crate::sweeps::SweepRange;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// What to do with a model identifier the registry does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownModelPolicy {
    /// Single states fall back to the primary equilibrium model; sweeps come back empty.
    #[default]
    Legacy,
    /// Everything falls back to the primary equilibrium model.
    Fallback,
    /// Everything fails with `UnknownModel`.
    Reject,
}

/// Ranges used when a request leaves the sweep axis unspecified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepDefaults {
    /// [MPa]
    pub pressure: SweepRange,
    /// [K]
    pub temperature: SweepRange,
    /// [MPa]
    pub grid_pressure: SweepRange,
    /// [K]
    pub grid_temperature: SweepRange,
    /// [K]
    pub brine_rock_temperature: SweepRange,
}

impl Default for SweepDefaults {
    fn default() -> Self {
        Self {
            pressure: SweepRange::new(0.1, 50.0, 1.0),
            temperature: SweepRange::new(273.15, 573.15, 5.0),
            grid_pressure: SweepRange::new(1.0, 101.0, 1.0),
            grid_temperature: SweepRange::new(273.15, 583.15, 1.0),
            brine_rock_temperature: SweepRange::new(298.0, 433.0, 15.0),
        }
    }
}

/// Settings shared by every backend and the sweep executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Equilibrium solver executable (looked up on `PATH` when relative)
    pub phreeqc_executable: PathBuf,
    /// Directory holding `phreeqc.dat` and `pitzer.dat`
    pub database_dir: PathBuf,
    /// Directory whose `*.pqi` files override the built-in deck templates
    pub template_dir: Option<PathBuf>,
    pub timeout_secs: u64,
    /// Sweep worker threads; 1 runs points sequentially
    pub max_workers: usize,
    /// Parent of per-run working directories (system temp dir when unset)
    pub work_root: Option<PathBuf>,
    /// Leave solver working directories on disk for inspection
    pub keep_workdirs: bool,
    pub unknown_model: UnknownModelPolicy,
    pub sweep_defaults: SweepDefaults,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            phreeqc_executable: PathBuf::from("phreeqc"),
            database_dir: PathBuf::from("/usr/local/share/doc/phreeqc/database"),
            template_dir: None,
            timeout_secs: 120,
            max_workers: 4,
            work_root: None,
            keep_workdirs: false,
            unknown_model: UnknownModelPolicy::Legacy,
            sweep_defaults: SweepDefaults::default(),
        }
    }
}

impl SolverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn workers(&self) -> usize {
        self.max_workers.max(1)
    }
}
