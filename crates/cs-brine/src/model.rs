//! Solubility model trait and the closed set of model identities.

use crate::cancel::CancelToken;
use crate::error::BrineResult;
use crate::result::{SimulationResult, Sweep1D};
use crate::state::SimulationState;
use crate::sweep_executor::run_points;
use crate::sweeps::SweepAxis;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Every model the dispatcher can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    /// Equilibrium solver with the general database
    EquilibriumPrimary,
    /// Equilibrium solver with the Pitzer database
    EquilibriumExtended,
    /// Duan & Sun (2003) correlation, brine only.
    ///
    /// Also answers to the legacy alias `duan_sun_2006`; the year in that alias
    /// does not name the correlation that runs.
    AnalyticCorrelation,
    /// Fixed sentinel output
    Placeholder,
}

impl ModelId {
    pub const ALL: [ModelId; 4] = [
        ModelId::EquilibriumPrimary,
        ModelId::EquilibriumExtended,
        ModelId::AnalyticCorrelation,
        ModelId::Placeholder,
    ];

    pub fn canonical_name(&self) -> &'static str {
        match self {
            ModelId::EquilibriumPrimary => "equilibrium_primary",
            ModelId::EquilibriumExtended => "equilibrium_extended",
            ModelId::AnalyticCorrelation => "analytic_correlation",
            ModelId::Placeholder => "placeholder",
        }
    }

    /// Identifiers accepted for compatibility with older clients.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            ModelId::EquilibriumPrimary => &["phreeqc_phreeqc", "phreeqc"],
            ModelId::EquilibriumExtended => &["phreeqc_pitzer", "pitzer"],
            ModelId::AnalyticCorrelation => &["duan_sun_2006", "duan_sun"],
            ModelId::Placeholder => &["carbonex"],
        }
    }

    pub fn supports_minerals(&self) -> bool {
        matches!(
            self,
            ModelId::EquilibriumPrimary | ModelId::EquilibriumExtended
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            ModelId::EquilibriumPrimary => "PHREEQC with phreeqc.dat",
            ModelId::EquilibriumExtended => "PHREEQC with pitzer.dat (high salinity)",
            ModelId::AnalyticCorrelation => "Duan & Sun (2003) CO2 solubility correlation",
            ModelId::Placeholder => "Fixed dissolved CO2 placeholder",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// Per-call context handed to models.
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Correlates log lines of one orchestration call
    pub run_id: Uuid,
    pub cancel: CancelToken,
}

impl RunContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(cancel: CancelToken) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            cancel,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A CO2 solubility model.
///
/// Implementations must be thread-safe (Send + Sync): sweep points run on a
/// worker pool. Sweeps never fail as a whole once started; failed points are
/// recorded in the returned [`Sweep1D`].
pub trait SolubilityModel: Send + Sync {
    fn id(&self) -> ModelId;

    /// Equilibrate one state.
    fn single_state(&self, state: &SimulationState, ctx: &RunContext)
    -> BrineResult<SimulationResult>;

    /// Dissolved CO2 along `pressures_mpa` at the base state's temperature.
    ///
    /// Default: one single-state call per point.
    fn pressure_sweep(
        &self,
        base: &SimulationState,
        pressures_mpa: &[f64],
        ctx: &RunContext,
    ) -> Sweep1D {
        let states = pressures_mpa
            .iter()
            .map(|p| (*p, base.at(base.temperature_k, *p)))
            .collect();
        Sweep1D::new(SweepAxis::Pressure, run_points(self, states, ctx))
    }

    /// Dissolved CO2 along `temperatures_k` at the base state's pressure.
    fn temperature_sweep(
        &self,
        base: &SimulationState,
        temperatures_k: &[f64],
        ctx: &RunContext,
    ) -> Sweep1D {
        let states = temperatures_k
            .iter()
            .map(|t| (*t, base.at(*t, base.pressure_mpa)))
            .collect();
        Sweep1D::new(SweepAxis::Temperature, run_points(self, states, ctx))
    }
}
