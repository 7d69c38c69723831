//! Simulation services for frontends.
//!
//! One [`Service`] owns a configured dispatcher; its methods mirror the
//! operations the CLI exposes. Requests are normalized to canonical units
//! before they reach the simulation core.

use cs_brine::{
    Deck, Dispatcher, GridSweep, Mineral, ModelInfo, SimulationResult, SolverConfig, Sweep1D,
    SweepOutcome, SweepPlan, SweepRange, SweepSpec, registered_models,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::config::load_config;
use crate::error::{AppError, AppResult};
use crate::request::{StateRequest, SweepRequest};

/// Dissolved CO2 at one state, plus mineral mass transfer for brine-rock states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedStateResponse {
    /// [mol/kgw]
    pub dissolved_co2: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mineral_deltas: Option<BTreeMap<Mineral, f64>>,
}

pub struct Service {
    dispatcher: Dispatcher,
}

impl Service {
    pub fn new(config: SolverConfig) -> AppResult<Self> {
        Ok(Self {
            dispatcher: Dispatcher::new(config)?,
        })
    }

    /// Build from a config file (or `$CARBOSOL_CONFIG`, or defaults).
    pub fn from_config_path(path: Option<&Path>) -> AppResult<Self> {
        Self::new(load_config(path)?)
    }

    pub fn config(&self) -> &SolverConfig {
        self.dispatcher.config()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Brine properties at one state; any mineral entries are ignored.
    pub fn solution_properties(&self, request: &StateRequest) -> AppResult<SimulationResult> {
        let mut state = request.to_state()?;
        state.minerals = None;
        info!(model = %state.model, "Solution properties requested");
        Ok(self.dispatcher.single_state(&state)?)
    }

    /// Brine properties and mineral mass transfer; the request must name minerals.
    pub fn brine_rock_properties(&self, request: &StateRequest) -> AppResult<SimulationResult> {
        if !request.sample.has_minerals() {
            return Err(AppError::InvalidInput(
                "brine-rock request needs a mineral assemblage".to_string(),
            ));
        }
        let state = request.to_state()?;
        info!(model = %state.model, "Brine-rock properties requested");
        Ok(self.dispatcher.single_state(&state)?)
    }

    pub fn fixed_state(&self, request: &StateRequest) -> AppResult<FixedStateResponse> {
        let state = request.to_state()?;
        let result = self.dispatcher.single_state(&state)?;
        Ok(FixedStateResponse {
            dissolved_co2: result.dissolved_co2,
            mineral_deltas: result.mineral_deltas(),
        })
    }

    /// Pressure sweep at one temperature (the first value of the temperature axis).
    pub fn pressure_sweep(&self, request: &SweepRequest) -> AppResult<Sweep1D> {
        let defaults = &self.config().sweep_defaults;
        let temperature = fixed_axis(request.temperature_range()?, "temperature")?;
        let pressure = request.pressure_range()?.unwrap_or(defaults.pressure);
        let plan = SweepPlan::Pressure {
            temperature_k: temperature,
            pressure,
        };
        match self.run(request, plan, temperature)? {
            SweepOutcome::OneAxis(sweep) => Ok(sweep),
            SweepOutcome::Grid(_) => Err(AppError::Request(
                "pressure sweep produced a grid".to_string(),
            )),
        }
    }

    /// Temperature sweep at one pressure; brine-rock requests default to the
    /// narrower brine-rock temperature range.
    pub fn temperature_sweep(&self, request: &SweepRequest) -> AppResult<Sweep1D> {
        let defaults = &self.config().sweep_defaults;
        let pressure_mpa = fixed_axis(request.pressure_range()?, "pressure")?;
        let temperature = request.temperature_range()?.unwrap_or(if request.sample.has_minerals() {
            defaults.brine_rock_temperature
        } else {
            defaults.temperature
        });
        let plan = SweepPlan::Temperature {
            pressure_mpa,
            temperature,
        };
        match self.run(request, plan, temperature.start)? {
            SweepOutcome::OneAxis(sweep) => Ok(sweep),
            SweepOutcome::Grid(_) => Err(AppError::Request(
                "temperature sweep produced a grid".to_string(),
            )),
        }
    }

    pub fn grid_sweep(&self, request: &SweepRequest) -> AppResult<GridSweep> {
        let defaults = &self.config().sweep_defaults;
        let temperature = request
            .temperature_range()?
            .unwrap_or(defaults.grid_temperature);
        let pressure = request.pressure_range()?.unwrap_or(defaults.grid_pressure);
        let plan = SweepPlan::Grid {
            temperature,
            pressure,
        };
        match self.run(request, plan, temperature.start)? {
            SweepOutcome::Grid(grid) => Ok(grid),
            SweepOutcome::OneAxis(_) => Err(AppError::Request(
                "grid sweep produced a single axis".to_string(),
            )),
        }
    }

    pub fn list_models(&self) -> Vec<ModelInfo> {
        registered_models()
    }

    /// Solver deck an equilibrium model would run for the request.
    pub fn render_deck(&self, request: &StateRequest) -> AppResult<Deck> {
        let state = request.to_state()?;
        Ok(self.dispatcher.render_deck(&state)?)
    }

    fn run(
        &self,
        request: &SweepRequest,
        plan: SweepPlan,
        composition_temperature_k: f64,
    ) -> AppResult<SweepOutcome> {
        let composition = request.composition(composition_temperature_k)?;
        let mut spec = SweepSpec::new(plan, request.model.clone(), composition);
        if let Some(rock) = request.minerals()? {
            spec = spec.with_minerals(rock);
        }
        Ok(self.dispatcher.sweep(&spec)?)
    }
}

/// The value of an axis that a one-axis sweep holds fixed.
fn fixed_axis(range: Option<SweepRange>, what: &str) -> AppResult<f64> {
    range
        .map(|r| r.start)
        .ok_or_else(|| AppError::InvalidInput(format!("sweep needs a fixed {}", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AxisInput;

    fn service() -> Service {
        Service::new(SolverConfig {
            max_workers: 2,
            ..SolverConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn pressure_sweep_needs_temperature() {
        let err = service()
            .pressure_sweep(&SweepRequest::new("duan_sun"))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn analytic_pressure_sweep_uses_default_range() {
        let request = SweepRequest::new("duan_sun").with_temperature(AxisInput::Value(323.15));
        let sweep = service().pressure_sweep(&request).unwrap();
        assert_eq!(sweep.points.len(), 50);
        assert_eq!(sweep.num_failed(), 0);
        let co2 = sweep.dissolved_co2();
        assert!(co2[10] > co2[0]);
    }

    #[test]
    fn brine_rock_requires_minerals() {
        let err = service()
            .brine_rock_properties(&StateRequest::new(300.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn fixed_state_without_minerals_has_no_deltas() {
        let mut request = StateRequest::new(323.15, 10.0);
        request.model = "duan_sun_2006".into();
        let response = service().fixed_state(&request).unwrap();
        assert!((response.dissolved_co2 - 1.13248).abs() < 1e-3);
        assert!(response.mineral_deltas.is_none());
    }
}
