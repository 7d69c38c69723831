//! Canonical simulation state.

use crate::composition::SolutionComposition;
use crate::error::BrineResult;
use crate::minerals::MineralAssemblage;
use cs_core::{ensure_finite, kelvin_to_celsius, mpa_to_atm, mpa_to_bar};
use serde::{Deserialize, Serialize};

/// Share of the gas-phase pressure assigned to CO2 in solver decks.
pub const CO2_GAS_FRACTION: f64 = 0.95;

/// Share of the gas-phase pressure assigned to water vapour in solver decks.
pub const H2O_GAS_FRACTION: f64 = 0.05;

/// One thermodynamic state to simulate, in canonical units.
///
/// No physical range is enforced here; backends reject states they cannot handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Temperature [K]
    pub temperature_k: f64,
    /// Total pressure [MPa]
    pub pressure_mpa: f64,
    #[serde(default)]
    pub composition: SolutionComposition,
    /// Rock assemblage; `None` for brine-only runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minerals: Option<MineralAssemblage>,
    /// Model identifier as supplied by the caller.
    pub model: String,
}

impl SimulationState {
    pub fn new(
        temperature_k: f64,
        pressure_mpa: f64,
        composition: SolutionComposition,
        model: impl Into<String>,
    ) -> BrineResult<Self> {
        ensure_finite(temperature_k, "temperature")?;
        ensure_finite(pressure_mpa, "pressure")?;
        Ok(Self {
            temperature_k,
            pressure_mpa,
            composition,
            minerals: None,
            model: model.into(),
        })
    }

    pub fn with_minerals(mut self, minerals: MineralAssemblage) -> Self {
        self.minerals = Some(minerals);
        self
    }

    /// Copy of this state at another temperature and pressure.
    pub fn at(&self, temperature_k: f64, pressure_mpa: f64) -> Self {
        Self {
            temperature_k,
            pressure_mpa,
            ..self.clone()
        }
    }

    /// True when the run involves rock minerals.
    pub fn is_brine_rock(&self) -> bool {
        self.minerals.is_some()
    }

    pub fn temperature_c(&self) -> f64 {
        kelvin_to_celsius(self.temperature_k)
    }

    pub fn pressure_atm(&self) -> f64 {
        mpa_to_atm(self.pressure_mpa)
    }

    pub fn pressure_bar(&self) -> f64 {
        mpa_to_bar(self.pressure_mpa)
    }

    /// CO2 partial pressure assigned in the solver gas phase [atm].
    pub fn p_co2_atm(&self) -> f64 {
        CO2_GAS_FRACTION * self.pressure_atm()
    }

    /// Water vapour partial pressure assigned in the solver gas phase [atm].
    pub fn p_h2o_atm(&self) -> f64 {
        H2O_GAS_FRACTION * self.pressure_atm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BrineError;

    #[test]
    fn native_unit_views() {
        let state =
            SimulationState::new(298.15, 10.0, SolutionComposition::pure_water(), "phreeqc")
                .unwrap();
        assert!((state.temperature_c() - 25.0).abs() < 1e-9);
        assert!((state.pressure_atm() - 98.6923).abs() < 1e-9);
        assert!((state.p_co2_atm() + state.p_h2o_atm() - state.pressure_atm()).abs() < 1e-9);
        assert!((state.pressure_bar() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn physically_odd_states_pass_through() {
        assert!(SimulationState::new(10.0, 0.0, SolutionComposition::pure_water(), "x").is_ok());
    }

    #[test]
    fn non_finite_inputs_rejected() {
        let err = SimulationState::new(f64::NAN, 1.0, SolutionComposition::pure_water(), "x")
            .unwrap_err();
        assert!(matches!(err, BrineError::Core(_)));
    }

    #[test]
    fn at_keeps_composition_and_model() {
        let state =
            SimulationState::new(300.0, 1.0, SolutionComposition::pure_water(), "pitzer").unwrap();
        let moved = state.at(350.0, 5.0);
        assert_eq!(moved.model, "pitzer");
        assert_eq!(moved.temperature_k, 350.0);
        assert_eq!(moved.pressure_mpa, 5.0);
    }
}
