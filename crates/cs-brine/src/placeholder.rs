//! Placeholder backend for the CarbonEx model slot.

use crate::error::{BrineError, BrineResult};
use crate::model::{ModelId, RunContext, SolubilityModel};
use crate::result::SimulationResult;
use crate::state::SimulationState;

/// Dissolved CO2 reported for every point [mol/kgw].
pub const SENTINEL_DISSOLVED_CO2: f64 = 3.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderModel;

impl SolubilityModel for PlaceholderModel {
    fn id(&self) -> ModelId {
        ModelId::Placeholder
    }

    fn single_state(
        &self,
        state: &SimulationState,
        _ctx: &RunContext,
    ) -> BrineResult<SimulationResult> {
        if state.is_brine_rock() {
            return Err(BrineError::UnsupportedCombination {
                model: self.id().canonical_name(),
                what: "mineral interaction",
            });
        }
        Ok(SimulationResult::with_dissolved_co2(SENTINEL_DISSOLVED_CO2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::SolutionComposition;

    #[test]
    fn sentinel_everywhere() {
        let base =
            SimulationState::new(300.0, 1.0, SolutionComposition::pure_water(), "carbonex").unwrap();
        let sweep = PlaceholderModel.pressure_sweep(&base, &[1.0, 2.0, 3.0], &RunContext::new());
        assert_eq!(sweep.dissolved_co2(), vec![3.0, 3.0, 3.0]);
        let single = PlaceholderModel.single_state(&base, &RunContext::new()).unwrap();
        assert_eq!(single.dissolved_co2, SENTINEL_DISSOLVED_CO2);
    }
}
