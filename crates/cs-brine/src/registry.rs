//! Model registry and dispatcher.
//!
//! The registry maps every accepted identifier (canonical names and legacy
//! aliases) to a [`ModelId`]. It is built once on first use and never mutated.
//! The [`Dispatcher`] owns one backend per `ModelId` plus the sweep worker pool
//! and applies the configured [`UnknownModelPolicy`].

use crate::config::{SolverConfig, UnknownModelPolicy};
use crate::deck::Deck;
use crate::duan_sun::DuanSunModel;
use crate::error::{BrineError, BrineResult};
use crate::model::{ModelId, RunContext, SolubilityModel};
use crate::phreeqc::EquilibriumModel;
use crate::placeholder::PlaceholderModel;
use crate::result::{GridSweep, SimulationResult, Sweep1D};
use crate::state::SimulationState;
use crate::sweep_executor::SweepExecutor;
use crate::sweeps::{SweepAxis, SweepPlan, SweepSpec};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{info, info_span, warn};

static REGISTRY: LazyLock<HashMap<&'static str, ModelId>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    for id in ModelId::ALL {
        map.insert(id.canonical_name(), id);
        for alias in id.aliases() {
            map.insert(*alias, id);
        }
    }
    map
});

/// Look up a model identifier (case-insensitive, surrounding whitespace ignored).
pub fn resolve(identifier: &str) -> Option<ModelId> {
    REGISTRY
        .get(identifier.trim().to_ascii_lowercase().as_str())
        .copied()
}

/// Description of one registered model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub id: ModelId,
    pub aliases: Vec<&'static str>,
    pub supports_minerals: bool,
    pub description: &'static str,
}

pub fn registered_models() -> Vec<ModelInfo> {
    ModelId::ALL
        .iter()
        .map(|id| ModelInfo {
            id: *id,
            aliases: id.aliases().to_vec(),
            supports_minerals: id.supports_minerals(),
            description: id.description(),
        })
        .collect()
}

/// Result of a sweep request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SweepOutcome {
    OneAxis(Sweep1D),
    Grid(GridSweep),
}

impl SweepOutcome {
    pub fn num_failed(&self) -> usize {
        match self {
            SweepOutcome::OneAxis(sweep) => sweep.num_failed(),
            SweepOutcome::Grid(grid) => grid.num_failed(),
        }
    }
}

/// Routes simulation requests to backends.
pub struct Dispatcher {
    config: SolverConfig,
    primary: EquilibriumModel,
    extended: EquilibriumModel,
    analytic: DuanSunModel,
    placeholder: PlaceholderModel,
    executor: SweepExecutor,
}

impl Dispatcher {
    pub fn new(config: SolverConfig) -> BrineResult<Self> {
        Ok(Self {
            primary: EquilibriumModel::primary(&config),
            extended: EquilibriumModel::extended(&config),
            analytic: DuanSunModel,
            placeholder: PlaceholderModel,
            executor: SweepExecutor::new(config.workers())?,
            config,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn model(&self, id: ModelId) -> &dyn SolubilityModel {
        match id {
            ModelId::EquilibriumPrimary => &self.primary,
            ModelId::EquilibriumExtended => &self.extended,
            ModelId::AnalyticCorrelation => &self.analytic,
            ModelId::Placeholder => &self.placeholder,
        }
    }

    /// Model for a single-state call; unknown identifiers follow the policy.
    pub fn resolve_single(&self, identifier: &str) -> BrineResult<ModelId> {
        if let Some(id) = resolve(identifier) {
            return Ok(id);
        }
        match self.config.unknown_model {
            UnknownModelPolicy::Legacy | UnknownModelPolicy::Fallback => {
                warn!(
                    identifier,
                    fallback = %ModelId::EquilibriumPrimary,
                    "Unknown model identifier; falling back"
                );
                Ok(ModelId::EquilibriumPrimary)
            }
            UnknownModelPolicy::Reject => Err(BrineError::UnknownModel {
                id: identifier.to_string(),
            }),
        }
    }

    /// Model for a sweep; `None` means "return an empty result".
    pub fn resolve_sweep(&self, identifier: &str) -> BrineResult<Option<ModelId>> {
        if let Some(id) = resolve(identifier) {
            return Ok(Some(id));
        }
        match self.config.unknown_model {
            UnknownModelPolicy::Legacy => {
                warn!(identifier, "Unknown model identifier; returning empty sweep");
                Ok(None)
            }
            UnknownModelPolicy::Fallback => {
                warn!(
                    identifier,
                    fallback = %ModelId::EquilibriumPrimary,
                    "Unknown model identifier; falling back"
                );
                Ok(Some(ModelId::EquilibriumPrimary))
            }
            UnknownModelPolicy::Reject => Err(BrineError::UnknownModel {
                id: identifier.to_string(),
            }),
        }
    }

    fn check_minerals(id: ModelId, brine_rock: bool) -> BrineResult<()> {
        if brine_rock && !id.supports_minerals() {
            return Err(BrineError::UnsupportedCombination {
                model: id.canonical_name(),
                what: "mineral interaction",
            });
        }
        Ok(())
    }

    pub fn single_state(&self, state: &SimulationState) -> BrineResult<SimulationResult> {
        self.single_state_with(state, &RunContext::new())
    }

    pub fn single_state_with(
        &self,
        state: &SimulationState,
        ctx: &RunContext,
    ) -> BrineResult<SimulationResult> {
        let span = info_span!("single_state", run_id = %ctx.run_id, model = %state.model);
        let _entered = span.enter();

        let id = self.resolve_single(&state.model)?;
        Self::check_minerals(id, state.is_brine_rock())?;
        info!(
            model = %id,
            temperature_k = state.temperature_k,
            pressure_mpa = state.pressure_mpa,
            brine_rock = state.is_brine_rock(),
            "Simulating single state"
        );
        let result = self.model(id).single_state(state, ctx)?;
        info!(dissolved_co2 = result.dissolved_co2, ph = result.ph, "Single state done");
        Ok(result)
    }

    pub fn sweep(&self, spec: &SweepSpec) -> BrineResult<SweepOutcome> {
        self.sweep_with(spec, &RunContext::new())
    }

    /// Run a sweep. Fails only on invalid ranges, rejected identifiers and
    /// unsupported model/mineral combinations; point failures stay in the result.
    pub fn sweep_with(&self, spec: &SweepSpec, ctx: &RunContext) -> BrineResult<SweepOutcome> {
        let span = info_span!("sweep", run_id = %ctx.run_id, kind = ?spec.kind(), model = %spec.model);
        let _entered = span.enter();

        spec.plan.validate()?;
        let Some(id) = self.resolve_sweep(&spec.model)? else {
            return Ok(empty_outcome(&spec.plan));
        };
        Self::check_minerals(id, spec.minerals.is_some())?;
        let model = self.model(id);

        info!(model = %id, workers = self.executor.workers(), "Starting sweep");
        let outcome = match &spec.plan {
            SweepPlan::Pressure {
                temperature_k,
                pressure,
            } => {
                let base = spec.state_at(*temperature_k, pressure.start);
                SweepOutcome::OneAxis(self.executor.pressure_sweep(model, &base, pressure, ctx)?)
            }
            SweepPlan::Temperature {
                pressure_mpa,
                temperature,
            } => {
                let base = spec.state_at(temperature.start, *pressure_mpa);
                SweepOutcome::OneAxis(
                    self.executor
                        .temperature_sweep(model, &base, temperature, ctx)?,
                )
            }
            SweepPlan::Grid {
                temperature,
                pressure,
            } => {
                let base = spec.state_at(temperature.start, pressure.start);
                SweepOutcome::Grid(
                    self.executor
                        .grid_sweep(model, &base, temperature, pressure, ctx)?,
                )
            }
        };
        info!(failed = outcome.num_failed(), "Sweep done");
        Ok(outcome)
    }

    /// Solver deck an equilibrium model would run for `state`.
    pub fn render_deck(&self, state: &SimulationState) -> BrineResult<Deck> {
        let id = self.resolve_single(&state.model)?;
        let model = match id {
            ModelId::EquilibriumPrimary => &self.primary,
            ModelId::EquilibriumExtended => &self.extended,
            other => {
                return Err(BrineError::UnsupportedCombination {
                    model: other.canonical_name(),
                    what: "solver decks",
                });
            }
        };
        model.decks().build(model.database(), state)
    }
}

fn empty_outcome(plan: &SweepPlan) -> SweepOutcome {
    match plan {
        SweepPlan::Pressure { .. } => SweepOutcome::OneAxis(Sweep1D::empty(SweepAxis::Pressure)),
        SweepPlan::Temperature { .. } => {
            SweepOutcome::OneAxis(Sweep1D::empty(SweepAxis::Temperature))
        }
        SweepPlan::Grid { .. } => SweepOutcome::Grid(GridSweep::empty()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::SolutionComposition;
    use crate::minerals::{Mineral, MineralAssemblage};
    use crate::placeholder::SENTINEL_DISSOLVED_CO2;
    use crate::sweeps::SweepRange;

    fn dispatcher(policy: UnknownModelPolicy) -> Dispatcher {
        Dispatcher::new(SolverConfig {
            unknown_model: policy,
            max_workers: 2,
            ..SolverConfig::default()
        })
        .unwrap()
    }

    fn pressure_spec(model: &str) -> SweepSpec {
        SweepSpec::new(
            SweepPlan::Pressure {
                temperature_k: 323.15,
                pressure: SweepRange::new(1.0, 5.0, 1.0),
            },
            model,
            SolutionComposition::pure_water(),
        )
    }

    #[test]
    fn identifiers_resolve() {
        assert_eq!(resolve("phreeqc_phreeqc"), Some(ModelId::EquilibriumPrimary));
        assert_eq!(resolve("PHREEQC_PITZER"), Some(ModelId::EquilibriumExtended));
        assert_eq!(resolve(" duan_sun_2006 "), Some(ModelId::AnalyticCorrelation));
        assert_eq!(resolve("carbonex"), Some(ModelId::Placeholder));
        assert_eq!(resolve("analytic_correlation"), Some(ModelId::AnalyticCorrelation));
        assert_eq!(resolve("nope"), None);
    }

    #[test]
    fn legacy_policy_is_asymmetric() {
        let d = dispatcher(UnknownModelPolicy::Legacy);
        assert_eq!(d.resolve_single("nope").unwrap(), ModelId::EquilibriumPrimary);
        let outcome = d.sweep(&pressure_spec("nope")).unwrap();
        assert!(matches!(outcome, SweepOutcome::OneAxis(ref s) if s.is_empty()));
    }

    #[test]
    fn fallback_policy_falls_back_everywhere() {
        let d = dispatcher(UnknownModelPolicy::Fallback);
        assert_eq!(d.resolve_single("nope").unwrap(), ModelId::EquilibriumPrimary);
        assert_eq!(d.resolve_sweep("nope").unwrap(), Some(ModelId::EquilibriumPrimary));
    }

    #[test]
    fn reject_policy_fails() {
        let d = dispatcher(UnknownModelPolicy::Reject);
        assert!(matches!(
            d.resolve_single("nope"),
            Err(BrineError::UnknownModel { .. })
        ));
        assert!(matches!(
            d.sweep(&pressure_spec("nope")),
            Err(BrineError::UnknownModel { .. })
        ));
    }

    #[test]
    fn placeholder_sweep_is_sentinel() {
        let d = dispatcher(UnknownModelPolicy::Legacy);
        let SweepOutcome::OneAxis(sweep) = d.sweep(&pressure_spec("carbonex")).unwrap() else {
            panic!("expected one-axis sweep");
        };
        assert_eq!(sweep.points.len(), 5);
        assert!(sweep.dissolved_co2().iter().all(|c| *c == SENTINEL_DISSOLVED_CO2));
    }

    #[test]
    fn analytic_with_minerals_is_unsupported() {
        let d = dispatcher(UnknownModelPolicy::Legacy);
        let rock = MineralAssemblage::new([(Mineral::Calcite, 1.0)]).unwrap();
        let spec = pressure_spec("duan_sun_2006").with_minerals(rock.clone());
        assert!(matches!(
            d.sweep(&spec),
            Err(BrineError::UnsupportedCombination { .. })
        ));
        let state = SimulationState::new(300.0, 1.0, SolutionComposition::pure_water(), "carbonex")
            .unwrap()
            .with_minerals(rock);
        assert!(matches!(
            d.single_state(&state),
            Err(BrineError::UnsupportedCombination { .. })
        ));
    }

    #[test]
    fn invalid_range_wins_over_unknown_model() {
        let d = dispatcher(UnknownModelPolicy::Legacy);
        let spec = SweepSpec::new(
            SweepPlan::Pressure {
                temperature_k: 300.0,
                pressure: SweepRange::new(5.0, 1.0, 1.0),
            },
            "nope",
            SolutionComposition::pure_water(),
        );
        assert!(matches!(d.sweep(&spec), Err(BrineError::InvalidSweep { .. })));
    }

    #[test]
    fn analytic_grid() {
        let d = dispatcher(UnknownModelPolicy::Legacy);
        let spec = SweepSpec::new(
            SweepPlan::Grid {
                temperature: SweepRange::new(300.0, 320.0, 10.0),
                pressure: SweepRange::new(5.0, 10.0, 5.0),
            },
            "duan_sun",
            SolutionComposition::pure_water(),
        );
        let SweepOutcome::Grid(grid) = d.sweep(&spec).unwrap() else {
            panic!("expected grid");
        };
        assert_eq!(grid.cells.len(), 6);
        assert_eq!(grid.num_failed(), 0);
        assert!(grid.cells.iter().all(|c| c.dissolved_co2 > 0.0));
    }

    #[test]
    fn decks_only_for_equilibrium_models() {
        let d = dispatcher(UnknownModelPolicy::Legacy);
        let state =
            SimulationState::new(300.0, 1.0, SolutionComposition::pure_water(), "pitzer").unwrap();
        let deck = d.render_deck(&state).unwrap();
        assert!(deck.script.contains("pitzer.dat"));
        let analytic = state.at(300.0, 1.0);
        let analytic = SimulationState {
            model: "duan_sun".into(),
            ..analytic
        };
        assert!(d.render_deck(&analytic).is_err());
    }

    #[test]
    fn registered_models_cover_all_ids() {
        let models = registered_models();
        assert_eq!(models.len(), 4);
        assert!(models.iter().any(|m| m.aliases.contains(&"duan_sun_2006")));
    }
}
