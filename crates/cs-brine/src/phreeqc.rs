//! Equilibrium-solver backend (PHREEQC).
//!
//! Single states render a deck, run the solver once and read the final row.
//! Pressure sweeps use the solver's own pressure ramp so the whole axis costs one
//! invocation; if that run fails the sweep is redone point by point.

use crate::config::SolverConfig;
use crate::deck::{DeckBuilder, SolverDatabase};
use crate::error::{BrineError, BrineResult};
use crate::model::{ModelId, RunContext, SolubilityModel};
use crate::result::{SimulationResult, Sweep1D, SweepPoint};
use crate::runner::ProcessRunner;
use crate::selected_output::{RampRow, SelectedOutput, final_state, ramp_rows};
use crate::state::SimulationState;
use crate::sweep_executor::{CANCELLED_MESSAGE, run_points};
use crate::sweeps::SweepAxis;
use crate::tracker::mineral_changes;
use tracing::{debug, warn};

pub struct EquilibriumModel {
    id: ModelId,
    database: SolverDatabase,
    decks: DeckBuilder,
    runner: ProcessRunner,
}

impl EquilibriumModel {
    pub fn new(id: ModelId, database: SolverDatabase, config: &SolverConfig) -> Self {
        Self {
            id,
            database,
            decks: DeckBuilder::new(config.database_dir.clone(), config.template_dir.clone()),
            runner: ProcessRunner::from_config(config),
        }
    }

    /// `phreeqc.dat` model.
    pub fn primary(config: &SolverConfig) -> Self {
        Self::new(ModelId::EquilibriumPrimary, SolverDatabase::Phreeqc, config)
    }

    /// `pitzer.dat` model.
    pub fn extended(config: &SolverConfig) -> Self {
        Self::new(ModelId::EquilibriumExtended, SolverDatabase::Pitzer, config)
    }

    pub fn database(&self) -> SolverDatabase {
        self.database
    }

    pub fn decks(&self) -> &DeckBuilder {
        &self.decks
    }

    fn native_pressure_ramp(
        &self,
        base: &SimulationState,
        pressures_mpa: &[f64],
        ctx: &RunContext,
    ) -> BrineResult<Vec<RampRow>> {
        let seed = base.at(base.temperature_k, pressures_mpa[0]);
        let deck = self
            .decks
            .build_pressure_ramp(self.database, &seed, pressures_mpa)?;
        let table = self.runner.run(&deck, &ctx.cancel)?;
        Ok(ramp_rows(&SelectedOutput::parse(&table)))
    }
}

/// Largest gap between a reported and a requested pressure that still pairs
/// them [MPa]; ramp rows report pressure rounded to 0.01 MPa.
const RAMP_PRESSURE_TOLERANCE_MPA: f64 = 0.01;

/// Pair ramp rows with requested pressures by the pressure each row reports.
///
/// Initial-solution rows are skipped. Every other row goes to the nearest
/// requested step within tolerance, a later row replacing an earlier one. Rows
/// with no pressure or no matching step are dropped; steps left without a row fail.
fn pair_ramp_rows(pressures_mpa: &[f64], rows: &[RampRow]) -> Vec<SweepPoint> {
    let mut matched: Vec<Option<f64>> = vec![None; pressures_mpa.len()];
    for row in rows.iter().filter(|r| !r.initial) {
        match row.pressure_mpa.and_then(|p| nearest_step(pressures_mpa, p)) {
            Some(k) => matched[k] = Some(row.dissolved_co2),
            None => debug!(
                pressure_mpa = ?row.pressure_mpa,
                "Ramp row matches no requested pressure; dropped"
            ),
        }
    }
    pressures_mpa
        .iter()
        .zip(matched)
        .map(|(p, co2)| match co2 {
            Some(c) => SweepPoint::computed(*p, c),
            None => {
                warn!(pressure_mpa = *p, "No solver row for pressure step; recording zero");
                SweepPoint::failed(*p, "solver wrote no row for this pressure step")
            }
        })
        .collect()
}

fn nearest_step(pressures_mpa: &[f64], reported_mpa: f64) -> Option<usize> {
    pressures_mpa
        .iter()
        .enumerate()
        .map(|(k, p)| (k, (p - reported_mpa).abs()))
        .filter(|(_, gap)| *gap <= RAMP_PRESSURE_TOLERANCE_MPA)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(k, _)| k)
}

impl SolubilityModel for EquilibriumModel {
    fn id(&self) -> ModelId {
        self.id
    }

    fn single_state(
        &self,
        state: &SimulationState,
        ctx: &RunContext,
    ) -> BrineResult<SimulationResult> {
        let deck = self.decks.build(self.database, state)?;
        let text = self.runner.run(&deck, &ctx.cancel)?;
        let table = SelectedOutput::parse(&text);
        debug!(rows = table.len(), "Parsed selected output");

        let mut result = final_state(&table);
        if let Some(minerals) = &state.minerals {
            result.minerals = Some(mineral_changes(minerals, table.last_row().as_ref()));
        }
        Ok(result)
    }

    fn pressure_sweep(
        &self,
        base: &SimulationState,
        pressures_mpa: &[f64],
        ctx: &RunContext,
    ) -> Sweep1D {
        if pressures_mpa.is_empty() {
            return Sweep1D::empty(SweepAxis::Pressure);
        }
        match self.native_pressure_ramp(base, pressures_mpa, ctx) {
            Ok(rows) => Sweep1D::new(SweepAxis::Pressure, pair_ramp_rows(pressures_mpa, &rows)),
            Err(BrineError::Cancelled) => Sweep1D::new(
                SweepAxis::Pressure,
                pressures_mpa
                    .iter()
                    .map(|p| SweepPoint::failed(*p, CANCELLED_MESSAGE))
                    .collect(),
            ),
            Err(e) => {
                warn!(model = %self.id, error = %e, "Native pressure ramp failed; running points individually");
                let states = pressures_mpa
                    .iter()
                    .map(|p| (*p, base.at(base.temperature_k, *p)))
                    .collect();
                Sweep1D::new(SweepAxis::Pressure, run_points(self, states, ctx))
            }
        }
    }
}
