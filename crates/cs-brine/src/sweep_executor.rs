//! Sweep execution on a bounded worker pool.
//!
//! Points form an explicit work-list evaluated with rayon; results come back in
//! input order. A failing point is logged and recorded as a zero with `Failed`
//! status, it never aborts the sweep. Once the cancel token fires, every point
//! not yet started is recorded as failed.

use crate::error::{BrineError, BrineResult};
use crate::model::{RunContext, SolubilityModel};
use crate::result::{GridCell, GridSweep, Sweep1D, SweepPoint};
use crate::state::SimulationState;
use crate::sweeps::SweepRange;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{Span, warn};

/// Upper bound on grid cells per sweep.
pub const MAX_GRID_CELLS: usize = 1_000_000;

/// Message recorded for points skipped after cancellation.
pub const CANCELLED_MESSAGE: &str = "cancelled";

/// Evaluate one point, capturing failure instead of propagating it.
pub fn evaluate_point<M: SolubilityModel + ?Sized>(
    model: &M,
    value: f64,
    state: &SimulationState,
    ctx: &RunContext,
) -> SweepPoint {
    if ctx.cancel.is_cancelled() {
        return SweepPoint::failed(value, CANCELLED_MESSAGE);
    }
    match model.single_state(state, ctx) {
        Ok(result) => SweepPoint::computed(value, result.dissolved_co2),
        Err(e) => {
            warn!(
                model = %model.id(),
                value,
                temperature_k = state.temperature_k,
                pressure_mpa = state.pressure_mpa,
                error = %e,
                "Sweep point failed; recording zero"
            );
            SweepPoint::failed(value, e.to_string())
        }
    }
}

/// Evaluate `(axis value, state)` pairs in parallel on the current rayon pool.
pub fn run_points<M: SolubilityModel + ?Sized>(
    model: &M,
    states: Vec<(f64, SimulationState)>,
    ctx: &RunContext,
) -> Vec<SweepPoint> {
    let span = Span::current();
    states
        .into_par_iter()
        .map(|(value, state)| {
            let _entered = span.enter();
            evaluate_point(model, value, &state, ctx)
        })
        .collect()
}

/// Owns the worker pool sweeps run on.
pub struct SweepExecutor {
    pool: ThreadPool,
}

impl SweepExecutor {
    /// Pool with `max_workers` threads (at least one).
    pub fn new(max_workers: usize) -> BrineResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(max_workers.max(1))
            .thread_name(|i| format!("cs-sweep-{}", i))
            .build()
            .map_err(|e| BrineError::BackendExecution {
                message: format!("failed to start sweep workers: {}", e),
            })?;
        Ok(Self { pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Pressure sweep at the base state's temperature.
    ///
    /// Fails only when the range is invalid; point failures stay in the result.
    pub fn pressure_sweep(
        &self,
        model: &dyn SolubilityModel,
        base: &SimulationState,
        range: &SweepRange,
        ctx: &RunContext,
    ) -> BrineResult<Sweep1D> {
        let pressures = range.values()?;
        Ok(self
            .pool
            .install(|| model.pressure_sweep(base, &pressures, ctx)))
    }

    /// Temperature sweep at the base state's pressure.
    pub fn temperature_sweep(
        &self,
        model: &dyn SolubilityModel,
        base: &SimulationState,
        range: &SweepRange,
        ctx: &RunContext,
    ) -> BrineResult<Sweep1D> {
        let temperatures = range.values()?;
        Ok(self
            .pool
            .install(|| model.temperature_sweep(base, &temperatures, ctx)))
    }

    /// Temperature × pressure grid; cell `(i, j)` is `temperatures[i]`, `pressures[j]`.
    pub fn grid_sweep(
        &self,
        model: &dyn SolubilityModel,
        base: &SimulationState,
        temperature: &SweepRange,
        pressure: &SweepRange,
        ctx: &RunContext,
    ) -> BrineResult<GridSweep> {
        let temperatures = temperature.values()?;
        let pressures = pressure.values()?;
        let total = temperatures.len() * pressures.len();
        if total > MAX_GRID_CELLS {
            return Err(BrineError::InvalidSweep {
                what: format!("grid of {} cells exceeds {}", total, MAX_GRID_CELLS),
            });
        }

        let work: Vec<(usize, usize)> = (0..temperatures.len())
            .flat_map(|i| (0..pressures.len()).map(move |j| (i, j)))
            .collect();

        let span = Span::current();
        let cells = self.pool.install(|| {
            work.into_par_iter()
                .map(|(i, j)| {
                    let _entered = span.enter();
                    let state = base.at(temperatures[i], pressures[j]);
                    let point = evaluate_point(model, pressures[j], &state, ctx);
                    GridCell {
                        i,
                        j,
                        dissolved_co2: point.dissolved_co2,
                        status: point.status,
                    }
                })
                .collect()
        });

        Ok(GridSweep {
            temperatures,
            pressures,
            cells,
        })
    }
}
