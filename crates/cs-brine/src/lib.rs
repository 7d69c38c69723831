//! cs-brine: CO2 solubility in brines, with optional rock-mineral interaction.
//!
//! Provides:
//! - Canonical inputs: ions, solution composition, mineral assemblages, unit normalization
//! - `SolubilityModel` trait with one backend per `ModelId`
//! - PHREEQC backend (deck templating, subprocess runner, selected-output parsing)
//! - Duan & Sun analytic backend
//! - Single-state, one-axis and grid sweeps on a bounded worker pool
//!
//! # Architecture
//!
//! Callers go through [`Dispatcher`], which resolves a model identifier against
//! the static registry, applies the configured unknown-model policy and forwards
//! to the backend. Every backend returns the same [`SimulationResult`] shape.
//! Sweep points never fail the sweep; a failed point is recorded as zero with a
//! `Failed` status.
//!
//! # Example
//!
//! ```no_run
//! use cs_brine::{Dispatcher, SimulationState, SolutionComposition, SolverConfig};
//!
//! let dispatcher = Dispatcher::new(SolverConfig::default())?;
//! let state = SimulationState::new(
//!     323.15,
//!     10.0,
//!     SolutionComposition::pure_water(),
//!     "duan_sun_2006",
//! )?;
//! let result = dispatcher.single_state(&state)?;
//! println!("CO2: {} mol/kgw", result.dissolved_co2);
//! # Ok::<(), cs_brine::BrineError>(())
//! ```

pub mod cancel;
pub mod composition;
pub mod config;
pub mod deck;
pub mod duan_sun;
pub mod error;
pub mod ions;
pub mod minerals;
pub mod model;
pub mod phreeqc;
pub mod placeholder;
pub mod registry;
pub mod result;
pub mod runner;
pub mod selected_output;
pub mod state;
pub mod sweep_executor;
pub mod sweeps;
pub mod tracker;
pub mod units;

pub use cancel::CancelToken;
pub use composition::SolutionComposition;
pub use config::{SolverConfig, SweepDefaults, UnknownModelPolicy};
pub use deck::{Deck, DeckBuilder, DeckKind, SolverDatabase};
pub use duan_sun::DuanSunModel;
pub use error::{BrineError, BrineResult};
pub use ions::Ion;
pub use minerals::{Mineral, MineralAssemblage};
pub use model::{ModelId, RunContext, SolubilityModel};
pub use phreeqc::EquilibriumModel;
pub use placeholder::PlaceholderModel;
pub use registry::{Dispatcher, ModelInfo, SweepOutcome, registered_models, resolve};
pub use result::{
    GridCell, GridSweep, MineralChange, PointStatus, SimulationResult, SpeciesDatum, Sweep1D,
    SweepPoint,
};
pub use state::SimulationState;
pub use sweep_executor::SweepExecutor;
pub use sweeps::{SweepAxis, SweepKind, SweepPlan, SweepRange, SweepSpec};
pub use units::{
    ConcentrationUnit, MineralogyUnit, PressureUnit, Quantity, TemperatureUnit, UnitError,
};
