//! Shared application service layer for carbosol.
//!
//! Frontends hand this crate requests in user units; it loads the solver
//! configuration, normalizes the requests and forwards them to the simulation
//! core in `cs-brine`.

pub mod config;
pub mod error;
pub mod request;
pub mod service;

pub use config::{load_config, load_config_with};
pub use error::{AppError, AppResult};
pub use request::{
    AxisInput, DEFAULT_MODEL, QuantityInput, RequestUnits, SampleRequest, StateRequest,
    SweepRequest, load_request,
};
pub use service::{FixedStateResponse, Service};
