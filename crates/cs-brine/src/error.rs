//! Simulation errors.

use crate::units::UnitError;
use cs_core::CoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for simulation operations.
pub type BrineResult<T> = Result<T, BrineError>;

/// Errors that can surface from a single-state simulation.
///
/// Sweeps never return these for individual points; failed points are recorded
/// in the sweep result instead.
#[derive(Error, Debug)]
pub enum BrineError {
    /// Invalid caller input (negative molality, unknown ion label, ...).
    #[error("Invalid input: {what}")]
    InvalidInput { what: String },

    /// Value outside the validity range of a backend.
    #[error("Value out of range for {what}: {value}")]
    OutOfRange { what: &'static str, value: f64 },

    /// Model identifier not in the registry and the policy is `reject`.
    #[error("Unknown model identifier: {id}")]
    UnknownModel { id: String },

    /// Model does not support the requested kind of simulation.
    #[error("Model {model} does not support {what}")]
    UnsupportedCombination { model: &'static str, what: &'static str },

    /// Solver template missing, unreadable, or failing schema validation.
    #[error("Template error ({kind}): {message}")]
    Template { kind: &'static str, message: String },

    /// External solver could not be started or produced no output.
    #[error("Backend execution failed: {message}")]
    BackendExecution { message: String },

    /// External solver exceeded its time budget and was killed.
    #[error("Backend timed out after {secs} s")]
    Timeout { secs: u64 },

    /// The caller cancelled the run.
    #[error("Run cancelled")]
    Cancelled,

    /// Sweep range rejected before any work was done.
    #[error("Invalid sweep: {what}")]
    InvalidSweep { what: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl BrineError {
    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        Self::InvalidInput { what: what.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = BrineError::BackendExecution {
            message: "output file not found".into(),
        };
        assert!(err.to_string().contains("output file not found"));

        let err = BrineError::UnsupportedCombination {
            model: "analytic_correlation",
            what: "mineral interaction",
        };
        assert!(err.to_string().contains("analytic_correlation"));
    }

    #[test]
    fn core_error_converts() {
        let core = CoreError::NonFinite {
            what: "temperature",
            value: f64::NAN,
        };
        let err: BrineError = core.into();
        assert!(matches!(err, BrineError::Core(_)));
    }
}
