//! Sweep definitions: axes, inclusive ranges and sweep plans.

use crate::composition::SolutionComposition;
use crate::error::{BrineError, BrineResult};
use crate::minerals::MineralAssemblage;
use crate::state::SimulationState;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound on the number of points a single range may generate.
pub const MAX_RANGE_POINTS: usize = 100_000;

/// Slack added before flooring the step count so `end` survives rounding.
const STEP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepAxis {
    /// Canonical unit: MPa
    Pressure,
    /// Canonical unit: K
    Temperature,
}

impl SweepAxis {
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Pressure => "MPa",
            Self::Temperature => "K",
        }
    }
}

impl fmt::Display for SweepAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pressure => write!(f, "pressure"),
            Self::Temperature => write!(f, "temperature"),
        }
    }
}

/// Inclusive arithmetic range in canonical units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl SweepRange {
    pub const fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    /// Single-value range.
    pub const fn point(value: f64) -> Self {
        Self::new(value, value, 1.0)
    }

    pub fn validate(&self) -> BrineResult<()> {
        if !(self.start.is_finite() && self.end.is_finite() && self.step.is_finite()) {
            return Err(self.invalid("bounds and step must be finite"));
        }
        if self.step <= 0.0 {
            return Err(self.invalid("step must be positive"));
        }
        if self.end < self.start {
            return Err(self.invalid("end must not be below start"));
        }
        if self.count_unchecked() > MAX_RANGE_POINTS {
            return Err(self.invalid("too many points"));
        }
        Ok(())
    }

    /// Number of points the range generates.
    pub fn len(&self) -> BrineResult<usize> {
        self.validate()?;
        Ok(self.count_unchecked())
    }

    /// `start + i·step` for `i = 0..=floor((end − start)/step)`.
    pub fn values(&self) -> BrineResult<Vec<f64>> {
        let n = self.len()?;
        Ok((0..n).map(|i| self.start + i as f64 * self.step).collect())
    }

    fn count_unchecked(&self) -> usize {
        let steps = ((self.end - self.start) / self.step + STEP_EPSILON).floor();
        if steps >= MAX_RANGE_POINTS as f64 {
            MAX_RANGE_POINTS + 1
        } else {
            steps as usize + 1
        }
    }

    fn invalid(&self, reason: &str) -> BrineError {
        BrineError::InvalidSweep {
            what: format!(
                "range {}..={} step {}: {}",
                self.start, self.end, self.step, reason
            ),
        }
    }
}

impl fmt::Display for SweepRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={} step {}", self.start, self.end, self.step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    Pressure,
    Temperature,
    PressureTemperature,
}

/// What to sweep and what to hold fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SweepPlan {
    /// Pressure ramp at fixed temperature
    Pressure {
        temperature_k: f64,
        pressure: SweepRange,
    },
    /// Temperature ramp at fixed pressure
    Temperature {
        pressure_mpa: f64,
        temperature: SweepRange,
    },
    /// Temperature × pressure grid
    #[serde(rename = "pressure_temperature")]
    Grid {
        temperature: SweepRange,
        pressure: SweepRange,
    },
}

impl SweepPlan {
    pub fn kind(&self) -> SweepKind {
        match self {
            Self::Pressure { .. } => SweepKind::Pressure,
            Self::Temperature { .. } => SweepKind::Temperature,
            Self::Grid { .. } => SweepKind::PressureTemperature,
        }
    }

    pub fn validate(&self) -> BrineResult<()> {
        match self {
            Self::Pressure {
                temperature_k,
                pressure,
            } => {
                cs_core::ensure_finite(*temperature_k, "temperature")?;
                pressure.validate()
            }
            Self::Temperature {
                pressure_mpa,
                temperature,
            } => {
                cs_core::ensure_finite(*pressure_mpa, "pressure")?;
                temperature.validate()
            }
            Self::Grid {
                temperature,
                pressure,
            } => {
                temperature.validate()?;
                pressure.validate()
            }
        }
    }
}

/// A complete sweep request in canonical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepSpec {
    #[serde(flatten)]
    pub plan: SweepPlan,
    pub model: String,
    #[serde(default)]
    pub composition: SolutionComposition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minerals: Option<MineralAssemblage>,
}

impl SweepSpec {
    pub fn new(plan: SweepPlan, model: impl Into<String>, composition: SolutionComposition) -> Self {
        Self {
            plan,
            model: model.into(),
            composition,
            minerals: None,
        }
    }

    pub fn with_minerals(mut self, minerals: MineralAssemblage) -> Self {
        self.minerals = Some(minerals);
        self
    }

    pub fn kind(&self) -> SweepKind {
        self.plan.kind()
    }

    /// State template for the points of this sweep.
    pub fn state_at(&self, temperature_k: f64, pressure_mpa: f64) -> SimulationState {
        SimulationState {
            temperature_k,
            pressure_mpa,
            composition: self.composition.clone(),
            minerals: self.minerals.clone(),
            model: self.model.clone(),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn values_stay_within_bounds(
            start in -100.0_f64..100.0,
            span in 0.0_f64..500.0,
            step in 0.01_f64..50.0,
        ) {
            let range = SweepRange::new(start, start + span, step);
            let values = range.values().unwrap();
            prop_assert!(!values.is_empty());
            prop_assert_eq!(values[0], start);
            for v in &values {
                prop_assert!(*v <= range.end + step * 1e-6);
            }
            prop_assert!(values.windows(2).all(|w| w[1] > w[0]));
            let expected = ((range.end - range.start) / step + 1e-9).floor() as usize + 1;
            prop_assert_eq!(values.len(), expected);
        }
    }
}
