//! Parser for the solver's tab-separated selected-output table.
//!
//! Parsing never fails: missing columns, short rows and non-numeric cells all
//! resolve to documented defaults.

use crate::ions::Ion;
use crate::result::{DEFAULT_PH, SimulationResult, SpeciesDatum};
use cs_core::{atm_to_mpa, round_to};
use tracing::debug;

/// Raw log-activities and molar volumes at or below this mark "not present".
pub const ACTIVITY_FLOOR: f64 = -500.0;

/// Decimals kept for activities and molar volumes.
const SPECIES_DECIMALS: u32 = 4;

pub mod columns {
    pub const DISSOLVED_CO2: &str = "C(4)";
    pub const DENSITY: &str = "SOL_DENSITY";
    pub const IONIC_STRENGTH: &str = "mu";
    pub const PH: &str = "pH";
    pub const OSMOTIC: &str = "OSMOTIC";
    pub const PARTIAL_PRESSURE_CO2: &str = "PR_CO2";
    pub const FUGACITY_COEFFICIENT_CO2: &str = "PHI_CO2";
    pub const PRESSURE: &str = "pressure";
    pub const STATE: &str = "state";
}

/// `state` cell of the row the solver writes for the initial solution.
pub const INITIAL_SOLUTION_STATE: &str = "i_soln";

/// Header plus data rows, cells trimmed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectedOutput {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SelectedOutput {
    pub fn parse(text: &str) -> Self {
        let mut lines = text.lines().filter(|line| !line.trim().is_empty());
        let Some(header) = lines.next() else {
            return Self::default();
        };
        let split = |line: &str| -> Vec<String> {
            line.split('\t').map(|cell| cell.trim().to_string()).collect()
        };
        Self {
            headers: split(header),
            rows: lines.map(split).collect(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row {
            headers: &self.headers,
            cells,
        })
    }

    /// Final equilibrium state: the last row wins.
    pub fn last_row(&self) -> Option<Row<'_>> {
        self.rows.last().map(|cells| Row {
            headers: &self.headers,
            cells,
        })
    }
}

/// One data row viewed through the table header.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    headers: &'a [String],
    cells: &'a [String],
}

impl<'a> Row<'a> {
    /// Raw text of a column, if present.
    pub fn text(&self, column: &str) -> Option<&'a str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.cells.get(idx).map(String::as_str)
    }

    /// Finite numeric value of a column, if present.
    pub fn get(&self, column: &str) -> Option<f64> {
        let idx = self.headers.iter().position(|h| h == column)?;
        let cell = self.cells.get(idx)?;
        cell.parse::<f64>().ok().filter(|v| v.is_finite())
    }

    pub fn get_or(&self, column: &str, default: f64) -> f64 {
        match self.get(column) {
            Some(v) => v,
            None => {
                debug!(column, default, "Selected-output value missing; using default");
                default
            }
        }
    }

    /// Activity from the base-10 log-activity column, floored and rounded.
    pub fn activity(&self, ion: Ion) -> f64 {
        match self.get(&ion.activity_column()) {
            Some(la) if la > ACTIVITY_FLOOR => round_to(10f64.powf(la), SPECIES_DECIMALS),
            _ => 0.0,
        }
    }

    pub fn molar_volume(&self, ion: Ion) -> f64 {
        match self.get(&ion.molar_volume_column()) {
            Some(vm) if vm > ACTIVITY_FLOOR => round_to(vm, SPECIES_DECIMALS),
            _ => 0.0,
        }
    }

    pub fn species(&self) -> Vec<SpeciesDatum> {
        Ion::ALL
            .iter()
            .map(|ion| SpeciesDatum {
                species: *ion,
                activity: self.activity(*ion),
                molar_volume: self.molar_volume(*ion),
            })
            .collect()
    }

    /// Solution properties of this row.
    pub fn to_result(&self) -> SimulationResult {
        SimulationResult {
            density: self.get_or(columns::DENSITY, 0.0),
            ionic_strength: self.get_or(columns::IONIC_STRENGTH, 0.0),
            ph: self.get_or(columns::PH, DEFAULT_PH),
            osmotic_coefficient: self.get_or(columns::OSMOTIC, 0.0),
            partial_pressure_co2: self.get_or(columns::PARTIAL_PRESSURE_CO2, 0.0),
            fugacity_coefficient_co2: self.get_or(columns::FUGACITY_COEFFICIENT_CO2, 0.0),
            dissolved_co2: self.get_or(columns::DISSOLVED_CO2, 0.0),
            species: self.species(),
            minerals: None,
        }
    }
}

/// Final-state result of a table; all defaults when it has no data rows.
pub fn final_state(table: &SelectedOutput) -> SimulationResult {
    table
        .last_row()
        .map(|row| row.to_result())
        .unwrap_or_default()
}

/// One row of a native pressure-ramp table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampRow {
    /// Row describes the initial solution rather than a ramp step
    pub initial: bool,
    /// Solver-reported pressure [MPa] rounded to 0.01, if the column is present
    pub pressure_mpa: Option<f64>,
    pub dissolved_co2: f64,
}

/// Every row of a pressure-ramp table, in order.
///
/// Initial-solution rows are flagged from the `state` column; a table without
/// that column flags its first row.
pub fn ramp_rows(table: &SelectedOutput) -> Vec<RampRow> {
    let has_state = table.headers().iter().any(|h| h == columns::STATE);
    table
        .rows()
        .enumerate()
        .map(|(i, row)| RampRow {
            initial: if has_state {
                row.text(columns::STATE) == Some(INITIAL_SOLUTION_STATE)
            } else {
                i == 0
            },
            pressure_mpa: row
                .get(columns::PRESSURE)
                .map(|p| round_to(atm_to_mpa(p), 2)),
            dissolved_co2: row.get_or(columns::DISSOLVED_CO2, 0.0),
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn raw_values_at_or_below_floor_are_zero(raw in -1.0e6_f64..=-500.0) {
            let text = format!("la_Na+\tVM_Na+\n{}\t{}\n", raw, raw);
            let result = final_state(&SelectedOutput::parse(&text));
            let na = result.species(Ion::Na).unwrap();
            prop_assert_eq!(na.activity, 0.0);
            prop_assert_eq!(na.molar_volume, 0.0);
        }

        #[test]
        fn activities_are_never_negative(la in -499.0_f64..3.0) {
            let text = format!("la_Cl-\n{}\n", la);
            let result = final_state(&SelectedOutput::parse(&text));
            prop_assert!(result.species(Ion::Cl).unwrap().activity >= 0.0);
        }
    }
}
