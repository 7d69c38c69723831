//! Canonical result shapes shared by every backend.

use crate::ions::Ion;
use crate::minerals::Mineral;
use crate::sweeps::SweepAxis;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// pH reported when a backend does not compute one.
pub const DEFAULT_PH: f64 = 7.0;

/// Per-ion activity and molar volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDatum {
    pub species: Ion,
    /// Activity (dimensionless, never negative)
    pub activity: f64,
    /// Apparent molar volume [cm³/mol]
    pub molar_volume: f64,
}

impl SpeciesDatum {
    pub fn zero(species: Ion) -> Self {
        Self {
            species,
            activity: 0.0,
            molar_volume: 0.0,
        }
    }
}

/// Mole balance of one mineral over a brine-rock run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MineralChange {
    /// Moles offered to the brine (negative when excluded)
    pub initial_moles: f64,
    /// Net moles transferred; positive means precipitation
    pub delta: f64,
    /// `initial + delta` for included minerals, 0 for excluded ones
    pub final_moles: f64,
}

/// Solution properties after equilibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// [g/cm³]
    pub density: f64,
    /// [mol/kgw]
    pub ionic_strength: f64,
    pub ph: f64,
    pub osmotic_coefficient: f64,
    /// [atm]
    pub partial_pressure_co2: f64,
    pub fugacity_coefficient_co2: f64,
    /// Total dissolved inorganic carbon [mol/kgw]
    pub dissolved_co2: f64,
    /// One entry per [`Ion`], in ion order
    pub species: Vec<SpeciesDatum>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minerals: Option<BTreeMap<Mineral, MineralChange>>,
}

impl Default for SimulationResult {
    fn default() -> Self {
        Self {
            density: 0.0,
            ionic_strength: 0.0,
            ph: DEFAULT_PH,
            osmotic_coefficient: 0.0,
            partial_pressure_co2: 0.0,
            fugacity_coefficient_co2: 0.0,
            dissolved_co2: 0.0,
            species: Ion::ALL.iter().map(|ion| SpeciesDatum::zero(*ion)).collect(),
            minerals: None,
        }
    }
}

impl SimulationResult {
    /// Result carrying only a dissolved CO2 value.
    pub fn with_dissolved_co2(dissolved_co2: f64) -> Self {
        Self {
            dissolved_co2,
            ..Self::default()
        }
    }

    pub fn species(&self, ion: Ion) -> Option<&SpeciesDatum> {
        self.species.iter().find(|s| s.species == ion)
    }

    /// Net mole change per mineral, if this was a brine-rock run.
    pub fn mineral_deltas(&self) -> Option<BTreeMap<Mineral, f64>> {
        self.minerals
            .as_ref()
            .map(|m| m.iter().map(|(k, v)| (*k, v.delta)).collect())
    }
}

/// Outcome of one sweep point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PointStatus {
    Computed,
    Failed { message: String },
}

impl PointStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Axis value in canonical units (K or MPa)
    pub value: f64,
    /// Dissolved CO2 [mol/kgw]; 0 for failed points
    pub dissolved_co2: f64,
    #[serde(flatten)]
    pub status: PointStatus,
}

impl SweepPoint {
    pub fn computed(value: f64, dissolved_co2: f64) -> Self {
        Self {
            value,
            dissolved_co2,
            status: PointStatus::Computed,
        }
    }

    pub fn failed(value: f64, message: impl Into<String>) -> Self {
        Self {
            value,
            dissolved_co2: 0.0,
            status: PointStatus::Failed {
                message: message.into(),
            },
        }
    }
}

/// One-axis sweep result, points in axis order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweep1D {
    pub axis: SweepAxis,
    pub points: Vec<SweepPoint>,
}

impl Sweep1D {
    pub fn new(axis: SweepAxis, points: Vec<SweepPoint>) -> Self {
        Self { axis, points }
    }

    /// Sweep with no points (unknown model under the legacy policy).
    pub fn empty(axis: SweepAxis) -> Self {
        Self::new(axis, Vec::new())
    }

    pub fn axis_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn dissolved_co2(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.dissolved_co2).collect()
    }

    pub fn num_failed(&self) -> usize {
        self.points.iter().filter(|p| p.status.is_failed()).count()
    }

    pub fn num_computed(&self) -> usize {
        self.points.len() - self.num_failed()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One grid cell; `i` indexes temperatures, `j` indexes pressures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub i: usize,
    pub j: usize,
    pub dissolved_co2: f64,
    #[serde(flatten)]
    pub status: PointStatus,
}

/// Temperature × pressure grid result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSweep {
    /// [K]
    pub temperatures: Vec<f64>,
    /// [MPa]
    pub pressures: Vec<f64>,
    /// Row-major over temperatures
    pub cells: Vec<GridCell>,
}

impl GridSweep {
    pub fn empty() -> Self {
        Self {
            temperatures: Vec::new(),
            pressures: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn cell(&self, i: usize, j: usize) -> Option<&GridCell> {
        self.cells.get(i * self.pressures.len() + j)
    }

    pub fn num_failed(&self) -> usize {
        self.cells.iter().filter(|c| c.status.is_failed()).count()
    }

    /// Legacy `[i, j, value]` triples.
    pub fn triples(&self) -> Vec<(usize, usize, f64)> {
        self.cells
            .iter()
            .map(|c| (c.i, c.j, c.dissolved_co2))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_species_and_ph() {
        let result = SimulationResult::default();
        assert_eq!(result.ph, 7.0);
        assert_eq!(result.species.len(), 8);
        assert!(result.species.iter().all(|s| s.activity == 0.0));
        assert_eq!(result.species[0].species, Ion::Na);
        assert!(result.mineral_deltas().is_none());
    }

    #[test]
    fn failed_point_is_distinguishable_from_computed_zero() {
        let sweep = Sweep1D::new(
            SweepAxis::Pressure,
            vec![SweepPoint::computed(1.0, 0.0), SweepPoint::failed(2.0, "boom")],
        );
        assert_eq!(sweep.dissolved_co2(), vec![0.0, 0.0]);
        assert_eq!(sweep.num_failed(), 1);
        assert_eq!(sweep.num_computed(), 1);
        assert_eq!(sweep.axis_values(), vec![1.0, 2.0]);
    }

    #[test]
    fn point_status_serializes_flat() {
        let json = serde_json::to_value(SweepPoint::failed(3.0, "timeout")).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["message"], "timeout");
        assert_eq!(json["dissolved_co2"], 0.0);
    }
}
