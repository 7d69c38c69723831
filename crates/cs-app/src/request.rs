//! Request shapes accepted by frontends, and their normalization to canonical units.

use cs_brine::units::{Quantity, parse_quantity};
use cs_brine::{
    ConcentrationUnit, Ion, Mineral, MineralAssemblage, MineralogyUnit, PressureUnit,
    SimulationState, SolutionComposition, SweepRange, TemperatureUnit,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{AppError, AppResult};

/// Model used when a request names none.
pub const DEFAULT_MODEL: &str = "phreeqc_phreeqc";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Units of the numeric fields of a request.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestUnits {
    pub temperature: TemperatureUnit,
    pub pressure: PressureUnit,
    pub concentration: ConcentrationUnit,
    pub mineralogy: MineralogyUnit,
}

/// A temperature or pressure given as a number (in the request's unit) or as
/// text with its own unit, like `"25 C"` or `"100 bar"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Number(f64),
    Text(String),
}

impl From<f64> for QuantityInput {
    fn from(value: f64) -> Self {
        QuantityInput::Number(value)
    }
}

impl QuantityInput {
    fn kelvin(&self, unit: TemperatureUnit) -> AppResult<f64> {
        Ok(match self {
            QuantityInput::Number(v) => unit.to_kelvin(*v)?,
            QuantityInput::Text(s) => parse_quantity(s, Quantity::Temperature)?,
        })
    }

    fn mpa(&self, unit: PressureUnit) -> AppResult<f64> {
        Ok(match self {
            QuantityInput::Number(v) => unit.to_mpa(*v)?,
            QuantityInput::Text(s) => parse_quantity(s, Quantity::Pressure)?,
        })
    }
}

/// Brine and rock description shared by every request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleRequest {
    pub units: RequestUnits,
    /// Ion label to concentration, in `units.concentration`
    pub composition: BTreeMap<String, f64>,
    /// Mineral label to amount, in `units.mineralogy`; negative amounts exclude a mineral
    pub minerals: Option<BTreeMap<String, f64>>,
}

impl SampleRequest {
    fn composition(&self, temperature_k: f64) -> AppResult<SolutionComposition> {
        let values = self
            .composition
            .iter()
            .map(|(label, c)| {
                label
                    .parse::<Ion>()
                    .map(|ion| (ion, *c))
                    .map_err(AppError::InvalidInput)
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(self
            .units
            .concentration
            .to_composition(&values, cs_core::kelvin_to_celsius(temperature_k))?)
    }

    fn minerals(&self) -> AppResult<Option<MineralAssemblage>> {
        let Some(map) = &self.minerals else {
            return Ok(None);
        };
        let values = map
            .iter()
            .map(|(label, n)| {
                label
                    .parse::<Mineral>()
                    .map(|m| (m, *n))
                    .map_err(AppError::InvalidInput)
            })
            .collect::<AppResult<Vec<_>>>()?;
        Ok(Some(self.units.mineralogy.to_assemblage(&values)?))
    }

    pub fn has_minerals(&self) -> bool {
        self.minerals.is_some()
    }
}

/// One fixed temperature/pressure state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRequest {
    pub temperature: QuantityInput,
    pub pressure: QuantityInput,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(flatten)]
    pub sample: SampleRequest,
}

impl StateRequest {
    pub fn new(temperature: impl Into<QuantityInput>, pressure: impl Into<QuantityInput>) -> Self {
        Self {
            temperature: temperature.into(),
            pressure: pressure.into(),
            model: default_model(),
            sample: SampleRequest::default(),
        }
    }

    /// Canonical simulation state (K, MPa, mol/kgw, moles).
    pub fn to_state(&self) -> AppResult<SimulationState> {
        let temperature_k = self.temperature.kelvin(self.sample.units.temperature)?;
        let pressure_mpa = self.pressure.mpa(self.sample.units.pressure)?;
        let composition = self.sample.composition(temperature_k)?;
        let state = SimulationState::new(temperature_k, pressure_mpa, composition, &self.model)?;
        Ok(match self.sample.minerals()? {
            Some(rock) => state.with_minerals(rock),
            None => state,
        })
    }
}

/// A sweep axis: a fixed value or an inclusive range in the request's unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisInput {
    Value(f64),
    Range(SweepRange),
}

/// Sweep over temperature, pressure or both. Missing axes take configured defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    #[serde(default)]
    pub temperature: Option<AxisInput>,
    #[serde(default)]
    pub pressure: Option<AxisInput>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(flatten)]
    pub sample: SampleRequest,
}

impl SweepRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            temperature: None,
            pressure: None,
            model: model.into(),
            sample: SampleRequest::default(),
        }
    }

    pub fn with_temperature(mut self, axis: AxisInput) -> Self {
        self.temperature = Some(axis);
        self
    }

    pub fn with_pressure(mut self, axis: AxisInput) -> Self {
        self.pressure = Some(axis);
        self
    }

    pub(crate) fn temperature_range(&self) -> AppResult<Option<SweepRange>> {
        let unit = self.sample.units.temperature;
        self.temperature
            .map(|axis| axis_range(axis, |v| Ok(unit.to_kelvin(v)?)))
            .transpose()
    }

    pub(crate) fn pressure_range(&self) -> AppResult<Option<SweepRange>> {
        let unit = self.sample.units.pressure;
        self.pressure
            .map(|axis| axis_range(axis, |v| Ok(unit.to_mpa(v)?)))
            .transpose()
    }

    pub(crate) fn composition(&self, temperature_k: f64) -> AppResult<SolutionComposition> {
        self.sample.composition(temperature_k)
    }

    pub(crate) fn minerals(&self) -> AppResult<Option<MineralAssemblage>> {
        self.sample.minerals()
    }
}

/// Convert an axis through an affine unit conversion; the step is mapped as a
/// difference so offsets (°C, °F) do not leak into it.
fn axis_range(axis: AxisInput, convert: impl Fn(f64) -> AppResult<f64>) -> AppResult<SweepRange> {
    match axis {
        AxisInput::Value(v) => Ok(SweepRange::point(convert(v)?)),
        AxisInput::Range(r) => {
            let start = convert(r.start)?;
            let end = convert(r.end)?;
            let step = convert(r.start + r.step)? - start;
            Ok(SweepRange::new(start, end, step))
        }
    }
}

/// Read a request document: JSON for `.json` files, YAML otherwise.
pub fn load_request<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::RequestFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_yaml::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_request_in_user_units() {
        let request: StateRequest = serde_json::from_str(
            r#"{
                "temperature": 25.0,
                "pressure": 100.0,
                "units": {"temperature": "celsius", "pressure": "bar"},
                "composition": {"Na+": 1.0, "Cl-": 1.0},
                "model": "pitzer"
            }"#,
        )
        .unwrap();
        let state = request.to_state().unwrap();
        assert!((state.temperature_k - 298.15).abs() < 1e-12);
        assert!((state.pressure_mpa - 10.0).abs() < 1e-12);
        assert_eq!(state.composition.molality(Ion::Na), 1.0);
        assert_eq!(state.model, "pitzer");
        assert!(state.minerals.is_none());
    }

    #[test]
    fn text_quantities_carry_their_own_units() {
        let request: StateRequest =
            serde_yaml::from_str("temperature: 50 C\npressure: 1 atm\n").unwrap();
        let state = request.to_state().unwrap();
        assert!((state.temperature_k - 323.15).abs() < 1e-9);
        assert!((state.pressure_mpa - 0.101325).abs() < 1e-9);
        assert_eq!(state.model, DEFAULT_MODEL);
    }

    #[test]
    fn weight_fraction_minerals_keep_exclusions() {
        let request: StateRequest = serde_json::from_str(
            r#"{
                "temperature": 300.0,
                "pressure": 10.0,
                "units": {"mineralogy": "w/w"},
                "minerals": {"Calcite": 0.1, "Quartz": -1.0}
            }"#,
        )
        .unwrap();
        let rock = request.to_state().unwrap().minerals.unwrap();
        let calcite = rock.initial_moles(Mineral::Calcite).unwrap();
        assert!((calcite - 100.0 / Mineral::Calcite.molar_mass()).abs() < 1e-9);
        assert!(!rock.is_included(Mineral::Quartz));
    }

    #[test]
    fn unknown_labels_are_invalid_input() {
        let mut request = StateRequest::new(300.0, 1.0);
        request.sample.composition.insert("Xx+".into(), 1.0);
        assert!(matches!(request.to_state(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn celsius_range_steps_stay_differences() {
        let request: SweepRequest = serde_json::from_str(
            r#"{
                "temperature": {"start": 25.0, "end": 125.0, "step": 25.0},
                "pressure": 10.0,
                "units": {"temperature": "celsius"}
            }"#,
        )
        .unwrap();
        let t = request.temperature_range().unwrap().unwrap();
        assert!((t.start - 298.15).abs() < 1e-9);
        assert!((t.end - 398.15).abs() < 1e-9);
        assert!((t.step - 25.0).abs() < 1e-9);
        assert_eq!(t.values().unwrap().len(), 5);
        let p = request.pressure_range().unwrap().unwrap();
        assert_eq!(p, SweepRange::point(10.0));
    }

    #[test]
    fn load_request_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("state.json");
        std::fs::write(&json, r#"{"temperature": 300.0, "pressure": 1.0}"#).unwrap();
        let yaml = dir.path().join("state.yaml");
        std::fs::write(&yaml, "temperature: 300.0\npressure: 1.0\n").unwrap();
        let a: StateRequest = load_request(&json).unwrap();
        let b: StateRequest = load_request(&yaml).unwrap();
        assert_eq!(a, b);

        let missing: AppResult<StateRequest> = load_request(&dir.path().join("none.json"));
        assert!(matches!(missing, Err(AppError::RequestFileRead { .. })));
    }
}
