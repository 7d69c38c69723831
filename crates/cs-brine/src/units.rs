//! Unit normalization for user-facing inputs.
//!
//! Two entry points:
//! - text quantities (`"25 C"`, `"100 bar"`) parsed by [`parse_quantity`] into
//!   canonical Kelvin / MPa,
//! - explicit unit enums carried by requests ([`TemperatureUnit`],
//!   [`PressureUnit`], [`ConcentrationUnit`], [`MineralogyUnit`]).
//!
//! Canonical units are Kelvin, MPa, mol/kg water and mineral moles.

use crate::composition::SolutionComposition;
use crate::error::BrineResult;
use crate::ions::Ion;
use crate::minerals::{Mineral, MineralAssemblage};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Mass of rock sample that weight fractions refer to [g].
pub const SAMPLE_MASS_G: f64 = 1000.0;

/// Quantity family of a text input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    /// Temperature (canonical: Kelvin)
    Temperature,
    /// Absolute pressure (canonical: MPa)
    Pressure,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temperature => write!(f, "Temperature"),
            Self::Pressure => write!(f, "Pressure"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unknown unit '{unit}' for {quantity}")]
    UnknownUnit { unit: String, quantity: String },

    #[error("Value {value} out of range: {reason}")]
    OutOfRange { value: f64, reason: String },
}

/// Parse a text quantity and convert it to canonical units.
///
/// A bare number is taken as already canonical (K or MPa).
pub fn parse_quantity(raw_text: &str, quantity: Quantity) -> Result<f64, UnitError> {
    let trimmed = raw_text.trim();
    match quantity {
        Quantity::Temperature => parse_temperature(trimmed),
        Quantity::Pressure => parse_pressure(trimmed),
    }
}

fn parse_temperature(input: &str) -> Result<f64, UnitError> {
    let (value, unit) = split_value_and_unit(input)?;
    let unit = match unit.to_lowercase().as_str() {
        "" | "k" | "kelvin" => TemperatureUnit::Kelvin,
        "c" | "°c" | "degc" | "celsius" => TemperatureUnit::Celsius,
        "f" | "°f" | "degf" | "fahrenheit" => TemperatureUnit::Fahrenheit,
        _ => {
            return Err(UnitError::UnknownUnit {
                unit,
                quantity: Quantity::Temperature.to_string(),
            });
        }
    };
    unit.to_kelvin(value)
}

fn parse_pressure(input: &str) -> Result<f64, UnitError> {
    let (value, unit) = split_value_and_unit(input)?;
    let unit = match unit.to_lowercase().as_str() {
        "" | "mpa" => PressureUnit::MPa,
        "kpa" => PressureUnit::KPa,
        "pa" => PressureUnit::Pa,
        "bar" => PressureUnit::Bar,
        "atm" => PressureUnit::Atm,
        "psi" | "psia" => PressureUnit::Psi,
        _ => {
            return Err(UnitError::UnknownUnit {
                unit,
                quantity: Quantity::Pressure.to_string(),
            });
        }
    };
    unit.to_mpa(value)
}

/// Split `"25 C"` into `(25.0, "C")`; `"300"` gives `(300.0, "")`.
fn split_value_and_unit(input: &str) -> Result<(f64, String), UnitError> {
    let trimmed = input.trim();

    let split_idx = trimmed
        .find(|c: char| !c.is_ascii_digit() && !matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .unwrap_or(trimmed.len());

    let (num_part, unit_part) = trimmed.split_at(split_idx);
    let value: f64 = num_part.trim().parse().map_err(|_| {
        UnitError::ParseError(format!("Could not parse numeric value from '{}'", input))
    })?;

    Ok((value, unit_part.trim().to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Kelvin,
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    pub fn to_kelvin(self, value: f64) -> Result<f64, UnitError> {
        let kelvin = cs_core::to_kelvin(match self {
            Self::Kelvin => cs_core::k(value),
            Self::Celsius => cs_core::degc(value),
            Self::Fahrenheit => cs_core::degf(value),
        });
        if !kelvin.is_finite() || kelvin <= 0.0 {
            return Err(UnitError::OutOfRange {
                value: kelvin,
                reason: "Absolute temperature must be > 0 K".to_string(),
            });
        }
        Ok(kelvin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PressureUnit {
    #[default]
    #[serde(rename = "MPa", alias = "mpa")]
    MPa,
    #[serde(rename = "kPa", alias = "kpa")]
    KPa,
    #[serde(rename = "Pa", alias = "pa")]
    Pa,
    #[serde(rename = "bar")]
    Bar,
    #[serde(rename = "atm")]
    Atm,
    #[serde(rename = "psi")]
    Psi,
}

impl PressureUnit {
    pub fn to_mpa(self, value: f64) -> Result<f64, UnitError> {
        let mpa = cs_core::to_mpa(match self {
            Self::MPa => cs_core::mpa(value),
            Self::KPa => cs_core::kpa(value),
            Self::Pa => cs_core::pa(value),
            Self::Bar => cs_core::bar(value),
            Self::Atm => cs_core::atm(value),
            Self::Psi => cs_core::psi(value),
        });
        if !mpa.is_finite() || mpa < 0.0 {
            return Err(UnitError::OutOfRange {
                value: mpa,
                reason: "Absolute pressure cannot be negative".to_string(),
            });
        }
        Ok(mpa)
    }
}

/// Concentration unit of an ion map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConcentrationUnit {
    #[default]
    #[serde(rename = "mol/kg")]
    MolPerKg,
    #[serde(rename = "mol/L")]
    MolPerL,
    #[serde(rename = "mg/L", alias = "ppm")]
    MgPerL,
}

impl ConcentrationUnit {
    /// Convert label-free `(ion, value)` pairs to a molality composition.
    ///
    /// Volumetric units go through a solution-density estimate at `temperature_c`
    /// (pure-water density plus ion partial molar volumes).
    pub fn to_composition(
        self,
        values: &[(Ion, f64)],
        temperature_c: f64,
    ) -> BrineResult<SolutionComposition> {
        match self {
            Self::MolPerKg => SolutionComposition::new(values.iter().copied()),
            Self::MgPerL => SolutionComposition::new(mg_per_l_to_molality(values, temperature_c)),
            Self::MolPerL => {
                let mg_per_l: Vec<(Ion, f64)> = values
                    .iter()
                    .map(|(ion, c)| (*ion, c * ion.molar_mass() * 1000.0))
                    .collect();
                SolutionComposition::new(mg_per_l_to_molality(&mg_per_l, temperature_c))
            }
        }
    }
}

/// Pure-water density [g/cm³] at `temperature_c`.
pub fn water_density(temperature_c: f64) -> f64 {
    0.99987 + 6.69e-5 * temperature_c - 8.0e-6 * temperature_c * temperature_c
}

/// Estimated solution density [g/cm³] for an mg/L ion map.
pub fn solution_density(mg_per_l: &[(Ion, f64)], temperature_c: f64) -> f64 {
    let water_mass = water_density(temperature_c) * 1000.0;
    let water_volume = water_mass;
    let (solute_mass, solute_volume) =
        mg_per_l
            .iter()
            .fold((0.0, 0.0), |(mass, volume), (ion, c)| {
                let moles = c / 1000.0 / ion.molar_mass();
                (
                    mass + moles * ion.molar_mass(),
                    volume + moles * ion.partial_molar_volume(),
                )
            });
    (water_mass + solute_mass) / (water_volume + solute_volume)
}

fn mg_per_l_to_molality(mg_per_l: &[(Ion, f64)], temperature_c: f64) -> Vec<(Ion, f64)> {
    let rho_g_per_l = solution_density(mg_per_l, temperature_c) * 1000.0;
    let solutes_g: f64 = mg_per_l.iter().map(|(_, c)| c / 1000.0).sum();
    let kg_water = (rho_g_per_l - solutes_g) / 1000.0;
    mg_per_l
        .iter()
        .map(|(ion, c)| (*ion, c / 1000.0 / ion.molar_mass() / kg_water))
        .collect()
}

/// Unit of a mineral map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MineralogyUnit {
    #[default]
    #[serde(rename = "moles")]
    Moles,
    /// Weight fraction of a [`SAMPLE_MASS_G`] rock sample.
    #[serde(rename = "w/w")]
    WeightFraction,
}

impl MineralogyUnit {
    /// Negative inputs stay negative so the exclusion policy survives conversion.
    pub fn to_assemblage(self, values: &[(Mineral, f64)]) -> BrineResult<MineralAssemblage> {
        match self {
            Self::Moles => MineralAssemblage::new(values.iter().copied()),
            Self::WeightFraction => MineralAssemblage::new(
                values
                    .iter()
                    .map(|(m, w)| (*m, w * SAMPLE_MASS_G / m.molar_mass())),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kelvin_and_celsius() {
        assert_eq!(parse_quantity("300 K", Quantity::Temperature).unwrap(), 300.0);
        assert_eq!(parse_quantity("300", Quantity::Temperature).unwrap(), 300.0);
        let t = parse_quantity("25C", Quantity::Temperature).unwrap();
        assert!((t - 298.15).abs() < 1e-9);
    }

    #[test]
    fn parse_fahrenheit() {
        let t = parse_quantity("212 F", Quantity::Temperature).unwrap();
        assert!((t - 373.15).abs() < 1e-9);
    }

    #[test]
    fn reject_non_positive_temperature() {
        assert!(matches!(
            parse_quantity("-300 C", Quantity::Temperature),
            Err(UnitError::OutOfRange { .. })
        ));
    }

    #[test]
    fn parse_pressures() {
        assert!((parse_quantity("100 bar", Quantity::Pressure).unwrap() - 10.0).abs() < 1e-12);
        assert!((parse_quantity("1 atm", Quantity::Pressure).unwrap() - 0.101_325).abs() < 1e-12);
        assert!((parse_quantity("1450.38 psi", Quantity::Pressure).unwrap() - 10.0).abs() < 1e-3);
        assert_eq!(parse_quantity("12", Quantity::Pressure).unwrap(), 12.0);
    }

    #[test]
    fn reject_unknown_unit() {
        assert!(matches!(
            parse_quantity("10 furlongs", Quantity::Pressure),
            Err(UnitError::UnknownUnit { .. })
        ));
        assert!(matches!(
            parse_quantity("warm", Quantity::Temperature),
            Err(UnitError::ParseError(_))
        ));
    }

    #[test]
    fn unit_enums_deserialize_from_request_labels() {
        let p: PressureUnit = serde_json::from_str(r#""bar""#).unwrap();
        assert_eq!(p, PressureUnit::Bar);
        let c: ConcentrationUnit = serde_json::from_str(r#""mg/L""#).unwrap();
        assert_eq!(c, ConcentrationUnit::MgPerL);
        let m: MineralogyUnit = serde_json::from_str(r#""w/w""#).unwrap();
        assert_eq!(m, MineralogyUnit::WeightFraction);
        let t: TemperatureUnit = serde_json::from_str(r#""celsius""#).unwrap();
        assert_eq!(t, TemperatureUnit::Celsius);
    }

    #[test]
    fn water_density_near_one_at_room_temperature() {
        let rho = water_density(25.0);
        assert!(rho > 0.99 && rho < 1.0);
    }

    #[test]
    fn molality_passes_through() {
        let comp = ConcentrationUnit::MolPerKg
            .to_composition(&[(Ion::Na, 0.5), (Ion::Cl, 0.5)], 25.0)
            .unwrap();
        assert_eq!(comp.molality(Ion::Na), 0.5);
    }

    #[test]
    fn dilute_mg_per_l_is_close_to_molality() {
        // 1000 mg/L NaCl-equivalent sodium in a dilute brine
        let comp = ConcentrationUnit::MgPerL
            .to_composition(&[(Ion::Na, 22.99)], 25.0)
            .unwrap();
        let m = comp.molality(Ion::Na);
        assert!((m - 1e-3).abs() < 5e-5, "m = {}", m);
    }

    #[test]
    fn mol_per_l_and_mg_per_l_agree() {
        let from_molar = ConcentrationUnit::MolPerL
            .to_composition(&[(Ion::Cl, 0.1)], 25.0)
            .unwrap();
        let from_mass = ConcentrationUnit::MgPerL
            .to_composition(&[(Ion::Cl, 0.1 * 35.45 * 1000.0)], 25.0)
            .unwrap();
        assert!((from_molar.molality(Ion::Cl) - from_mass.molality(Ion::Cl)).abs() < 1e-12);
    }

    #[test]
    fn weight_fraction_to_moles() {
        let rock = MineralogyUnit::WeightFraction
            .to_assemblage(&[(Mineral::Calcite, 0.5), (Mineral::Quartz, -1.0)])
            .unwrap();
        let calcite = rock.initial_moles(Mineral::Calcite).unwrap();
        assert!((calcite - 500.0 / 100.0869).abs() < 1e-9);
        assert!(!rock.is_included(Mineral::Quartz));
    }
}
