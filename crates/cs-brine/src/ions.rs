//! Dissolved ion definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ions tracked in the brine, in the order results report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ion {
    /// Sodium (Na⁺)
    #[serde(rename = "Na+")]
    Na,
    /// Chloride (Cl⁻)
    #[serde(rename = "Cl-")]
    Cl,
    /// Potassium (K⁺)
    #[serde(rename = "K+")]
    K,
    /// Magnesium (Mg²⁺)
    #[serde(rename = "Mg+2")]
    Mg,
    /// Calcium (Ca²⁺)
    #[serde(rename = "Ca+2")]
    Ca,
    /// Sulfate (SO₄²⁻)
    #[serde(rename = "SO4-2")]
    So4,
    /// Bicarbonate (HCO₃⁻)
    #[serde(rename = "HCO3-")]
    Hco3,
    /// Carbonate (CO₃²⁻)
    #[serde(rename = "CO3-2")]
    Co3,
}

impl Ion {
    pub const COUNT: usize = 8;

    pub const ALL: [Ion; Self::COUNT] = [
        Ion::Na,
        Ion::Cl,
        Ion::K,
        Ion::Mg,
        Ion::Ca,
        Ion::So4,
        Ion::Hco3,
        Ion::Co3,
    ];

    /// Label used in requests and in solver column names (`la_Na+`).
    pub fn label(&self) -> &'static str {
        match self {
            Ion::Na => "Na+",
            Ion::Cl => "Cl-",
            Ion::K => "K+",
            Ion::Mg => "Mg+2",
            Ion::Ca => "Ca+2",
            Ion::So4 => "SO4-2",
            Ion::Hco3 => "HCO3-",
            Ion::Co3 => "CO3-2",
        }
    }

    pub fn charge(&self) -> i32 {
        match self {
            Ion::Na | Ion::K => 1,
            Ion::Mg | Ion::Ca => 2,
            Ion::Cl | Ion::Hco3 => -1,
            Ion::So4 | Ion::Co3 => -2,
        }
    }

    /// Molar mass [g/mol].
    pub fn molar_mass(&self) -> f64 {
        match self {
            Ion::Na => 22.99,
            Ion::Cl => 35.45,
            Ion::K => 39.10,
            Ion::Mg => 24.31,
            Ion::Ca => 40.08,
            Ion::So4 => 96.06,
            Ion::Hco3 => 61.02,
            Ion::Co3 => 60.01,
        }
    }

    /// Partial molar volume at 25 °C [cm³/mol], literature averages.
    pub fn partial_molar_volume(&self) -> f64 {
        match self {
            Ion::Na => 16.6,
            Ion::Cl => 16.6,
            Ion::K => 25.0,
            Ion::Mg => -19.6,
            Ion::Ca => -24.4,
            Ion::So4 => -20.1,
            Ion::Hco3 => 28.5,
            Ion::Co3 => 41.5,
        }
    }

    /// Column holding the log10 activity in solver output.
    pub fn activity_column(&self) -> String {
        format!("la_{}", self.label())
    }

    /// Column holding the molar volume in solver output.
    pub fn molar_volume_column(&self) -> String {
        format!("VM_{}", self.label())
    }
}

impl fmt::Display for Ion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Ion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ion::ALL
            .iter()
            .copied()
            .find(|ion| ion.label() == trimmed)
            .or(match trimmed {
                "Mg2+" => Some(Ion::Mg),
                "Ca2+" => Some(Ion::Ca),
                "SO4^2-" => Some(Ion::So4),
                "CO3^2-" => Some(Ion::Co3),
                _ => None,
            })
            .ok_or_else(|| format!("unknown ion '{}'", trimmed))
    }
}
