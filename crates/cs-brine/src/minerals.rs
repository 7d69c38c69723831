//! Rock mineral definitions and the equilibrium-phase block encoder.

use crate::error::{BrineError, BrineResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Minerals that may take part in a brine-rock run, in deck order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mineral {
    Quartz,
    Calcite,
    Siderite,
    Dolomite,
    Illite,
    Kaolinite,
    #[serde(rename = "K-feldspar")]
    KFeldspar,
    Albite,
    Chlorite,
    Pyrite,
}

impl Mineral {
    pub const ALL: [Mineral; 10] = [
        Mineral::Quartz,
        Mineral::Calcite,
        Mineral::Siderite,
        Mineral::Dolomite,
        Mineral::Illite,
        Mineral::Kaolinite,
        Mineral::KFeldspar,
        Mineral::Albite,
        Mineral::Chlorite,
        Mineral::Pyrite,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Mineral::Quartz => "Quartz",
            Mineral::Calcite => "Calcite",
            Mineral::Siderite => "Siderite",
            Mineral::Dolomite => "Dolomite",
            Mineral::Illite => "Illite",
            Mineral::Kaolinite => "Kaolinite",
            Mineral::KFeldspar => "K-feldspar",
            Mineral::Albite => "Albite",
            Mineral::Chlorite => "Chlorite",
            Mineral::Pyrite => "Pyrite",
        }
    }

    /// Phase name as defined in the solver databases.
    pub fn phase_name(&self) -> &'static str {
        match self {
            Mineral::Chlorite => "Chlorite(14A)",
            other => other.label(),
        }
    }

    /// Molar mass [g/mol].
    pub fn molar_mass(&self) -> f64 {
        match self {
            Mineral::Quartz => 60.083,
            Mineral::Calcite => 100.0869,
            Mineral::Siderite => 115.85,
            Mineral::Dolomite => 184.40,
            Mineral::Illite => 389.34,
            Mineral::Kaolinite => 258.16,
            Mineral::KFeldspar => 278.33,
            Mineral::Albite => 262.14,
            Mineral::Chlorite => 555.797,
            Mineral::Pyrite => 119.98,
        }
    }

    /// Column carrying this phase's mole transfer in selected output.
    ///
    /// Uppercase, hyphens and parentheses removed, `14A` polytype suffix dropped:
    /// `Chlorite(14A)` becomes `EQUI_CHLORITE`, `K-feldspar` becomes `EQUI_KFELDSPAR`.
    pub fn delta_column(&self) -> String {
        let name = self
            .phase_name()
            .to_uppercase()
            .replace(['-', '(', ')'], "")
            .replace("14A", "");
        format!("EQUI_{}", name)
    }
}

impl fmt::Display for Mineral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Mineral {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        Mineral::ALL
            .iter()
            .copied()
            .find(|m| {
                let label: String = m
                    .label()
                    .to_lowercase()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect();
                label == key || (*m == Mineral::Chlorite && key == "chlorite14a")
            })
            .ok_or_else(|| format!("unknown mineral '{}'", s.trim()))
    }
}

/// Initial moles of each mineral offered to the brine.
///
/// Negative moles mean "excluded from the reactive assemblage"; absent minerals
/// are excluded as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct MineralAssemblage {
    moles: BTreeMap<Mineral, f64>,
}

impl MineralAssemblage {
    /// Rejects non-finite moles and minerals given more than once (labels are
    /// matched case- and punctuation-insensitively, so `calcite` repeats `Calcite`).
    pub fn new(moles: impl IntoIterator<Item = (Mineral, f64)>) -> BrineResult<Self> {
        let mut map = BTreeMap::new();
        for (mineral, n) in moles {
            if !n.is_finite() {
                return Err(BrineError::invalid(format!(
                    "non-finite moles for {}",
                    mineral
                )));
            }
            if map.insert(mineral, n).is_some() {
                return Err(BrineError::invalid(format!(
                    "mineral {} given more than once",
                    mineral
                )));
            }
        }
        Ok(Self { moles: map })
    }

    pub fn from_labels<'a>(
        labels: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> BrineResult<Self> {
        let pairs = labels
            .into_iter()
            .map(|(label, n)| {
                label
                    .parse::<Mineral>()
                    .map(|m| (m, n))
                    .map_err(BrineError::invalid)
            })
            .collect::<BrineResult<Vec<_>>>()?;
        Self::new(pairs)
    }

    /// Initial moles as given by the caller, including excluded (negative) entries.
    pub fn initial_moles(&self, mineral: Mineral) -> Option<f64> {
        self.moles.get(&mineral).copied()
    }

    /// True when the mineral takes part in the equilibrium.
    pub fn is_included(&self, mineral: Mineral) -> bool {
        self.initial_moles(mineral).is_some_and(|n| n >= 0.0)
    }

    /// Minerals present in the input map, in deck order.
    pub fn minerals(&self) -> impl Iterator<Item = Mineral> + '_ {
        self.moles.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Mineral, f64)> + '_ {
        self.moles.iter().map(|(m, n)| (*m, *n))
    }

    pub fn is_empty(&self) -> bool {
        self.moles.is_empty()
    }

    /// Render the equilibrium-phase lines for the solver deck.
    ///
    /// Every known mineral gets one line so the block keeps a stable shape: an
    /// active line at target saturation index 0 with the initial moles, or a
    /// commented-out line when the mineral is excluded.
    pub fn render_phase_block(&self) -> String {
        Mineral::ALL
            .iter()
            .map(|mineral| match self.initial_moles(*mineral) {
                Some(n) if n >= 0.0 => format!("    {}        0   {}", mineral.phase_name(), n),
                _ => format!("    #{}       0   0", mineral.phase_name()),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl TryFrom<BTreeMap<String, f64>> for MineralAssemblage {
    type Error = BrineError;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::from_labels(map.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

impl From<MineralAssemblage> for BTreeMap<String, f64> {
    fn from(assemblage: MineralAssemblage) -> Self {
        assemblage
            .iter()
            .map(|(m, n)| (m.label().to_string(), n))
            .collect()
    }
}
