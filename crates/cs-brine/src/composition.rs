//! Brine composition (ion molalities).

use crate::error::{BrineError, BrineResult};
use crate::ions::Ion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ion molalities [mol/kg water].
///
/// Every tracked ion has a slot; unspecified ions are zero. Values are validated
/// once at construction and the composition is immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct SolutionComposition {
    molalities: [f64; Ion::COUNT],
}

impl SolutionComposition {
    /// Pure water.
    pub fn pure_water() -> Self {
        Self::default()
    }

    /// Create a composition from `(ion, molality)` pairs.
    ///
    /// Rejects negative and non-finite molalities, and ions given more than once
    /// (including under alternate labels such as `Ca+2` and `Ca2+`).
    pub fn new(molalities: impl IntoIterator<Item = (Ion, f64)>) -> BrineResult<Self> {
        let mut slots = [0.0; Ion::COUNT];
        let mut seen = [false; Ion::COUNT];
        for (ion, m) in molalities {
            if std::mem::replace(&mut seen[ion as usize], true) {
                return Err(BrineError::invalid(format!("ion {} given more than once", ion)));
            }
            if !m.is_finite() {
                return Err(BrineError::invalid(format!(
                    "non-finite molality for {}",
                    ion
                )));
            }
            if m < 0.0 {
                return Err(BrineError::invalid(format!(
                    "negative molality {} for {}",
                    m, ion
                )));
            }
            slots[ion as usize] = m;
        }
        Ok(Self { molalities: slots })
    }

    /// Create a composition from label-keyed molalities (`"Na+" -> 0.469`).
    pub fn from_labels<'a>(
        labels: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> BrineResult<Self> {
        let pairs = labels
            .into_iter()
            .map(|(label, m)| {
                label
                    .parse::<Ion>()
                    .map(|ion| (ion, m))
                    .map_err(BrineError::invalid)
            })
            .collect::<BrineResult<Vec<_>>>()?;
        Self::new(pairs)
    }

    /// Molality of an ion (0.0 if not specified).
    pub fn molality(&self, ion: Ion) -> f64 {
        self.molalities[ion as usize]
    }

    /// Iterate over all tracked ions, including zero entries.
    pub fn iter(&self) -> impl Iterator<Item = (Ion, f64)> + '_ {
        Ion::ALL.iter().map(|ion| (*ion, self.molality(*ion)))
    }

    /// True when every molality is zero.
    pub fn is_pure_water(&self) -> bool {
        self.molalities.iter().all(|m| *m == 0.0)
    }

    /// Stoichiometric ionic strength, I = ½ Σ mᵢ zᵢ² [mol/kgw].
    pub fn ionic_strength(&self) -> f64 {
        0.5 * self
            .iter()
            .map(|(ion, m)| m * f64::from(ion.charge() * ion.charge()))
            .sum::<f64>()
    }

    /// Dissolved solute mass per kg of water [g].
    pub fn solute_mass_g_per_kgw(&self) -> f64 {
        self.iter().map(|(ion, m)| m * ion.molar_mass()).sum()
    }
}

impl TryFrom<BTreeMap<String, f64>> for SolutionComposition {
    type Error = BrineError;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::from_labels(map.iter().map(|(k, v)| (k.as_str(), *v)))
    }
}

impl From<SolutionComposition> for BTreeMap<String, f64> {
    fn from(comp: SolutionComposition) -> Self {
        comp.iter()
            .map(|(ion, m)| (ion.label().to_string(), m))
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn ionic_strength_is_non_negative(ms in prop::collection::vec(0.0_f64..5.0, 8)) {
            let comp = SolutionComposition::new(Ion::ALL.iter().copied().zip(ms)).unwrap();
            prop_assert!(comp.ionic_strength() >= 0.0);
        }
    }
}
