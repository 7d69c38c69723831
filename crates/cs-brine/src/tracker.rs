//! Mineral mole accounting for brine-rock runs.

use crate::minerals::{Mineral, MineralAssemblage};
use crate::result::MineralChange;
use crate::selected_output::Row;
use std::collections::BTreeMap;

/// Mole change of every mineral named in `assemblage`.
///
/// The output has exactly the input's key set. Excluded minerals report zero
/// change; included ones read their delta column from `row` (zero when absent).
pub fn mineral_changes(
    assemblage: &MineralAssemblage,
    row: Option<&Row<'_>>,
) -> BTreeMap<Mineral, MineralChange> {
    assemblage
        .iter()
        .map(|(mineral, initial)| {
            let change = if assemblage.is_included(mineral) {
                let delta = row
                    .map(|r| r.get_or(&mineral.delta_column(), 0.0))
                    .unwrap_or(0.0);
                MineralChange {
                    initial_moles: initial,
                    delta,
                    final_moles: initial + delta,
                }
            } else {
                MineralChange {
                    initial_moles: initial,
                    delta: 0.0,
                    final_moles: 0.0,
                }
            };
            (mineral, change)
        })
        .collect()
}
