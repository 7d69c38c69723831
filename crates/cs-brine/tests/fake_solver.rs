//! End-to-end dispatch against a scripted stand-in for the phreeqc binary.
#![cfg(unix)]

use cs_brine::{
    BrineError, Dispatcher, Ion, Mineral, MineralAssemblage, SimulationState, SolutionComposition,
    SolverConfig, SweepOutcome, SweepPlan, SweepRange, SweepSpec,
};
use std::collections::{BTreeSet, HashSet};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fails the native ramp, fails any state between 49 and 50 atm (5 MPa), and
/// otherwise reports the solution pressure in atm as dissolved CO2.
const PER_POINT_SOLVER: &str = r#"
grep -q REACTION_PRESSURE input.pqi && exit 2
p=$(awk '$1 == "pressure" { print $2; exit }' input.pqi)
if awk -v p="$p" 'BEGIN { exit !(p > 49 && p < 50) }'; then exit 1; fi
printf 'C(4)\tpH\tSOL_DENSITY\tla_Na+\tla_Cl-\tEQUI_CALCITE\n%s\t4.5\t1.02\t-600\t-0.5\t-0.25\n' "$p" > output.tsv
"#;

/// Writes the initial-solution row plus one row per step for a three-step ramp.
const RAMP_SOLVER: &str = r#"
grep -q REACTION_PRESSURE input.pqi || exit 1
printf 'state\tpressure\tC(4)\ni_soln\t9.86923\t0.0\nreact\t9.86923\t0.1\nreact\t19.73846\t0.2\nreact\t29.60769\t0.3\n' > output.tsv
"#;

/// Keeps a copy of the ramp deck in `capture_dir` and writes a table whose
/// 2 MPa step is missing.
fn rock_ramp_solver(capture_dir: &Path) -> String {
    format!(
        r#"
grep -q REACTION_PRESSURE input.pqi || exit 1
cp input.pqi "{}/ramp.pqi"
printf 'state\tpressure\tC(4)\tEQUI_CALCITE\ni_soln\t9.86923\t0.0\t0\nreact\t9.86923\t0.1\t-0.01\nreact\t29.60769\t0.3\t-0.03\n' > output.tsv
"#,
        capture_dir.display()
    )
}

struct Harness {
    _bin: TempDir,
    work: TempDir,
    dispatcher: Dispatcher,
}

impl Harness {
    fn new(body: &str) -> Self {
        let bin = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let exe = write_script(bin.path(), body);
        let config = SolverConfig {
            phreeqc_executable: exe,
            database_dir: PathBuf::from("/opt/phreeqc/database"),
            work_root: Some(work.path().to_path_buf()),
            max_workers: 4,
            ..SolverConfig::default()
        };
        Self {
            _bin: bin,
            work,
            dispatcher: Dispatcher::new(config).unwrap(),
        }
    }

    fn leftover_workdirs(&self) -> usize {
        std::fs::read_dir(self.work.path()).unwrap().count()
    }
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("phreeqc");
    std::fs::write(&path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn brine() -> SolutionComposition {
    SolutionComposition::new([(Ion::Na, 1.0), (Ion::Cl, 1.0)]).unwrap()
}

#[test]
fn pressure_sweep_contains_one_failure() {
    let h = Harness::new(PER_POINT_SOLVER);
    let spec = SweepSpec::new(
        SweepPlan::Pressure {
            temperature_k: 323.15,
            pressure: SweepRange::new(1.0, 10.0, 1.0),
        },
        "phreeqc_phreeqc",
        brine(),
    );
    let SweepOutcome::OneAxis(sweep) = h.dispatcher.sweep(&spec).unwrap() else {
        panic!("expected one-axis sweep");
    };

    assert_eq!(sweep.points.len(), 10);
    assert_eq!(sweep.num_failed(), 1);
    let failed = &sweep.points[4];
    assert_eq!(failed.value, 5.0);
    assert_eq!(failed.dissolved_co2, 0.0);
    assert!(failed.status.is_failed());

    for point in sweep.points.iter().filter(|p| !p.status.is_failed()) {
        let expected_atm = point.value * 9.86923;
        assert!((point.dissolved_co2 - expected_atm).abs() < 1e-6);
    }
    assert_eq!(h.leftover_workdirs(), 0);
}

#[test]
fn native_ramp_pairs_rows_by_pressure() {
    let h = Harness::new(RAMP_SOLVER);
    let spec = SweepSpec::new(
        SweepPlan::Pressure {
            temperature_k: 300.0,
            pressure: SweepRange::new(1.0, 3.0, 1.0),
        },
        "pitzer",
        brine(),
    );
    let SweepOutcome::OneAxis(sweep) = h.dispatcher.sweep(&spec).unwrap() else {
        panic!("expected one-axis sweep");
    };
    assert_eq!(sweep.axis_values(), vec![1.0, 2.0, 3.0]);
    assert_eq!(sweep.dissolved_co2(), vec![0.1, 0.2, 0.3]);
    assert_eq!(sweep.num_failed(), 0);
}

#[test]
fn brine_rock_ramp_runs_one_deck_and_fails_the_missing_step() {
    let capture = tempfile::tempdir().unwrap();
    let h = Harness::new(&rock_ramp_solver(capture.path()));
    let rock = MineralAssemblage::new([(Mineral::Calcite, 1.0), (Mineral::Quartz, -1.0)]).unwrap();
    let spec = SweepSpec::new(
        SweepPlan::Pressure {
            temperature_k: 323.15,
            pressure: SweepRange::new(1.0, 3.0, 1.0),
        },
        "phreeqc",
        brine(),
    )
    .with_minerals(rock);
    let SweepOutcome::OneAxis(sweep) = h.dispatcher.sweep(&spec).unwrap() else {
        panic!("expected one-axis sweep");
    };

    assert_eq!(sweep.axis_values(), vec![1.0, 2.0, 3.0]);
    assert_eq!(sweep.dissolved_co2(), vec![0.1, 0.0, 0.3]);
    assert_eq!(sweep.num_failed(), 1);
    assert!(sweep.points[1].status.is_failed());
    assert_eq!(h.leftover_workdirs(), 0);

    let deck = std::fs::read_to_string(capture.path().join("ramp.pqi")).unwrap();
    assert!(deck.contains("EQUILIBRIUM_PHASES 1\n"));
    assert!(deck.contains("    Calcite        0   1\n"));
    assert!(deck.contains("    #Quartz       0   0\n"));
    assert!(deck.contains("REACTION_PRESSURE 1\n    9.86923 19.73846 29.60769\n"));
    assert!(deck.contains("EQUI_CALCITE"));
    assert!(!deck.contains("__"));
}

#[test]
fn grid_cells_are_unique() {
    let h = Harness::new(PER_POINT_SOLVER);
    let spec = SweepSpec::new(
        SweepPlan::Grid {
            temperature: SweepRange::new(300.0, 320.0, 10.0),
            pressure: SweepRange::new(1.0, 2.0, 1.0),
        },
        "phreeqc",
        brine(),
    );
    let SweepOutcome::Grid(grid) = h.dispatcher.sweep(&spec).unwrap() else {
        panic!("expected grid");
    };
    assert_eq!(grid.cells.len(), 6);
    let ij: HashSet<(usize, usize)> = grid.cells.iter().map(|c| (c.i, c.j)).collect();
    assert_eq!(ij.len(), 6);
    assert!(grid.cells.iter().all(|c| c.i < 3 && c.j < 2 && c.dissolved_co2 > 0.0));
}

#[test]
fn single_state_parses_final_row_and_floors_activities() {
    let h = Harness::new(PER_POINT_SOLVER);
    let state = SimulationState::new(298.15, 1.0, brine(), "phreeqc_phreeqc").unwrap();
    let result = h.dispatcher.single_state(&state).unwrap();

    assert!((result.dissolved_co2 - 9.86923).abs() < 1e-9);
    assert_eq!(result.ph, 4.5);
    assert_eq!(result.density, 1.02);
    assert_eq!(result.species(Ion::Na).unwrap().activity, 0.0);
    assert_eq!(result.species(Ion::Cl).unwrap().activity, 0.3162);
    assert_eq!(result.species(Ion::K).unwrap().activity, 0.0);
    assert!(result.minerals.is_none());
}

#[test]
fn single_state_failure_is_surfaced() {
    let h = Harness::new(PER_POINT_SOLVER);
    let state = SimulationState::new(298.15, 5.0, brine(), "phreeqc_phreeqc").unwrap();
    let err = h.dispatcher.single_state(&state).unwrap_err();
    assert!(matches!(err, BrineError::BackendExecution { .. }));
    assert_eq!(h.leftover_workdirs(), 0);
}

#[test]
fn pure_water_is_deterministic() {
    let h = Harness::new(PER_POINT_SOLVER);
    let state =
        SimulationState::new(323.15, 2.0, SolutionComposition::pure_water(), "phreeqc").unwrap();
    let a = h.dispatcher.single_state(&state).unwrap();
    let b = h.dispatcher.single_state(&state).unwrap();
    assert_eq!(a, b);
}

#[test]
fn mineral_key_set_is_preserved() {
    let h = Harness::new(PER_POINT_SOLVER);
    let rock = MineralAssemblage::new([
        (Mineral::Calcite, 1.0),
        (Mineral::Quartz, -1.0),
        (Mineral::Dolomite, 0.5),
    ])
    .unwrap();
    let state = SimulationState::new(333.15, 1.0, brine(), "phreeqc_pitzer")
        .unwrap()
        .with_minerals(rock);
    let result = h.dispatcher.single_state(&state).unwrap();
    let minerals = result.minerals.unwrap();

    let keys: BTreeSet<Mineral> = minerals.keys().copied().collect();
    assert_eq!(
        keys,
        BTreeSet::from([Mineral::Calcite, Mineral::Quartz, Mineral::Dolomite])
    );
    assert_eq!(minerals[&Mineral::Calcite].delta, -0.25);
    assert_eq!(minerals[&Mineral::Calcite].final_moles, 0.75);
    assert_eq!(minerals[&Mineral::Quartz].delta, 0.0);
    assert_eq!(minerals[&Mineral::Quartz].final_moles, 0.0);
    // No EQUI_DOLOMITE column in the table.
    assert_eq!(minerals[&Mineral::Dolomite].delta, 0.0);
    assert_eq!(minerals[&Mineral::Dolomite].final_moles, 0.5);
}

#[test]
fn rendered_decks_are_byte_identical() {
    let h = Harness::new(PER_POINT_SOLVER);
    let state = SimulationState::new(310.0, 7.5, brine(), "phreeqc").unwrap();
    let a = h.dispatcher.render_deck(&state).unwrap();
    let b = h.dispatcher.render_deck(&state).unwrap();
    assert_eq!(a.script.as_bytes(), b.script.as_bytes());
    assert!(a.script.starts_with("DATABASE /opt/phreeqc/database/phreeqc.dat"));
}
