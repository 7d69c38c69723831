//! Solver input decks.
//!
//! A deck is a template with `__TOKEN__` placeholders. The set of tokens is a
//! versioned schema ([`SCHEMA_VERSION`]); every template is checked against the
//! required tokens of its [`DeckKind`] before it is used, and unknown tokens are
//! rejected so a typo cannot silently reach the solver.
//!
//! Rendering is pure: the same state and settings always produce the same bytes.
//! The output file is referenced relative to the solver working directory.

use crate::error::{BrineError, BrineResult};
use crate::ions::Ion;
use crate::minerals::MineralAssemblage;
use crate::state::SimulationState;
use cs_core::round_to;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Version of the placeholder schema understood by [`DeckTemplate`].
pub const SCHEMA_VERSION: u32 = 1;

/// Selected-output file name written by every deck.
pub const OUTPUT_FILE_NAME: &str = "output.tsv";

/// Decimals kept when rendering numbers into a deck.
const DECK_DECIMALS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    Database,
    Temperature,
    Na,
    Cl,
    Ca,
    Mg,
    K,
    So4,
    Hco3,
    Co3,
    PressureAtm,
    PCo2,
    PH2o,
    PressureStepsAtm,
    OutputFile,
    MineralPhases,
}

impl Placeholder {
    pub const ALL: [Placeholder; 16] = [
        Placeholder::Database,
        Placeholder::Temperature,
        Placeholder::Na,
        Placeholder::Cl,
        Placeholder::Ca,
        Placeholder::Mg,
        Placeholder::K,
        Placeholder::So4,
        Placeholder::Hco3,
        Placeholder::Co3,
        Placeholder::PressureAtm,
        Placeholder::PCo2,
        Placeholder::PH2o,
        Placeholder::PressureStepsAtm,
        Placeholder::OutputFile,
        Placeholder::MineralPhases,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::Database => "__DATABASE__",
            Placeholder::Temperature => "__TEMPERATURE__",
            Placeholder::Na => "__NA__",
            Placeholder::Cl => "__CL__",
            Placeholder::Ca => "__CA__",
            Placeholder::Mg => "__MG__",
            Placeholder::K => "__K__",
            Placeholder::So4 => "__SO4__",
            Placeholder::Hco3 => "__HCO3__",
            Placeholder::Co3 => "__CO3__",
            Placeholder::PressureAtm => "__PRESSURE_ATM__",
            Placeholder::PCo2 => "__P_CO2__",
            Placeholder::PH2o => "__P_H2O__",
            Placeholder::PressureStepsAtm => "__PRESSURE_STEPS_ATM__",
            Placeholder::OutputFile => "__OUTPUT_FILE__",
            Placeholder::MineralPhases => "__MINERAL_PHASES__",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.token() == token)
    }

    /// Ion whose molality fills this placeholder.
    fn ion(&self) -> Option<Ion> {
        match self {
            Placeholder::Na => Some(Ion::Na),
            Placeholder::Cl => Some(Ion::Cl),
            Placeholder::Ca => Some(Ion::Ca),
            Placeholder::Mg => Some(Ion::Mg),
            Placeholder::K => Some(Ion::K),
            Placeholder::So4 => Some(Ion::So4),
            Placeholder::Hco3 => Some(Ion::Hco3),
            Placeholder::Co3 => Some(Ion::Co3),
            _ => None,
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Thermodynamic database used by the equilibrium solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolverDatabase {
    Phreeqc,
    Pitzer,
}

impl SolverDatabase {
    pub fn file_name(&self) -> &'static str {
        match self {
            SolverDatabase::Phreeqc => "phreeqc.dat",
            SolverDatabase::Pitzer => "pitzer.dat",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeckKind {
    Brine,
    BrinePressureRamp,
    BrineRock,
    BrineRockPressureRamp,
}

const COMMON_TOKENS: [Placeholder; 13] = [
    Placeholder::Database,
    Placeholder::Temperature,
    Placeholder::Na,
    Placeholder::Cl,
    Placeholder::Ca,
    Placeholder::Mg,
    Placeholder::K,
    Placeholder::So4,
    Placeholder::Hco3,
    Placeholder::PressureAtm,
    Placeholder::PCo2,
    Placeholder::PH2o,
    Placeholder::OutputFile,
];

impl DeckKind {
    pub fn select(brine_rock: bool, pressure_ramp: bool) -> Self {
        match (brine_rock, pressure_ramp) {
            (false, false) => DeckKind::Brine,
            (false, true) => DeckKind::BrinePressureRamp,
            (true, false) => DeckKind::BrineRock,
            (true, true) => DeckKind::BrineRockPressureRamp,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeckKind::Brine => "brine",
            DeckKind::BrinePressureRamp => "brine_pressure_ramp",
            DeckKind::BrineRock => "brine_rock",
            DeckKind::BrineRockPressureRamp => "brine_rock_pressure_ramp",
        }
    }

    pub fn is_pressure_ramp(&self) -> bool {
        matches!(
            self,
            DeckKind::BrinePressureRamp | DeckKind::BrineRockPressureRamp
        )
    }

    pub fn is_brine_rock(&self) -> bool {
        matches!(self, DeckKind::BrineRock | DeckKind::BrineRockPressureRamp)
    }

    /// Tokens a template of this kind must contain.
    pub fn required(&self) -> BTreeSet<Placeholder> {
        let mut tokens: BTreeSet<Placeholder> = COMMON_TOKENS.into_iter().collect();
        if self.is_pressure_ramp() {
            tokens.insert(Placeholder::PressureStepsAtm);
        }
        if self.is_brine_rock() {
            tokens.insert(Placeholder::MineralPhases);
        }
        tokens
    }

    /// File name looked up in a template override directory.
    pub fn template_file_name(&self) -> &'static str {
        match self {
            DeckKind::Brine => "co2_brine.pqi",
            DeckKind::BrinePressureRamp => "co2_brine_pressure_ramp.pqi",
            DeckKind::BrineRock => "co2_brine_rock.pqi",
            DeckKind::BrineRockPressureRamp => "co2_brine_rock_pressure_ramp.pqi",
        }
    }

    fn builtin_source(&self) -> &'static str {
        match self {
            DeckKind::Brine => include_str!("../templates/co2_brine.pqi"),
            DeckKind::BrinePressureRamp => include_str!("../templates/co2_brine_pressure_ramp.pqi"),
            DeckKind::BrineRock => include_str!("../templates/co2_brine_rock.pqi"),
            DeckKind::BrineRockPressureRamp => {
                include_str!("../templates/co2_brine_rock_pressure_ramp.pqi")
            }
        }
    }
}

impl fmt::Display for DeckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One piece of a template: literal text or a placeholder.
enum Segment<'a> {
    Text(&'a str),
    Token(&'a str),
}

/// Split a template into literal text and `__TOKEN__` candidates.
///
/// A candidate is `__`, an uppercase letter, then uppercase letters, digits or
/// underscores, ending in `__`.
fn segments(source: &str) -> Vec<Segment<'_>> {
    let bytes = source.as_bytes();
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'_' && bytes[i + 1] == b'_' && bytes.get(i + 2).is_some_and(u8::is_ascii_uppercase) {
            let mut end = i + 2;
            while end < bytes.len()
                && (bytes[end].is_ascii_uppercase()
                    || bytes[end].is_ascii_digit()
                    || bytes[end] == b'_')
            {
                end += 1;
            }
            let candidate = &source[i..end];
            if candidate.len() > 4 && candidate.ends_with("__") {
                if text_start < i {
                    out.push(Segment::Text(&source[text_start..i]));
                }
                out.push(Segment::Token(candidate));
                text_start = end;
                i = end;
                continue;
            }
        }
        i += 1;
    }
    if text_start < source.len() {
        out.push(Segment::Text(&source[text_start..]));
    }
    out
}

/// A validated template for one deck kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckTemplate {
    kind: DeckKind,
    source: String,
}

impl DeckTemplate {
    /// Validate `source` against the schema for `kind`.
    pub fn new(kind: DeckKind, source: impl Into<String>) -> BrineResult<Self> {
        let source = source.into();
        Self::validate(kind, &source)?;
        Ok(Self { kind, source })
    }

    pub fn builtin(kind: DeckKind) -> BrineResult<Self> {
        Self::new(kind, kind.builtin_source())
    }

    /// Template from `dir` when it holds an override for `kind`, else the built-in one.
    pub fn load(kind: DeckKind, dir: Option<&Path>) -> BrineResult<Self> {
        if let Some(dir) = dir {
            let path = dir.join(kind.template_file_name());
            if path.is_file() {
                debug!(kind = %kind, path = %path.display(), "Loading deck template override");
                let source = std::fs::read_to_string(&path).map_err(|e| BrineError::io(&path, e))?;
                return Self::new(kind, source);
            }
        }
        Self::builtin(kind)
    }

    pub fn validate(kind: DeckKind, source: &str) -> BrineResult<()> {
        let mut found = BTreeSet::new();
        for segment in segments(source) {
            if let Segment::Token(token) = segment {
                let placeholder =
                    Placeholder::from_token(token).ok_or_else(|| BrineError::Template {
                        kind: kind.name(),
                        message: format!(
                            "unrecognized placeholder {} (schema version {})",
                            token, SCHEMA_VERSION
                        ),
                    })?;
                found.insert(placeholder);
            }
        }
        let missing: Vec<&str> = kind
            .required()
            .difference(&found)
            .map(|p| p.token())
            .collect();
        if !missing.is_empty() {
            return Err(BrineError::Template {
                kind: kind.name(),
                message: format!("missing required placeholders: {}", missing.join(", ")),
            });
        }
        Ok(())
    }

    pub fn kind(&self) -> DeckKind {
        self.kind
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Substitute every placeholder in one pass.
    pub fn render(&self, values: &DeckValues) -> String {
        segments(&self.source)
            .into_iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.to_string(),
                Segment::Token(token) => Placeholder::from_token(token)
                    .map(|p| values.value(p))
                    .unwrap_or_else(|| token.to_string()),
            })
            .collect()
    }
}

fn num(v: f64) -> String {
    format!("{}", round_to(v, DECK_DECIMALS))
}

/// Rendered placeholder values for one solver invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckValues {
    database: PathBuf,
    state: SimulationState,
    pressure_steps_mpa: Option<Vec<f64>>,
    output_file: String,
}

impl DeckValues {
    pub fn new(database: PathBuf, state: SimulationState) -> Self {
        Self {
            database,
            state,
            pressure_steps_mpa: None,
            output_file: OUTPUT_FILE_NAME.to_string(),
        }
    }

    pub fn with_pressure_steps(mut self, steps_mpa: Vec<f64>) -> Self {
        self.pressure_steps_mpa = Some(steps_mpa);
        self
    }

    pub fn value(&self, placeholder: Placeholder) -> String {
        if let Some(ion) = placeholder.ion() {
            return num(self.state.composition.molality(ion));
        }
        match placeholder {
            Placeholder::Database => self.database.display().to_string(),
            Placeholder::Temperature => num(self.state.temperature_c()),
            Placeholder::PressureAtm => num(self.state.pressure_atm()),
            Placeholder::PCo2 => num(self.state.p_co2_atm()),
            Placeholder::PH2o => num(self.state.p_h2o_atm()),
            Placeholder::PressureStepsAtm => match &self.pressure_steps_mpa {
                Some(steps) => steps
                    .iter()
                    .map(|p| num(cs_core::mpa_to_atm(*p)))
                    .collect::<Vec<_>>()
                    .join(" "),
                None => num(self.state.pressure_atm()),
            },
            Placeholder::OutputFile => self.output_file.clone(),
            Placeholder::MineralPhases => self
                .state
                .minerals
                .as_ref()
                .map(MineralAssemblage::render_phase_block)
                .unwrap_or_else(|| MineralAssemblage::default().render_phase_block()),
            _ => String::new(),
        }
    }
}

/// A rendered solver script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deck {
    pub kind: DeckKind,
    pub schema_version: u32,
    pub script: String,
}

/// Loads templates and renders decks for one database.
#[derive(Debug, Clone)]
pub struct DeckBuilder {
    database_dir: PathBuf,
    template_dir: Option<PathBuf>,
}

impl DeckBuilder {
    pub fn new(database_dir: impl Into<PathBuf>, template_dir: Option<PathBuf>) -> Self {
        Self {
            database_dir: database_dir.into(),
            template_dir,
        }
    }

    pub fn database_path(&self, database: SolverDatabase) -> PathBuf {
        self.database_dir.join(database.file_name())
    }

    /// Fixed-state deck; brine-rock when the state carries minerals.
    pub fn build(&self, database: SolverDatabase, state: &SimulationState) -> BrineResult<Deck> {
        let kind = DeckKind::select(state.is_brine_rock(), false);
        let values = DeckValues::new(self.database_path(database), state.clone());
        self.render(kind, &values)
    }

    /// Pressure-ramp deck: the state's pressure seeds the gas phase, then the
    /// solver steps through `steps_mpa`.
    pub fn build_pressure_ramp(
        &self,
        database: SolverDatabase,
        state: &SimulationState,
        steps_mpa: &[f64],
    ) -> BrineResult<Deck> {
        if steps_mpa.is_empty() {
            return Err(BrineError::invalid("pressure ramp needs at least one step"));
        }
        let kind = DeckKind::select(state.is_brine_rock(), true);
        let values = DeckValues::new(self.database_path(database), state.clone())
            .with_pressure_steps(steps_mpa.to_vec());
        self.render(kind, &values)
    }

    fn render(&self, kind: DeckKind, values: &DeckValues) -> BrineResult<Deck> {
        let template = DeckTemplate::load(kind, self.template_dir.as_deref())?;
        let script = template.render(values);
        debug!(kind = %kind, bytes = script.len(), "Rendered solver deck");
        Ok(Deck {
            kind,
            schema_version: SCHEMA_VERSION,
            script,
        })
    }
}
