use clap::{Args, Parser, Subcommand, ValueEnum};
use cs_app::{
    AppError, AppResult, AxisInput, QuantityInput, Service, StateRequest, SweepRequest,
    load_request,
};
use cs_brine::SweepRange;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carbosol")]
#[command(about = "CarboSol CLI - CO2 solubility in brines and brine-rock systems", long_about = None)]
struct Cli {
    /// Solver config YAML (defaults to $CARBOSOL_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Debug logging (otherwise RUST_LOG, default info)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one temperature/pressure state
    State {
        #[command(flatten)]
        input: StateInput,
        /// What to report
        #[arg(long, value_enum, default_value_t = StateReport::Properties)]
        report: StateReport,
    },
    /// Sweep temperature, pressure or both
    #[command(subcommand)]
    Sweep(SweepCommands),
    /// List registered models and their aliases
    Models,
    /// Print the solver deck for a state
    Deck {
        #[command(flatten)]
        input: StateInput,
    },
}

#[derive(Subcommand)]
enum SweepCommands {
    /// Pressure sweep at fixed temperature
    Pressure(SweepInput),
    /// Temperature sweep at fixed pressure
    Temperature(SweepInput),
    /// Temperature x pressure grid
    Grid(SweepInput),
}

#[derive(Clone, Copy, ValueEnum)]
enum StateReport {
    /// Full solution properties (with mineral changes when minerals are given)
    Properties,
    /// Dissolved CO2 and mineral deltas only
    Co2,
}

#[derive(Args)]
struct SampleFlags {
    /// Model identifier
    #[arg(long, short)]
    model: Option<String>,
    /// Ion molality, e.g. --ion Na+=0.5 (repeatable)
    #[arg(long = "ion", value_parser = parse_pair)]
    ions: Vec<(String, f64)>,
    /// Initial mineral moles, e.g. --mineral Calcite=1 (repeatable; negative excludes)
    #[arg(long = "mineral", value_parser = parse_pair)]
    minerals: Vec<(String, f64)>,
}

#[derive(Args)]
struct StateInput {
    /// JSON or YAML request file
    #[arg(long, short, conflicts_with_all = ["temperature", "pressure"])]
    request: Option<PathBuf>,
    /// Temperature, e.g. 323.15 (K) or "50 C"
    #[arg(long, short)]
    temperature: Option<String>,
    /// Pressure, e.g. 10 (MPa) or "100 bar"
    #[arg(long, short)]
    pressure: Option<String>,
    #[command(flatten)]
    sample: SampleFlags,
}

#[derive(Args)]
struct SweepInput {
    /// JSON or YAML request file
    #[arg(long, short, conflicts_with_all = ["temperature", "pressure"])]
    request: Option<PathBuf>,
    /// Temperature [K]: a value or start:end:step
    #[arg(long, short, value_parser = parse_axis)]
    temperature: Option<AxisInput>,
    /// Pressure [MPa]: a value or start:end:step
    #[arg(long, short, value_parser = parse_axis)]
    pressure: Option<AxisInput>,
    #[command(flatten)]
    sample: SampleFlags,
}

fn main() -> AppResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let service = Service::from_config_path(cli.config.as_deref())?;
    debug!(
        executable = %service.config().phreeqc_executable.display(),
        workers = service.config().workers(),
        "Service ready"
    );

    match cli.command {
        Commands::State { input, report } => cmd_state(&service, input, report),
        Commands::Sweep(sweep) => cmd_sweep(&service, sweep),
        Commands::Models => print_json(&service.list_models()),
        Commands::Deck { input } => {
            let deck = service.render_deck(&state_request(input)?)?;
            print!("{}", deck.script);
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_state(service: &Service, input: StateInput, report: StateReport) -> AppResult<()> {
    let request = state_request(input)?;
    match report {
        StateReport::Co2 => print_json(&service.fixed_state(&request)?),
        StateReport::Properties if request.sample.has_minerals() => {
            print_json(&service.brine_rock_properties(&request)?)
        }
        StateReport::Properties => print_json(&service.solution_properties(&request)?),
    }
}

fn cmd_sweep(service: &Service, sweep: SweepCommands) -> AppResult<()> {
    match sweep {
        SweepCommands::Pressure(input) => print_json(&service.pressure_sweep(&sweep_request(input)?)?),
        SweepCommands::Temperature(input) => {
            print_json(&service.temperature_sweep(&sweep_request(input)?)?)
        }
        SweepCommands::Grid(input) => print_json(&service.grid_sweep(&sweep_request(input)?)?),
    }
}

fn state_request(input: StateInput) -> AppResult<StateRequest> {
    let mut request = match input.request {
        Some(path) => load_request(&path)?,
        None => {
            let (Some(t), Some(p)) = (input.temperature, input.pressure) else {
                return Err(AppError::InvalidInput(
                    "give --request or both --temperature and --pressure".to_string(),
                ));
            };
            StateRequest::new(quantity(t), quantity(p))
        }
    };
    apply_sample_flags(
        &mut request.model,
        &mut request.sample.composition,
        &mut request.sample.minerals,
        input.sample,
    );
    Ok(request)
}

fn sweep_request(input: SweepInput) -> AppResult<SweepRequest> {
    let mut request = match input.request {
        Some(path) => load_request(&path)?,
        None => SweepRequest {
            temperature: input.temperature,
            pressure: input.pressure,
            ..SweepRequest::new(cs_app::DEFAULT_MODEL)
        },
    };
    apply_sample_flags(
        &mut request.model,
        &mut request.sample.composition,
        &mut request.sample.minerals,
        input.sample,
    );
    Ok(request)
}

/// Flags add to (or override entries of) whatever the request file gave.
fn apply_sample_flags(
    model: &mut String,
    composition: &mut BTreeMap<String, f64>,
    minerals: &mut Option<BTreeMap<String, f64>>,
    flags: SampleFlags,
) {
    if let Some(m) = flags.model {
        *model = m;
    }
    composition.extend(flags.ions);
    if !flags.minerals.is_empty() {
        minerals.get_or_insert_with(BTreeMap::new).extend(flags.minerals);
    }
}

fn quantity(text: String) -> QuantityInput {
    match text.trim().parse::<f64>() {
        Ok(v) => QuantityInput::Number(v),
        Err(_) => QuantityInput::Text(text),
    }
}

fn parse_pair(s: &str) -> Result<(String, f64), String> {
    let (label, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=VALUE, got '{}'", s))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad value in '{}': {}", s, e))?;
    Ok((label.trim().to_string(), value))
}

fn parse_axis(s: &str) -> Result<AxisInput, String> {
    let parts = s
        .split(':')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("bad axis '{}': {}", s, e))?;
    match parts.as_slice() {
        [v] => Ok(AxisInput::Value(*v)),
        [start, end, step] => Ok(AxisInput::Range(SweepRange::new(*start, *end, *step))),
        _ => Err(format!("expected VALUE or START:END:STEP, got '{}'", s)),
    }
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
