//! `popsim`: run a two-sex population simulation and write per-step statistics.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments
//! 2. Initialize structured logging on stderr at `info` (or `RUST_LOG`)
//! 3. Load configuration (YAML file or built-in defaults), apply overrides,
//!    then switch the log filter to the configured level
//! 4. Build the simulator from the validated parameters
//! 5. Run to completion, writing CSV or JSON lines to the chosen output
//! 6. Log the run summary and wall-clock run time

mod error;
mod output;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Local;
use clap::Parser;
use popsim_core::{PopulationSimulator, SimulationConfig, run_simulation, runner};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::error::CliError;
use crate::output::{CsvSink, JsonLinesSink, OutputFormat};

/// Log level in force until the configuration has been read.
const STARTUP_LOG_LEVEL: &str = "info";

type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Parser, Debug)]
#[command(name = "popsim")]
#[command(about = "Simulate a two-sex population with stochastic births, deaths and migration")]
struct Args {
    /// YAML configuration file (built-in defaults if not specified)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file path (standard output if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output encoding
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// Random seed (overrides the configuration and `POPSIM_SEED`)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of timesteps to simulate (overrides the configuration)
    #[arg(short, long)]
    duration: Option<u64>,
}

fn main() -> Result<(), CliError> {
    let args = Args::parse();
    let filter = init_logging();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }
    if let Some(duration) = args.duration {
        config.simulation.duration = duration;
    }

    if let Some(handle) = &filter {
        apply_log_level(handle, &config.logging.level);
    }
    info!(
        config = ?args.config,
        output = ?args.output,
        format = ?args.format,
        seed = config.simulation.seed,
        duration = config.simulation.duration,
        late_events = ?config.simulation.late_events,
        "popsim starting"
    );

    let params = config.parameters()?;
    let mut simulation = PopulationSimulator::new(params)?;
    let destination = open_output(args.output.as_deref())?;

    let tic = Instant::now();
    let summary = match args.format {
        OutputFormat::Csv => {
            let mut sink = CsvSink::new(destination, Local::now())?;
            let summary = run_simulation(&mut simulation, &mut sink)?;
            sink.finish()?;
            summary
        }
        OutputFormat::Json => {
            let mut sink = JsonLinesSink::new(destination);
            let summary = run_simulation(&mut simulation, &mut sink)?;
            sink.finish()?;
            summary
        }
    };

    runner::log_run_end(&summary);
    info!(run_time_ms = tic.elapsed().as_millis(), "Run time");
    Ok(())
}

/// Install the global subscriber. Structured logs go to stderr so stdout
/// can carry the records.
///
/// Returns a handle for the configured level, or `None` when `RUST_LOG`
/// fixes the filter.
fn init_logging() -> Option<FilterHandle> {
    let (subscriber, handle) = subscriber(EnvFilter::try_from_default_env().ok());
    subscriber.init();
    handle
}

fn subscriber(
    from_env: Option<EnvFilter>,
) -> (
    impl tracing::Subscriber + Send + Sync + 'static,
    Option<FilterHandle>,
) {
    let pinned = from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(STARTUP_LOG_LEVEL));
    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr),
    );
    (subscriber, (!pinned).then_some(handle))
}

fn apply_log_level(handle: &FilterHandle, level: &str) {
    if let Err(error) = handle.reload(EnvFilter::new(level)) {
        warn!(%error, level, "Could not apply configured log level");
    }
}

fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>, CliError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|source| CliError::CreateOutput {
                path: path.display().to_string(),
                source,
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(std::io::stdout().lock()))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn arguments_parse_with_overrides() {
        let args = Args::try_parse_from([
            "popsim",
            "--config",
            "run.yaml",
            "--format",
            "json",
            "--seed",
            "9",
            "--duration",
            "12",
        ])
        .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("run.yaml")));
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.duration, Some(12));
        assert!(args.output.is_none());
    }

    #[test]
    fn defaults_to_csv_on_stdout() {
        let args = Args::try_parse_from(["popsim"]).unwrap();
        assert_eq!(args.format, OutputFormat::Csv);
        assert!(args.output.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn warnings_are_visible_before_the_config_is_read() {
        let (subscriber, handle) = subscriber(None);
        assert!(handle.is_some());
        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(tracing::Level::WARN));
            assert!(!tracing::enabled!(tracing::Level::DEBUG));
        });
    }

    #[test]
    fn rust_log_keeps_its_filter() {
        let (_subscriber, handle) = subscriber(Some(EnvFilter::new("error")));
        assert!(handle.is_none());
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Args::try_parse_from(["popsim", "--format", "xml"]).is_err());
    }
}
