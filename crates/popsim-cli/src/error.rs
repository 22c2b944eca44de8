//! Error types for the `popsim` binary.

use popsim_core::RunnerError;

use crate::output::OutputError;

/// Top-level error for the `popsim` binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: popsim_core::ConfigError,
    },

    /// The configured parameters were rejected.
    #[error("invalid parameters: {source}")]
    Parameters {
        /// The underlying validation error.
        #[from]
        source: popsim_core::ConfigurationError,
    },

    /// The simulator could not be built.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: popsim_core::SimulationError,
    },

    /// The run failed while stepping or writing records.
    #[error("run failed: {source}")]
    Run {
        /// The underlying runner error.
        #[from]
        source: RunnerError<OutputError>,
    },

    /// Output could not be opened or flushed.
    #[error("output error: {source}")]
    Output {
        /// The underlying output error.
        #[from]
        source: OutputError,
    },

    /// The output file could not be created.
    #[error("cannot create {path}: {source}")]
    CreateOutput {
        /// Requested output path.
        path: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
