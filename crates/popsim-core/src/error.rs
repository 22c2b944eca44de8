//! Error types for the simulation core.
//!
//! Two families exist. [`ConfigurationError`] is raised when a parameter set
//! is validated (at construction or when a parameter is mutated) and never
//! during stepping. [`SimulationError`] covers misuse of the state machine:
//! stepping past the horizon or mutating parameters mid-run.

use crate::rates::RateProcess;

/// A parameter set that cannot drive a simulation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// An affine rate evaluates below zero somewhere in the horizon.
    #[error(
        "{process} rate would be {value} at t = {time} (base {base}, slope {slope}); \
         rates must stay non-negative"
    )]
    NegativeRate {
        /// Which process the rate governs.
        process: RateProcess,
        /// Timestep at which the rate goes negative.
        time: u64,
        /// The computed rate.
        value: f64,
        /// Rate at time zero.
        base: f64,
        /// Change of the rate per timestep.
        slope: f64,
    },

    /// The birth rate reaches or exceeds 1 somewhere in the horizon.
    #[error(
        "birth rate would be {value} at t = {time} (base {base}, slope {slope}); \
         birth rates must stay below 1"
    )]
    BirthRateTooHigh {
        /// Timestep at which the bound is violated.
        time: u64,
        /// The computed rate.
        value: f64,
        /// Rate at time zero.
        base: f64,
        /// Change of the rate per timestep.
        slope: f64,
    },

    /// The simulation horizon is empty.
    #[error("duration must be at least one timestep")]
    ZeroDuration,

    /// A scalar parameter is out of its domain (NaN, infinite, or out of range).
    #[error("invalid {field}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        field: &'static str,
        /// Explanation of what is wrong with it.
        reason: String,
    },
}

/// Misuse of the simulator's state machine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    /// A parameter change failed validation.
    #[error("configuration error: {source}")]
    Configuration {
        /// The underlying validation failure.
        #[from]
        source: ConfigurationError,
    },

    /// A parameter change was refused because a run is in progress.
    #[error("cannot change {field} while the simulation is running (t = {time})")]
    RunInProgress {
        /// The parameter the caller tried to change.
        field: &'static str,
        /// Current simulation time.
        time: u64,
    },

    /// `advance` was called after the last timestep.
    #[error("simulation already completed all {duration} timesteps; reset before advancing")]
    Completed {
        /// Horizon of the completed run.
        duration: u64,
    },
}
