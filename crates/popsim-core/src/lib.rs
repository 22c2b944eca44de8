//! Event scheduling and time-stepping engine for the two-sex population simulator.
//!
//! Every person's life is sampled in full when they are created: an exit
//! (death or emigration, whichever competing draw comes first) and, for
//! women, a renewal sequence of births. Those events are filed into a
//! time-indexed schedule, and the simulator advances one timestep at a time,
//! turning the events of that step into membership changes and statistics.
//!
//! # Modules
//!
//! - [`random`] -- Seeded uniform, exponential, normal and Bernoulli draws.
//! - [`rates`] -- Affine rate functions and their validation over a horizon.
//! - [`parameters`] -- Per-sex and immigration parameter bundles.
//! - [`person`] -- Sampling of exit events and birth renewals.
//! - [`schedule`] -- Per-timestep event buckets with consume-once semantics.
//! - [`immigration`] -- The shared immigration clock and immigrant ages.
//! - [`simulator`] -- [`PopulationSimulator`], the stepping state machine.
//! - [`controller`] -- [`SimulationController`] for host environments.
//! - [`runner`] -- [`run_simulation`] and the [`StepSink`] output seam.
//! - [`config`] -- YAML configuration into typed structs.
//! - [`error`] -- Validation and state-machine errors.
//!
//! [`PopulationSimulator`]: simulator::PopulationSimulator
//! [`SimulationController`]: controller::SimulationController
//! [`run_simulation`]: runner::run_simulation
//! [`StepSink`]: runner::StepSink

pub mod config;
pub mod controller;
pub mod error;
pub mod immigration;
pub mod parameters;
pub mod person;
pub mod random;
pub mod rates;
pub mod runner;
pub mod schedule;
pub mod simulator;

pub use config::{ConfigError, SimulationConfig};
pub use controller::SimulationController;
pub use error::{ConfigurationError, SimulationError};
pub use parameters::{
    ImmigrationParameters, LateEventPolicy, PopulationParameters, ScalarParameters,
    SimulationParameters,
};
pub use rates::{RateFunction, RateProcess};
pub use runner::{RunSummary, RunnerError, StepSink, run_simulation};
pub use simulator::PopulationSimulator;
