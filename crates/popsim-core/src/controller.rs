//! Host-facing control surface.
//!
//! [`SimulationController`] is the thin wrapper an embedding environment
//! drives: plain-array step records, a column header, and "change one
//! parameter then start a fresh run" helpers for exploring parameter points
//! one run at a time.

use std::path::Path;

use popsim_types::{STAT_COUNT, StepStatistics};
use tracing::warn;

use crate::config::{ConfigError, SimulationConfig};
use crate::error::SimulationError;
use crate::parameters::{ScalarParameters, SimulationParameters};
use crate::simulator::PopulationSimulator;

/// Step-wise driver with reset-on-change parameter helpers.
#[derive(Debug, Clone)]
pub struct SimulationController {
    simulation: PopulationSimulator,
}

impl SimulationController {
    /// Column names of the arrays returned by [`step`](Self::step).
    pub const HEADER: &'static str = StepStatistics::HEADER;

    /// Wrap a simulator built from `params`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Configuration`] if `params` is invalid.
    pub fn new(params: SimulationParameters) -> Result<Self, SimulationError> {
        Ok(Self {
            simulation: PopulationSimulator::new(params)?,
        })
    }

    /// Load a YAML configuration file and wrap the resulting simulator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let params = SimulationConfig::from_file(path)?.parameters()?;
        Ok(Self {
            simulation: PopulationSimulator::new(params)?,
        })
    }

    /// Column header of the step records.
    pub const fn header() -> &'static str {
        Self::HEADER
    }

    /// Take one step, or `None` once the run is complete.
    pub fn step(&mut self) -> Option<[u64; STAT_COUNT]> {
        self.simulation.advance().ok().map(|stats| stats.to_array())
    }

    /// Change the birth rate and start a fresh run.
    ///
    /// # Errors
    ///
    /// Refused while a run is in progress, or if the rate is invalid; the
    /// current run is left untouched.
    pub fn reset_birth_rate(&mut self, rate: f64) -> Result<(), SimulationError> {
        self.simulation
            .set_birth_rate(rate)
            .inspect_err(|e| warn!(error = %e, "Birth rate not changed"))?;
        self.simulation.reset();
        Ok(())
    }

    /// Change the horizon and start a fresh run.
    ///
    /// # Errors
    ///
    /// Refused while a run is in progress, or if the horizon is invalid; the
    /// current run is left untouched.
    pub fn reset_duration(&mut self, duration: u64) -> Result<(), SimulationError> {
        self.simulation
            .set_duration(duration)
            .inspect_err(|e| warn!(error = %e, "Duration not changed"))?;
        self.simulation.reset();
        Ok(())
    }

    /// Change all ten scalar rates and start a fresh run.
    ///
    /// # Errors
    ///
    /// Refused while a run is in progress, or if any rate is invalid.
    pub fn set_all_and_reset(&mut self, scalars: &ScalarParameters) -> Result<(), SimulationError> {
        self.simulation
            .set_all_and_reset(scalars)
            .inspect_err(|e| warn!(error = %e, "Scalar parameters not changed"))
    }

    /// The wrapped simulator.
    pub const fn simulation(&self) -> &PopulationSimulator {
        &self.simulation
    }

    /// Mutable access to the wrapped simulator, for the per-field setters.
    pub const fn simulation_mut(&mut self) -> &mut PopulationSimulator {
        &mut self.simulation
    }
}
