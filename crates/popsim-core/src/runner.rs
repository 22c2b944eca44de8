//! Run-to-completion driver.
//!
//! This module provides [`run_simulation`], which steps a
//! [`PopulationSimulator`] until its horizon is reached and hands every
//! record to a [`StepSink`]. Output writers (CSV, JSON lines, in-memory
//! collectors) implement the sink; the runner itself performs no I/O.

use popsim_types::{Sex, StepStatistics};
use tracing::info;

use crate::error::SimulationError;
use crate::simulator::PopulationSimulator;

/// Errors that can occur during a run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError<E: std::error::Error + 'static> {
    /// The simulator failed to step.
    #[error("simulation error: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: SimulationError,
    },

    /// The sink failed to accept a record.
    #[error("output sink error: {source}")]
    Sink {
        /// The underlying sink error.
        source: E,
    },
}

/// Consumer of per-step records.
pub trait StepSink {
    /// Error raised when a record cannot be consumed.
    type Error: std::error::Error + 'static;

    /// Called once per completed step, in time order.
    fn on_step(&mut self, stats: &StepStatistics) -> Result<(), Self::Error>;
}

/// A sink that discards every record.
pub struct NoOpSink;

impl StepSink for NoOpSink {
    type Error = core::convert::Infallible;

    fn on_step(&mut self, _stats: &StepStatistics) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// A sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Records received so far.
    pub records: Vec<StepStatistics>,
}

impl StepSink for CollectingSink {
    type Error = core::convert::Infallible;

    fn on_step(&mut self, stats: &StepStatistics) -> Result<(), Self::Error> {
        self.records.push(*stats);
        Ok(())
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of steps executed by this call.
    pub steps: u64,
    /// The last record emitted, if any step ran.
    pub final_stats: Option<StepStatistics>,
    /// Event counts summed over every executed step. Time and population
    /// fields are copied from the final record.
    pub totals: StepStatistics,
}

impl RunSummary {
    /// Net change of `sex` over the run: arrivals minus departures.
    pub fn net_change(&self, sex: Sex) -> i128 {
        i128::from(self.totals.arrivals(sex)) - i128::from(self.totals.departures(sex))
    }
}

/// Step `simulation` until its horizon, forwarding each record to `sink`.
///
/// A simulator that already took some steps is continued from where it is;
/// a completed one yields an empty summary.
///
/// # Errors
///
/// Returns [`RunnerError::Sink`] as soon as the sink rejects a record. The
/// simulator is left at the step that produced it.
pub fn run_simulation<S: StepSink>(
    simulation: &mut PopulationSimulator,
    sink: &mut S,
) -> Result<RunSummary, RunnerError<S::Error>> {
    let mut steps: u64 = 0;
    let mut totals = StepStatistics::default();
    let mut final_stats: Option<StepStatistics> = None;

    info!(
        start_time = simulation.time(),
        duration = simulation.duration(),
        women = simulation.population(Sex::Female),
        men = simulation.population(Sex::Male),
        "Simulation starting"
    );

    while simulation.has_next() {
        let stats = simulation.advance()?;
        steps = steps.saturating_add(1);
        totals.add_events(&stats);
        sink.on_step(&stats)
            .map_err(|source| RunnerError::Sink { source })?;
        final_stats = Some(stats);
    }

    if let Some(last) = final_stats {
        totals.time = last.time;
        totals.population_female = last.population_female;
        totals.population_male = last.population_male;
    }

    Ok(RunSummary {
        steps,
        final_stats,
        totals,
    })
}

/// Log the end of a run.
pub fn log_run_end(summary: &RunSummary) {
    info!(
        steps = summary.steps,
        final_time = summary.final_stats.map(|s| s.time),
        final_women = summary.final_stats.map(|s| s.population_female),
        final_men = summary.final_stats.map(|s| s.population_male),
        births = summary
            .totals
            .births_female
            .saturating_add(summary.totals.births_male),
        deaths = summary
            .totals
            .deaths_female
            .saturating_add(summary.totals.deaths_male),
        immigrations = summary
            .totals
            .immigrations_female
            .saturating_add(summary.totals.immigrations_male),
        emigrations = summary
            .totals
            .emigrations_female
            .saturating_add(summary.totals.emigrations_male),
        "Simulation ended"
    );
}
