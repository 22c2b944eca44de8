//! The time-stepping state machine.
//!
//! [`PopulationSimulator`] owns everything a run needs: the parameter set,
//! the schedule, the person factory, the random stream, the immigration clock
//! and the two membership sets. Each call to [`advance`] consumes one bucket
//! of the schedule and returns the statistics of that step.
//!
//! # Step order
//!
//! 1. Consume the bucket of the current step.
//! 2. Record immigration arrivals strictly before the current step into it.
//! 3. Materialize female then male births, then female then male immigrants,
//!    integrating each new person (membership and future events).
//! 4. Remove every id on the bucket's death and emigration lists.
//! 5. Advance the clock and report.
//!
//! Additions precede removals, and every draw comes from the single
//! [`RandomSource`] in this order, so a seed determines the whole run.
//!
//! [`advance`]: PopulationSimulator::advance

use std::collections::BTreeSet;

use popsim_types::{PersonId, Sex, SimulationPhase, StepStatistics};
use tracing::{debug, info, warn};

use crate::error::SimulationError;
use crate::immigration::{ImmigrationClock, immigrant_age};
use crate::parameters::{LateEventPolicy, ScalarParameters, SimulationParameters};
use crate::person::{Person, PersonFactory};
use crate::random::RandomSource;
use crate::schedule::{Bucket, Schedule};

/// A two-sex population driven by scheduled birth, exit and immigration events.
#[derive(Debug, Clone)]
pub struct PopulationSimulator {
    params: SimulationParameters,
    time: u64,
    schedule: Schedule,
    factory: PersonFactory,
    rng: RandomSource,
    immigration: ImmigrationClock,
    women: BTreeSet<PersonId>,
    men: BTreeSet<PersonId>,
}

impl PopulationSimulator {
    /// Validate `params` and seed the initial population at `t = 0`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Configuration`] if any rate leaves its
    /// allowed range over the horizon, or the horizon is empty.
    pub fn new(params: SimulationParameters) -> Result<Self, SimulationError> {
        params.validate()?;
        Ok(Self::initialized(params))
    }

    fn initialized(params: SimulationParameters) -> Self {
        let mut sim = Self {
            time: 0,
            schedule: Schedule::new(params.duration),
            factory: PersonFactory::new(params.duration),
            rng: RandomSource::new(params.seed),
            immigration: ImmigrationClock::idle(),
            women: BTreeSet::new(),
            men: BTreeSet::new(),
            params,
        };
        sim.seed_population();
        sim
    }

    /// Create the initial cohorts (women first), then start the immigration clock.
    fn seed_population(&mut self) {
        for sex in [Sex::Female, Sex::Male] {
            for _ in 0..self.params.population(sex).initial_population {
                let person = self
                    .factory
                    .create(sex, 0, self.params.population(sex), &mut self.rng);
                self.integrate(&person);
            }
        }
        self.immigration = ImmigrationClock::start(&self.params.immigration, &mut self.rng);

        info!(
            women = self.women.len(),
            men = self.men.len(),
            duration = self.schedule.duration(),
            seed = self.rng.seed(),
            first_immigration = self.immigration.next_arrival(),
            "Population seeded"
        );
    }

    /// Add a new person to its membership set and file its future events.
    fn integrate(&mut self, person: &Person) {
        self.members_mut(person.sex).insert(person.id);
        self.schedule.schedule_exit(person);
        self.schedule.schedule_births(person, &mut self.rng);
    }

    const fn members_mut(&mut self, sex: Sex) -> &mut BTreeSet<PersonId> {
        match sex {
            Sex::Female => &mut self.women,
            Sex::Male => &mut self.men,
        }
    }

    /// Simulate one timestep and return its statistics.
    ///
    /// The returned record carries the time *after* the step (`1` for the
    /// first call) and the population sizes at that time.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Completed`] once every step of the horizon
    /// has been taken.
    pub fn advance(&mut self) -> Result<StepStatistics, SimulationError> {
        let duration = self.schedule.duration();
        if self.time >= duration {
            return Err(SimulationError::Completed { duration });
        }
        let t = i64::try_from(self.time).unwrap_or(i64::MAX);
        let resolve = self.params.late_events == LateEventPolicy::ResolveSameStep;

        let mut bucket = self.schedule.consume(t);
        self.immigration
            .drain_before(t, &self.params.immigration, &mut bucket, &mut self.rng);

        let mut stats = StepStatistics::default();
        let mut passes = 0_u32;
        loop {
            if resolve {
                self.schedule.reopen(t);
            }
            stats.add_events(&self.apply(t, &bucket));
            passes = passes.saturating_add(1);
            if !resolve {
                break;
            }
            bucket = self.schedule.consume(t);
            if bucket.is_empty() {
                break;
            }
        }

        self.time = self.time.saturating_add(1);
        stats.time = self.time;
        stats.population_female = len_u64(&self.women);
        stats.population_male = len_u64(&self.men);

        debug!(
            time = stats.time,
            population_female = stats.population_female,
            population_male = stats.population_male,
            births = stats.births_female.saturating_add(stats.births_male),
            deaths = stats.deaths_female.saturating_add(stats.deaths_male),
            immigrations = stats.immigrations_female.saturating_add(stats.immigrations_male),
            emigrations = stats.emigrations_female.saturating_add(stats.emigrations_male),
            passes,
            "Step complete"
        );

        Ok(stats)
    }

    /// Apply one bucket: additions first, then removals.
    fn apply(&mut self, t: i64, bucket: &Bucket) -> StepStatistics {
        for sex in [Sex::Female, Sex::Male] {
            for _ in 0..bucket.births(sex) {
                let person = self
                    .factory
                    .create(sex, t, self.params.population(sex), &mut self.rng);
                self.integrate(&person);
            }
        }

        for sex in [Sex::Female, Sex::Male] {
            for _ in 0..bucket.immigrations(sex) {
                let age = immigrant_age(&self.params.immigration, &mut self.rng);
                let person = self.factory.create(
                    sex,
                    t.saturating_sub(age),
                    self.params.population(sex),
                    &mut self.rng,
                );
                self.integrate(&person);
            }
        }

        for sex in [Sex::Female, Sex::Male] {
            let members = self.members_mut(sex);
            for id in bucket.deaths(sex).iter().chain(bucket.emigrations(sex)) {
                members.remove(id);
            }
        }

        bucket.event_counts()
    }

    /// Whether another step can be taken.
    pub fn has_next(&self) -> bool {
        self.time < self.schedule.duration()
    }

    /// Whether a run is in progress (at least one step taken, more remain).
    pub fn is_running(&self) -> bool {
        self.phase() == SimulationPhase::Running
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SimulationPhase {
        SimulationPhase::at(self.time, self.schedule.duration())
    }

    /// Number of steps taken so far.
    pub const fn time(&self) -> u64 {
        self.time
    }

    /// Horizon of the active run.
    ///
    /// A duration set through [`set_duration`](Self::set_duration) applies
    /// only after the next [`reset`](Self::reset).
    pub fn duration(&self) -> u64 {
        self.schedule.duration()
    }

    /// Current number of living members of `sex`.
    pub fn population(&self, sex: Sex) -> u64 {
        match sex {
            Sex::Female => len_u64(&self.women),
            Sex::Male => len_u64(&self.men),
        }
    }

    /// The parameter set new people and the next reset are drawn from.
    pub const fn parameters(&self) -> &SimulationParameters {
        &self.params
    }

    /// Time of the next pending immigration arrival.
    pub const fn immigration_clock(&self) -> f64 {
        self.immigration.next_arrival()
    }

    /// Start over from `t = 0` with the current parameters.
    ///
    /// The random stream is rewound to the configured seed, so a reset with
    /// unchanged parameters replays the previous run exactly.
    pub fn reset(&mut self) {
        info!(
            previous_time = self.time,
            duration = self.params.duration,
            seed = self.params.seed,
            "Resetting simulation"
        );
        *self = Self::initialized(self.params.clone());
    }

    /// Apply `change` to a copy of the parameters and commit it if it validates.
    fn mutate<F>(&mut self, field: &'static str, change: F) -> Result<(), SimulationError>
    where
        F: FnOnce(&mut SimulationParameters),
    {
        if self.is_running() {
            warn!(field, time = self.time, "Parameter change refused while running");
            return Err(SimulationError::RunInProgress {
                field,
                time: self.time,
            });
        }
        let mut candidate = self.params.clone();
        change(&mut candidate);
        candidate.validate()?;
        // A pending duration only applies on reset, so rates must also hold
        // over the horizon of the run that is still to be stepped.
        let active = self.schedule.duration();
        if self.phase() != SimulationPhase::Completed && active > candidate.duration {
            candidate.validate_rates(active)?;
        }
        self.params = candidate;
        debug!(field, "Parameter updated");
        Ok(())
    }

    /// Replace the whole parameter set. Takes full effect on the next reset.
    ///
    /// # Errors
    ///
    /// Refused while running or when `params` fails validation.
    pub fn set_parameters(&mut self, params: SimulationParameters) -> Result<(), SimulationError> {
        self.mutate("parameters", |p| *p = params)
    }

    /// Set the birth rate at time zero.
    ///
    /// # Errors
    ///
    /// Refused while running or when the rate leaves `[0, 1)` over the horizon.
    pub fn set_birth_rate(&mut self, rate: f64) -> Result<(), SimulationError> {
        self.mutate("birth rate", |p| {
            let mut birth = p.women.birth.unwrap_or_default();
            birth.base = rate;
            p.women.birth = Some(birth);
        })
    }

    /// Set the birth rate slope.
    ///
    /// # Errors
    ///
    /// Refused while running or when the rate leaves `[0, 1)` over the horizon.
    pub fn set_birth_slope(&mut self, slope: f64) -> Result<(), SimulationError> {
        self.mutate("birth slope", |p| {
            let mut birth = p.women.birth.unwrap_or_default();
            birth.slope = slope;
            p.women.birth = Some(birth);
        })
    }

    /// Set the death rate of `sex` at time zero.
    ///
    /// # Errors
    ///
    /// Refused while running or when the rate goes negative over the horizon.
    pub fn set_death_rate(&mut self, sex: Sex, rate: f64) -> Result<(), SimulationError> {
        self.mutate("death rate", |p| p.population_mut(sex).death.base = rate)
    }

    /// Set the death rate slope of `sex`.
    ///
    /// # Errors
    ///
    /// Refused while running or when the rate goes negative over the horizon.
    pub fn set_death_slope(&mut self, sex: Sex, slope: f64) -> Result<(), SimulationError> {
        self.mutate("death slope", |p| p.population_mut(sex).death.slope = slope)
    }

    /// Set the emigration rate of `sex` at time zero.
    ///
    /// # Errors
    ///
    /// Refused while running or when the rate goes negative over the horizon.
    pub fn set_emigration_rate(&mut self, sex: Sex, rate: f64) -> Result<(), SimulationError> {
        self.mutate("emigration rate", |p| p.population_mut(sex).emigration.base = rate)
    }

    /// Set the emigration rate slope of `sex`.
    ///
    /// # Errors
    ///
    /// Refused while running or when the rate goes negative over the horizon.
    pub fn set_emigration_slope(&mut self, sex: Sex, slope: f64) -> Result<(), SimulationError> {
        self.mutate("emigration slope", |p| {
            p.population_mut(sex).emigration.slope = slope;
        })
    }

    /// Set the initial cohort size of `sex`. Takes effect on the next reset.
    ///
    /// # Errors
    ///
    /// Refused while running.
    pub fn set_initial_population(&mut self, sex: Sex, size: u64) -> Result<(), SimulationError> {
        self.mutate("initial population", |p| {
            p.population_mut(sex).initial_population = size;
        })
    }

    /// Set the immigration rate at time zero.
    ///
    /// # Errors
    ///
    /// Refused while running or when the rate goes negative over the horizon.
    pub fn set_immigration_rate(&mut self, rate: f64) -> Result<(), SimulationError> {
        self.mutate("immigration rate", |p| p.immigration.rate.base = rate)
    }

    /// Set the immigration rate slope.
    ///
    /// # Errors
    ///
    /// Refused while running or when the rate goes negative over the horizon.
    pub fn set_immigration_slope(&mut self, slope: f64) -> Result<(), SimulationError> {
        self.mutate("immigration slope", |p| p.immigration.rate.slope = slope)
    }

    /// Set the probability that an immigrant is a woman.
    ///
    /// # Errors
    ///
    /// Refused while running or when `proportion` is outside `[0, 1]`.
    pub fn set_female_proportion(&mut self, proportion: f64) -> Result<(), SimulationError> {
        self.mutate("female proportion", |p| {
            p.immigration.female_proportion = proportion;
        })
    }

    /// Set the mean and standard deviation of immigrant age.
    ///
    /// # Errors
    ///
    /// Refused while running or when either value is invalid.
    pub fn set_immigrant_age(&mut self, mean: f64, sd: f64) -> Result<(), SimulationError> {
        self.mutate("immigrant age", |p| {
            p.immigration.mean_age = mean;
            p.immigration.sd_age = sd;
        })
    }

    /// Set the horizon. Takes effect on the next reset.
    ///
    /// # Errors
    ///
    /// Refused while running, when `duration` is zero, or when a rate slope
    /// would leave its range over the longer horizon.
    pub fn set_duration(&mut self, duration: u64) -> Result<(), SimulationError> {
        self.mutate("duration", |p| p.duration = duration)
    }

    /// Set the seed. Takes effect on the next reset.
    ///
    /// # Errors
    ///
    /// Refused while running.
    pub fn set_seed(&mut self, seed: u64) -> Result<(), SimulationError> {
        self.mutate("seed", |p| p.seed = seed)
    }

    /// Choose how events aimed at the current step are handled.
    ///
    /// # Errors
    ///
    /// Refused while running.
    pub fn set_late_events(&mut self, policy: LateEventPolicy) -> Result<(), SimulationError> {
        self.mutate("late event policy", |p| p.late_events = policy)
    }

    /// Set all ten scalar rate parameters at once, then reset.
    ///
    /// # Errors
    ///
    /// Refused while running or when the new rates fail validation; the
    /// simulator is left untouched in both cases.
    pub fn set_all_and_reset(&mut self, scalars: &ScalarParameters) -> Result<(), SimulationError> {
        self.mutate("scalar parameters", |p| p.apply_scalars(scalars))?;
        self.reset();
        Ok(())
    }
}

impl Iterator for PopulationSimulator {
    type Item = StepStatistics;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().ok()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.schedule.duration().saturating_sub(self.time))
            .unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

fn len_u64(set: &BTreeSet<PersonId>) -> u64 {
    u64::try_from(set.len()).unwrap_or(u64::MAX)
}
