//! The time-indexed event schedule.
//!
//! A [`Schedule`] is a fixed-length array of [`Bucket`]s, one per timestep of
//! the horizon. Events are filed into the bucket of the step at which they
//! fire. Consuming a step hands its bucket out and evicts it, so a bucket is
//! written to only before its step is consumed and never read twice.
//!
//! # Dropped events
//!
//! - Targets at or beyond the horizon are silently ignored; they cannot
//!   affect the simulated window.
//! - Targets whose bucket was already consumed (the past, or the current
//!   step after it was pulled) are ignored as well. See
//!   [`LateEventPolicy`](crate::parameters::LateEventPolicy) for how the
//!   simulator can reopen the current step.

use popsim_types::{ExitKind, PersonId, Sex, StepStatistics};

use crate::person::Person;
use crate::random::RandomSource;

/// Everything scheduled to fire at one timestep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bucket {
    births_female: u64,
    births_male: u64,
    deaths_female: Vec<PersonId>,
    deaths_male: Vec<PersonId>,
    emigrations_female: Vec<PersonId>,
    emigrations_male: Vec<PersonId>,
    immigrations_female: u64,
    immigrations_male: u64,
}

impl Bucket {
    /// Count one birth of a child of `sex`.
    pub const fn add_birth(&mut self, sex: Sex) {
        match sex {
            Sex::Female => self.births_female = self.births_female.saturating_add(1),
            Sex::Male => self.births_male = self.births_male.saturating_add(1),
        }
    }

    /// Count one immigrant of `sex`.
    pub const fn add_immigration(&mut self, sex: Sex) {
        match sex {
            Sex::Female => self.immigrations_female = self.immigrations_female.saturating_add(1),
            Sex::Male => self.immigrations_male = self.immigrations_male.saturating_add(1),
        }
    }

    /// File the exit of person `id`.
    pub fn add_exit(&mut self, sex: Sex, kind: ExitKind, id: PersonId) {
        let list = match (sex, kind) {
            (Sex::Female, ExitKind::Death) => &mut self.deaths_female,
            (Sex::Male, ExitKind::Death) => &mut self.deaths_male,
            (Sex::Female, ExitKind::Emigration) => &mut self.emigrations_female,
            (Sex::Male, ExitKind::Emigration) => &mut self.emigrations_male,
        };
        list.push(id);
    }

    /// Number of children of `sex` born at this step.
    pub const fn births(&self, sex: Sex) -> u64 {
        match sex {
            Sex::Female => self.births_female,
            Sex::Male => self.births_male,
        }
    }

    /// Number of immigrants of `sex` arriving at this step.
    pub const fn immigrations(&self, sex: Sex) -> u64 {
        match sex {
            Sex::Female => self.immigrations_female,
            Sex::Male => self.immigrations_male,
        }
    }

    /// Ids of people of `sex` dying at this step.
    pub fn deaths(&self, sex: Sex) -> &[PersonId] {
        match sex {
            Sex::Female => &self.deaths_female,
            Sex::Male => &self.deaths_male,
        }
    }

    /// Ids of people of `sex` emigrating at this step.
    pub fn emigrations(&self, sex: Sex) -> &[PersonId] {
        match sex {
            Sex::Female => &self.emigrations_female,
            Sex::Male => &self.emigrations_male,
        }
    }

    /// Whether nothing at all is scheduled here.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Event counts of this bucket as a statistics record (time and
    /// population left at zero).
    pub fn event_counts(&self) -> StepStatistics {
        StepStatistics {
            births_female: self.births_female,
            births_male: self.births_male,
            deaths_female: len_u64(&self.deaths_female),
            deaths_male: len_u64(&self.deaths_male),
            immigrations_female: self.immigrations_female,
            immigrations_male: self.immigrations_male,
            emigrations_female: len_u64(&self.emigrations_female),
            emigrations_male: len_u64(&self.emigrations_male),
            ..StepStatistics::default()
        }
    }
}

fn len_u64(ids: &[PersonId]) -> u64 {
    u64::try_from(ids.len()).unwrap_or(u64::MAX)
}

/// Fixed-length sequence of buckets indexed by absolute timestep.
///
/// `None` marks a consumed step.
#[derive(Debug, Clone)]
pub struct Schedule {
    buckets: Vec<Option<Bucket>>,
}

impl Schedule {
    /// Create an empty schedule covering steps `0..duration`.
    pub fn new(duration: u64) -> Self {
        let len = usize::try_from(duration).unwrap_or(usize::MAX);
        let mut buckets = Vec::new();
        buckets.resize_with(len, || Some(Bucket::default()));
        Self { buckets }
    }

    /// Number of steps covered.
    pub fn duration(&self) -> u64 {
        u64::try_from(self.buckets.len()).unwrap_or(u64::MAX)
    }

    /// The live bucket at `t`, or `None` if `t` is outside the horizon or
    /// already consumed.
    fn live_mut(&mut self, t: i64) -> Option<&mut Bucket> {
        let index = usize::try_from(t).ok()?;
        self.buckets.get_mut(index)?.as_mut()
    }

    /// File the exit of `person` at its exit time.
    ///
    /// Returns whether the event was filed; out-of-horizon and consumed
    /// targets are dropped.
    pub fn schedule_exit(&mut self, person: &Person) -> bool {
        match self.live_mut(person.exit_time) {
            Some(bucket) => {
                bucket.add_exit(person.sex, person.exit_kind, person.id);
                true
            }
            None => false,
        }
    }

    /// File the births of `person`, choosing each child's sex 50/50.
    ///
    /// A sex is drawn only for births that land on an open bucket. Returns
    /// the number of births filed.
    pub fn schedule_births(&mut self, person: &Person, rng: &mut RandomSource) -> usize {
        let mut filed = 0_usize;
        for &t in &person.birth_times {
            if let Some(bucket) = self.live_mut(t) {
                let sex = if rng.bernoulli(0.5) { Sex::Female } else { Sex::Male };
                bucket.add_birth(sex);
                filed = filed.saturating_add(1);
            }
        }
        filed
    }

    /// Take the bucket at `t` and evict it.
    ///
    /// Out-of-range or already consumed steps yield an empty bucket.
    pub fn consume(&mut self, t: i64) -> Bucket {
        usize::try_from(t)
            .ok()
            .and_then(|index| self.buckets.get_mut(index))
            .and_then(Option::take)
            .unwrap_or_default()
    }

    /// Put a fresh empty bucket back at a consumed step `t`.
    ///
    /// Used only to resolve same-step events. Returns `false` if `t` is out
    /// of range or still open.
    pub fn reopen(&mut self, t: i64) -> bool {
        let Some(slot) = usize::try_from(t)
            .ok()
            .and_then(|index| self.buckets.get_mut(index))
        else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(Bucket::default());
        true
    }
}
