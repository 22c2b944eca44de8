//! Person creation: the whole life trajectory is sampled up front.
//!
//! A [`Person`] is transient. The factory draws its exit (a race between
//! death and emigration) and, for women, the renewal sequence of birth
//! times. The simulator files those events into the schedule and keeps
//! only the id afterwards.

use popsim_types::{ExitKind, IdAllocator, PersonId, Sex};

use crate::parameters::PopulationParameters;
use crate::random::{RandomSource, floor_offset, round_half_up};

/// One freshly sampled life trajectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    /// Identifier, unique within `sex`.
    pub id: PersonId,
    /// Sex of the person.
    pub sex: Sex,
    /// Timestep of birth; negative for immigrants born before the run.
    pub birth_time: i64,
    /// Timestep at which the exit fires; may lie beyond the horizon.
    pub exit_time: i64,
    /// Whether the exit is a death or an emigration.
    pub exit_kind: ExitKind,
    /// Timesteps at which this woman gives birth. Always empty for men.
    pub birth_times: Vec<i64>,
}

impl Person {
    /// Number of births recorded for this person.
    pub fn children(&self) -> usize {
        self.birth_times.len()
    }
}

/// Samples people and owns the per-sex id sequences of one run.
#[derive(Debug, Clone)]
pub struct PersonFactory {
    female_ids: IdAllocator,
    male_ids: IdAllocator,
    horizon: i64,
}

impl PersonFactory {
    /// Create a factory for a run of `duration` timesteps.
    ///
    /// Birth renewal stops at the earlier of the exit and the horizon, since
    /// births after the horizon are never filed.
    pub fn new(duration: u64) -> Self {
        Self {
            female_ids: IdAllocator::new(),
            male_ids: IdAllocator::new(),
            horizon: i64::try_from(duration).unwrap_or(i64::MAX),
        }
    }

    /// Number of ids issued so far for `sex`.
    pub const fn issued(&self, sex: Sex) -> u64 {
        match sex {
            Sex::Female => self.female_ids.issued(),
            Sex::Male => self.male_ids.issued(),
        }
    }

    /// Sample a person born at `birth_time` with the rates of `params`.
    ///
    /// Draw order is fixed: the death draw, the emigration draw, then (women
    /// only) the birth gaps.
    pub fn create(
        &mut self,
        sex: Sex,
        birth_time: i64,
        params: &PopulationParameters,
        rng: &mut RandomSource,
    ) -> Person {
        let id = match sex {
            Sex::Female => self.female_ids.allocate(),
            Sex::Male => self.male_ids.allocate(),
        };

        let death = rng.exponential(params.death.at(birth_time));
        let emigration = rng.exponential(params.emigration.at(birth_time));
        let (exit_kind, waiting) = if death < emigration {
            (ExitKind::Death, death)
        } else {
            (ExitKind::Emigration, emigration)
        };
        let exit_offset = round_half_up(waiting);
        let exit_time = birth_time.saturating_add(exit_offset);

        let birth_times = match sex {
            Sex::Female => {
                let limit = exit_offset.min(self.horizon.saturating_sub(birth_time));
                sample_births(birth_time, limit, params.birth_rate(birth_time), rng)
            }
            Sex::Male => Vec::new(),
        };

        Person {
            id,
            sex,
            birth_time,
            exit_time,
            exit_kind,
            birth_times,
        }
    }
}

/// Renewal process of births: accumulate exponential gaps while the running
/// total stays below `limit`, recording `birth_time + floor(total)` each time.
fn sample_births(birth_time: i64, limit: i64, rate: f64, rng: &mut RandomSource) -> Vec<i64> {
    let mut births = Vec::new();
    #[allow(clippy::cast_precision_loss)]
    let limit = limit as f64;
    let mut total = rng.exponential(rate);
    while total < limit {
        births.push(birth_time.saturating_add(floor_offset(total)));
        total += rng.exponential(rate);
    }
    births
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::rates::RateFunction;

    fn women(death: f64, emigration: f64, birth: f64) -> PopulationParameters {
        PopulationParameters::women(
            0,
            RateFunction::constant(death),
            RateFunction::constant(emigration),
            RateFunction::constant(birth),
        )
    }

    #[test]
    fn ids_are_sequential_per_sex() {
        let mut factory = PersonFactory::new(10);
        let mut rng = RandomSource::new(1);
        let p = women(0.1, 0.1, 0.0);
        let a = factory.create(Sex::Female, 0, &p, &mut rng);
        let b = factory.create(Sex::Male, 0, &p, &mut rng);
        let c = factory.create(Sex::Female, 0, &p, &mut rng);
        assert_eq!(a.id, PersonId(0));
        assert_eq!(b.id, PersonId(0));
        assert_eq!(c.id, PersonId(1));
        assert_eq!(factory.issued(Sex::Female), 2);
        assert_eq!(factory.issued(Sex::Male), 1);
    }

    #[test]
    fn exit_never_precedes_birth() {
        let mut factory = PersonFactory::new(100);
        let mut rng = RandomSource::new(2);
        let p = women(0.3, 0.2, 0.4);
        for birth_time in [-20, 0, 7] {
            for _ in 0..500 {
                let person = factory.create(Sex::Female, birth_time, &p, &mut rng);
                assert!(person.exit_time >= person.birth_time);
            }
        }
    }

    #[test]
    fn births_lie_between_birth_and_exit() {
        let mut factory = PersonFactory::new(100);
        let mut rng = RandomSource::new(3);
        let p = women(0.05, 0.05, 0.5);
        let mut total_children = 0;
        for _ in 0..500 {
            let person = factory.create(Sex::Female, 4, &p, &mut rng);
            total_children += person.children();
            for &b in &person.birth_times {
                assert!(b >= person.birth_time);
                assert!(b < person.exit_time);
            }
            assert!(person.birth_times.windows(2).all(|w| w[0] <= w[1]));
        }
        assert!(total_children > 0);
    }

    #[test]
    fn zero_birth_rate_yields_no_births() {
        let mut factory = PersonFactory::new(1_000);
        let mut rng = RandomSource::new(4);
        let p = women(0.001, 0.001, 0.0);
        for _ in 0..200 {
            let person = factory.create(Sex::Female, 0, &p, &mut rng);
            assert!(person.birth_times.is_empty());
        }
    }

    #[test]
    fn men_never_record_births() {
        let mut factory = PersonFactory::new(100);
        let mut rng = RandomSource::new(5);
        let p = women(0.01, 0.01, 0.9);
        for _ in 0..100 {
            assert!(factory.create(Sex::Male, 0, &p, &mut rng).birth_times.is_empty());
        }
    }

    #[test]
    fn exit_kind_follows_the_only_active_process() {
        let mut factory = PersonFactory::new(100);
        let mut rng = RandomSource::new(6);
        let only_death = women(0.5, 0.0, 0.0);
        let only_emigration = women(0.0, 0.5, 0.0);
        for _ in 0..100 {
            let d = factory.create(Sex::Female, 0, &only_death, &mut rng);
            assert_eq!(d.exit_kind, ExitKind::Death);
            let e = factory.create(Sex::Male, 0, &only_emigration, &mut rng);
            assert_eq!(e.exit_kind, ExitKind::Emigration);
        }
    }

    #[test]
    fn competing_risks_split_by_rate_ratio() {
        let mut factory = PersonFactory::new(100);
        let mut rng = RandomSource::new(7);
        let p = women(0.3, 0.1, 0.0);
        let n = 10_000;
        let deaths = (0..n)
            .filter(|_| factory.create(Sex::Male, 0, &p, &mut rng).exit_kind == ExitKind::Death)
            .count();
        let share = f64::from(u32::try_from(deaths).unwrap()) / f64::from(n);
        assert!((share - 0.75).abs() < 0.02, "death share was {share}");
    }

    #[test]
    fn exit_offset_is_rounded_not_truncated() {
        // Replay the two exit draws with a twin stream to know the raw waiting time.
        let mut factory = PersonFactory::new(100);
        let mut rng = RandomSource::new(8);
        let mut twin = RandomSource::new(8);
        let p = women(0.8, 0.6, 0.0);
        let mut saw_round_up = false;
        for _ in 0..2_000 {
            let death = twin.exponential(0.8);
            let emigration = twin.exponential(0.6);
            let _ = twin.exponential(0.0);
            let waiting = death.min(emigration);
            let person = factory.create(Sex::Female, 0, &p, &mut rng);
            assert_eq!(person.exit_time, (waiting + 0.5).floor() as i64);
            if waiting.fract() >= 0.5 {
                assert_eq!(person.exit_time, waiting.trunc() as i64 + 1);
                saw_round_up = true;
            }
        }
        assert!(saw_round_up);
    }

    #[test]
    fn immortal_women_renew_only_up_to_the_horizon() {
        let mut factory = PersonFactory::new(30);
        let mut rng = RandomSource::new(9);
        let p = women(0.0, 0.0, 0.5);
        let person = factory.create(Sex::Female, 0, &p, &mut rng);
        assert_eq!(person.exit_time, i64::MAX);
        assert!(!person.birth_times.is_empty());
        assert!(person.birth_times.iter().all(|&b| b < 30));
    }

    #[test]
    fn long_lived_women_renew_only_up_to_the_horizon() {
        let mut factory = PersonFactory::new(5);
        let mut rng = RandomSource::new(10);
        let p = women(1e-7, 0.0, 0.9);
        for birth_time in [-3, 0, 2] {
            let person = factory.create(Sex::Female, birth_time, &p, &mut rng);
            assert!(person.exit_time > 5);
            assert!(person.children() < 50, "{} births", person.children());
            assert!(person.birth_times.iter().all(|&b| b < 5));
        }
    }
}
