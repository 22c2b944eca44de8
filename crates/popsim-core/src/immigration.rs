//! The immigration sub-process.
//!
//! Immigrants are not pre-identified. A single cumulative clock paces
//! arrivals as a renewal process whose gap is drawn at the rate of the step
//! being consumed. Each arrival is tallied into the bucket of that step and
//! materialized as a person (with a sampled age) when the bucket is applied.

use popsim_types::Sex;

use crate::parameters::ImmigrationParameters;
use crate::random::{RandomSource, round_half_up};
use crate::schedule::Bucket;

/// The running immigration clock of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ImmigrationClock {
    next_arrival: f64,
}

impl ImmigrationClock {
    /// Start the clock at the first arrival, `0 + Exp(rate(0))`.
    ///
    /// A zero rate at time zero puts the first arrival at `+inf`; the clock
    /// then never fires for the rest of the run.
    pub fn start(params: &ImmigrationParameters, rng: &mut RandomSource) -> Self {
        Self {
            next_arrival: rng.exponential(params.rate.at(0)),
        }
    }

    /// A clock that never fires, held until a run starts it.
    pub const fn idle() -> Self {
        Self {
            next_arrival: f64::INFINITY,
        }
    }

    /// Time of the next pending arrival.
    pub const fn next_arrival(&self) -> f64 {
        self.next_arrival
    }

    /// Record into `bucket` every arrival strictly before `t`.
    ///
    /// For each pending arrival: draw the sex (female with the configured
    /// proportion), tally it, then advance the clock by `Exp(rate(t))`.
    /// Returns the number of arrivals recorded.
    pub fn drain_before(
        &mut self,
        t: i64,
        params: &ImmigrationParameters,
        bucket: &mut Bucket,
        rng: &mut RandomSource,
    ) -> u64 {
        #[allow(clippy::cast_precision_loss)]
        let threshold = t as f64;
        let rate = params.rate.at(t);
        let mut arrivals = 0_u64;
        while self.next_arrival < threshold {
            let sex = if rng.bernoulli(params.female_proportion) {
                Sex::Female
            } else {
                Sex::Male
            };
            bucket.add_immigration(sex);
            arrivals = arrivals.saturating_add(1);
            self.next_arrival += rng.exponential(rate);
        }
        arrivals
    }
}

/// Sample an immigrant's age: `max(0, round(N(mean, sd)))`.
pub fn immigrant_age(params: &ImmigrationParameters, rng: &mut RandomSource) -> i64 {
    round_half_up(rng.normal(params.mean_age, params.sd_age)).max(0)
}
