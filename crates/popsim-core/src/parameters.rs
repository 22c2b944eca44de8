//! Parameter bundles consumed by the simulator.
//!
//! A [`SimulationParameters`] is the complete numeric input of a run: one
//! [`PopulationParameters`] per sex, an [`ImmigrationParameters`] bundle, the
//! horizon, the seed, and the [`LateEventPolicy`]. Sourcing these values (files,
//! CLI flags, a host environment) is the caller's job; this module only
//! validates them.

use popsim_types::Sex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::rates::{RateFunction, RateProcess};

/// What happens to an event computed for a timestep whose bucket was
/// already consumed.
///
/// A person created at step `t` can draw an exit (or, for women, a birth)
/// that lands on `t` itself. By then the bucket for `t` has been pulled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateEventPolicy {
    /// Lose the event. A newborn whose exit lands on its own birth step stays
    /// in the population for the rest of the run.
    #[default]
    Drop,
    /// Reopen the current step and process it again until a pass schedules
    /// nothing new for it. Events aimed strictly at the past are still lost.
    ResolveSameStep,
}

/// Rates and initial size for one sex.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationParameters {
    /// Number of people of this sex seeded at time zero.
    pub initial_population: u64,
    /// Death intensity.
    pub death: RateFunction,
    /// Emigration intensity.
    pub emigration: RateFunction,
    /// Birth intensity; `None` for men.
    #[serde(default)]
    pub birth: Option<RateFunction>,
}

impl PopulationParameters {
    /// Parameters for women, who carry a birth process.
    pub const fn women(
        initial_population: u64,
        death: RateFunction,
        emigration: RateFunction,
        birth: RateFunction,
    ) -> Self {
        Self {
            initial_population,
            death,
            emigration,
            birth: Some(birth),
        }
    }

    /// Parameters for men, who have no birth process.
    pub const fn men(initial_population: u64, death: RateFunction, emigration: RateFunction) -> Self {
        Self {
            initial_population,
            death,
            emigration,
            birth: None,
        }
    }

    /// Validate every rate over `0..duration`.
    pub fn validate(&self, duration: u64) -> Result<(), ConfigurationError> {
        self.death.validate(RateProcess::Death, duration)?;
        self.emigration.validate(RateProcess::Emigration, duration)?;
        if let Some(birth) = self.birth {
            birth.validate(RateProcess::Birth, duration)?;
        }
        Ok(())
    }

    /// Birth rate at `t`, zero when no birth process is configured.
    pub fn birth_rate(&self, t: i64) -> f64 {
        self.birth.map_or(0.0, |birth| birth.at(t))
    }
}

/// Immigration arrival process and the age distribution of immigrants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImmigrationParameters {
    /// Arrival intensity of the shared immigration clock.
    pub rate: RateFunction,
    /// Probability that an immigrant is a woman.
    pub female_proportion: f64,
    /// Mean age of immigrants on arrival.
    pub mean_age: f64,
    /// Standard deviation of immigrant age.
    pub sd_age: f64,
}

impl ImmigrationParameters {
    /// No immigration at all.
    pub const NONE: Self = Self {
        rate: RateFunction::ZERO,
        female_proportion: 0.5,
        mean_age: 0.0,
        sd_age: 0.0,
    };

    /// Validate the rate over `0..duration` and the scalar parameters.
    pub fn validate(&self, duration: u64) -> Result<(), ConfigurationError> {
        self.rate.validate(RateProcess::Immigration, duration)?;
        if !(0.0..=1.0).contains(&self.female_proportion) {
            return Err(ConfigurationError::InvalidParameter {
                field: "female proportion",
                reason: format!("{} is outside [0, 1]", self.female_proportion),
            });
        }
        if !self.mean_age.is_finite() {
            return Err(ConfigurationError::InvalidParameter {
                field: "mean age",
                reason: format!("{} is not a finite number", self.mean_age),
            });
        }
        if !self.sd_age.is_finite() || self.sd_age < 0.0 {
            return Err(ConfigurationError::InvalidParameter {
                field: "age standard deviation",
                reason: format!("{} must be a finite, non-negative number", self.sd_age),
            });
        }
        Ok(())
    }
}

/// The ten scalar rate parameters a host can set in one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalarParameters {
    /// Female death rate at time zero.
    pub death_rate_female: f64,
    /// Female death rate slope.
    pub death_slope_female: f64,
    /// Female emigration rate at time zero.
    pub emigration_rate_female: f64,
    /// Female emigration rate slope.
    pub emigration_slope_female: f64,
    /// Birth rate at time zero.
    pub birth_rate: f64,
    /// Birth rate slope.
    pub birth_slope: f64,
    /// Male death rate at time zero.
    pub death_rate_male: f64,
    /// Male death rate slope.
    pub death_slope_male: f64,
    /// Male emigration rate at time zero.
    pub emigration_rate_male: f64,
    /// Male emigration rate slope.
    pub emigration_slope_male: f64,
}

/// Complete numeric input of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Female rate bundle.
    pub women: PopulationParameters,
    /// Male rate bundle.
    pub men: PopulationParameters,
    /// Immigration bundle.
    pub immigration: ImmigrationParameters,
    /// Number of timesteps to simulate.
    pub duration: u64,
    /// Seed of the run's random stream.
    pub seed: u64,
    /// Handling of events aimed at an already-consumed step.
    #[serde(default)]
    pub late_events: LateEventPolicy,
}

impl SimulationParameters {
    /// Validate the whole parameter set against its own horizon.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.duration == 0 {
            return Err(ConfigurationError::ZeroDuration);
        }
        if self.women.birth.is_none() {
            return Err(ConfigurationError::InvalidParameter {
                field: "birth rate",
                reason: "the female bundle must carry a birth rate".to_owned(),
            });
        }
        self.validate_rates(self.duration)
    }

    /// Validate every rate over `0..duration`, which may differ from the
    /// parameter set's own horizon.
    pub fn validate_rates(&self, duration: u64) -> Result<(), ConfigurationError> {
        self.women.validate(duration)?;
        self.men.validate(duration)?;
        self.immigration.validate(duration)
    }

    /// The rate bundle for one sex.
    pub const fn population(&self, sex: Sex) -> &PopulationParameters {
        match sex {
            Sex::Female => &self.women,
            Sex::Male => &self.men,
        }
    }

    /// Mutable access to the rate bundle for one sex.
    pub const fn population_mut(&mut self, sex: Sex) -> &mut PopulationParameters {
        match sex {
            Sex::Female => &mut self.women,
            Sex::Male => &mut self.men,
        }
    }

    /// Current values of the ten scalar rate parameters.
    pub fn scalars(&self) -> ScalarParameters {
        let birth = self.women.birth.unwrap_or_default();
        ScalarParameters {
            death_rate_female: self.women.death.base,
            death_slope_female: self.women.death.slope,
            emigration_rate_female: self.women.emigration.base,
            emigration_slope_female: self.women.emigration.slope,
            birth_rate: birth.base,
            birth_slope: birth.slope,
            death_rate_male: self.men.death.base,
            death_slope_male: self.men.death.slope,
            emigration_rate_male: self.men.emigration.base,
            emigration_slope_male: self.men.emigration.slope,
        }
    }

    /// Overwrite the ten scalar rate parameters.
    pub const fn apply_scalars(&mut self, scalars: &ScalarParameters) {
        self.women.death = RateFunction::new(scalars.death_rate_female, scalars.death_slope_female);
        self.women.emigration =
            RateFunction::new(scalars.emigration_rate_female, scalars.emigration_slope_female);
        self.women.birth = Some(RateFunction::new(scalars.birth_rate, scalars.birth_slope));
        self.men.death = RateFunction::new(scalars.death_rate_male, scalars.death_slope_male);
        self.men.emigration =
            RateFunction::new(scalars.emigration_rate_male, scalars.emigration_slope_male);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn params() -> SimulationParameters {
        SimulationParameters {
            women: PopulationParameters::women(
                100,
                RateFunction::constant(0.02),
                RateFunction::constant(0.01),
                RateFunction::constant(0.05),
            ),
            men: PopulationParameters::men(
                100,
                RateFunction::constant(0.02),
                RateFunction::constant(0.01),
            ),
            immigration: ImmigrationParameters {
                rate: RateFunction::constant(2.0),
                female_proportion: 0.5,
                mean_age: 30.0,
                sd_age: 10.0,
            },
            duration: 50,
            seed: 42,
            late_events: LateEventPolicy::Drop,
        }
    }

    #[test]
    fn valid_parameters_pass() {
        assert!(params().validate().is_ok());
    }

    #[test]
    fn zero_duration_fails() {
        let mut p = params();
        p.duration = 0;
        assert_eq!(p.validate(), Err(ConfigurationError::ZeroDuration));
    }

    #[test]
    fn women_need_a_birth_rate() {
        let mut p = params();
        p.women.birth = None;
        assert!(p.validate().is_err());
    }

    #[test]
    fn slope_driving_male_death_negative_fails() {
        let mut p = params();
        p.men.death = RateFunction::new(0.02, -0.001);
        assert!(matches!(
            p.validate(),
            Err(ConfigurationError::NegativeRate {
                process: RateProcess::Death,
                time: 49,
                ..
            })
        ));
    }

    #[test]
    fn proportion_outside_unit_interval_fails() {
        let mut p = params();
        p.immigration.female_proportion = 1.2;
        assert!(matches!(
            p.validate(),
            Err(ConfigurationError::InvalidParameter { field: "female proportion", .. })
        ));
    }

    #[test]
    fn negative_age_spread_fails() {
        let mut p = params();
        p.immigration.sd_age = -1.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn scalars_round_trip_through_bundles() {
        let mut p = params();
        let mut scalars = p.scalars();
        scalars.birth_rate = 0.3;
        scalars.death_slope_male = 0.001;
        p.apply_scalars(&scalars);
        assert!((p.women.birth.unwrap().base - 0.3).abs() < f64::EPSILON);
        assert!((p.men.death.slope - 0.001).abs() < f64::EPSILON);
        assert_eq!(p.scalars(), scalars);
    }

    #[test]
    fn men_have_zero_birth_rate() {
        let p = params();
        assert!(p.population(Sex::Male).birth_rate(10).abs() < f64::EPSILON);
        assert!((p.population(Sex::Female).birth_rate(10) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn late_event_policy_defaults_to_drop() {
        assert_eq!(LateEventPolicy::default(), LateEventPolicy::Drop);
        let json = serde_json::to_string(&LateEventPolicy::ResolveSameStep).unwrap();
        assert_eq!(json, "\"resolve_same_step\"");
    }
}
