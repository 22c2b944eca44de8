//! Affine rate functions.
//!
//! Every intensity in the model (death, emigration, birth, immigration) is
//! `base + slope * t`. A [`RateFunction`] is validated once against the
//! horizon and then queried freely; each query recomputes the affine value.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// The stochastic process a rate governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateProcess {
    /// Death of a living person.
    Death,
    /// Emigration of a living person.
    Emigration,
    /// Births to a living woman.
    Birth,
    /// Arrival of immigrants.
    Immigration,
}

impl core::fmt::Display for RateProcess {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Death => write!(f, "death"),
            Self::Emigration => write!(f, "emigration"),
            Self::Birth => write!(f, "birth"),
            Self::Immigration => write!(f, "immigration"),
        }
    }
}

/// A rate that changes linearly in time: `base + slope * t`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RateFunction {
    /// Rate at time zero.
    pub base: f64,
    /// Change of the rate per timestep.
    #[serde(default)]
    pub slope: f64,
}

impl RateFunction {
    /// A rate that is zero everywhere.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Create a rate from its intercept and slope.
    pub const fn new(base: f64, slope: f64) -> Self {
        Self { base, slope }
    }

    /// A rate that does not change over time.
    pub const fn constant(base: f64) -> Self {
        Self::new(base, 0.0)
    }

    /// Evaluate the rate at timestep `t`.
    ///
    /// Times before zero (immigrants born before the run started) are
    /// evaluated at zero, so validation over the horizon covers every query.
    #[allow(clippy::cast_precision_loss)]
    pub fn at(&self, t: i64) -> f64 {
        // Timesteps stay far below 2^53.
        let t = t.max(0) as f64;
        self.slope.mul_add(t, self.base)
    }

    /// Check the rate over the integer horizon `0..duration`.
    ///
    /// An affine function attains its extremes at the ends of the interval,
    /// so only `t = 0` and `t = duration - 1` are evaluated. Birth rates must
    /// additionally stay strictly below 1.
    pub fn validate(&self, process: RateProcess, duration: u64) -> Result<(), ConfigurationError> {
        if !self.base.is_finite() || !self.slope.is_finite() {
            return Err(ConfigurationError::InvalidParameter {
                field: field_name(process),
                reason: format!(
                    "base {} and slope {} must be finite numbers",
                    self.base, self.slope
                ),
            });
        }
        let last = duration.checked_sub(1).ok_or(ConfigurationError::ZeroDuration)?;

        for time in [0, last] {
            let value = self.at(i64::try_from(time).unwrap_or(i64::MAX));
            if value < 0.0 {
                return Err(ConfigurationError::NegativeRate {
                    process,
                    time,
                    value,
                    base: self.base,
                    slope: self.slope,
                });
            }
            if process == RateProcess::Birth && value >= 1.0 {
                return Err(ConfigurationError::BirthRateTooHigh {
                    time,
                    value,
                    base: self.base,
                    slope: self.slope,
                });
            }
        }
        Ok(())
    }
}

const fn field_name(process: RateProcess) -> &'static str {
    match process {
        RateProcess::Death => "death rate",
        RateProcess::Emigration => "emigration rate",
        RateProcess::Birth => "birth rate",
        RateProcess::Immigration => "immigration rate",
    }
}
