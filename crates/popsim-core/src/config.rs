//! Configuration loading and typed config structures for the population simulator.
//!
//! A run is described by a YAML file with one section per concern. Every
//! field has a default, so an empty document is a valid (if arbitrary)
//! configuration. [`SimulationConfig::parameters`] turns the file's view into
//! the validated [`SimulationParameters`] the engine consumes.
//!
//! ```yaml
//! simulation:
//!   duration: 100
//!   seed: 42
//!   late_events: drop
//! women:
//!   initial_population: 1000
//!   death: { mean_interval: 80 }
//!   emigration: { rate: 0.005, slope: 0.0001 }
//!   birth: { mean_interval: 30 }
//! men:
//!   initial_population: 1000
//!   death: { mean_interval: 75 }
//!   emigration: { rate: 0.005 }
//! immigration:
//!   rate: { rate: 10.0 }
//!   female_proportion: 0.5
//!   mean_age: 30.0
//!   sd_age: 10.0
//! logging:
//!   level: info
//! ```
//!
//! Rates are given either directly (`rate`) or as the mean waiting time
//! between events (`mean_interval`, the rate's inverse).

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{ConfigurationError, SimulationError};
use crate::parameters::{
    ImmigrationParameters, LateEventPolicy, PopulationParameters, SimulationParameters,
};
use crate::rates::RateFunction;

/// Environment variable that overrides `simulation.seed` when loading a file.
pub const SEED_ENV: &str = "POPSIM_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configured values do not form a valid parameter set.
    #[error("invalid configuration: {source}")]
    Configuration {
        /// The underlying validation failure.
        #[from]
        source: ConfigurationError,
    },

    /// The simulator refused the configured parameters.
    #[error("simulation rejected configuration: {source}")]
    Simulation {
        /// The underlying simulation error.
        #[from]
        source: SimulationError,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationConfig {
    /// Horizon, seed and late-event handling.
    #[serde(default)]
    pub simulation: RunConfig,

    /// Female cohort and rates.
    #[serde(default)]
    pub women: WomenConfig,

    /// Male cohort and rates.
    #[serde(default)]
    pub men: MenConfig,

    /// Immigration arrival process.
    #[serde(default)]
    pub immigration: ImmigrationConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `POPSIM_SEED`, when set to an integer, overrides `simulation.seed`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.simulation.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }

    /// Convert to engine parameters and validate them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if a rate is specified ambiguously, a
    /// mean interval is not positive, or the resulting parameter set fails
    /// validation.
    pub fn parameters(&self) -> Result<SimulationParameters, ConfigurationError> {
        let params = SimulationParameters {
            women: PopulationParameters::women(
                self.women.initial_population,
                self.women.death.resolve("women.death")?,
                self.women.emigration.resolve("women.emigration")?,
                self.women.birth.resolve("women.birth")?,
            ),
            men: PopulationParameters::men(
                self.men.initial_population,
                self.men.death.resolve("men.death")?,
                self.men.emigration.resolve("men.emigration")?,
            ),
            immigration: ImmigrationParameters {
                rate: self.immigration.rate.resolve("immigration.rate")?,
                female_proportion: self.immigration.female_proportion,
                mean_age: self.immigration.mean_age,
                sd_age: self.immigration.sd_age,
            },
            duration: self.simulation.duration,
            seed: self.simulation.seed,
            late_events: self.simulation.late_events,
        };
        params.validate()?;
        Ok(params)
    }
}

/// Run-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RunConfig {
    /// Number of timesteps to simulate.
    #[serde(default = "default_duration")]
    pub duration: u64,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Handling of events aimed at the step being processed.
    #[serde(default)]
    pub late_events: LateEventPolicy,
}

impl RunConfig {
    /// Override the seed with `POPSIM_SEED` when it is set.
    pub fn apply_env_overrides(&mut self) {
        self.override_seed(std::env::var(SEED_ENV).ok().as_deref());
    }

    /// Replace the seed with `raw` if it parses as an integer.
    fn override_seed(&mut self, raw: Option<&str>) {
        let Some(raw) = raw else {
            return;
        };
        match raw.trim().parse() {
            Ok(seed) => self.seed = seed,
            Err(_) => warn!(value = raw, variable = SEED_ENV, "Ignoring non-integer seed override"),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            seed: default_seed(),
            late_events: LateEventPolicy::default(),
        }
    }
}

/// An affine rate as written in the file.
///
/// Exactly one of `rate` and `mean_interval` must be present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct RateConfig {
    /// Events per timestep at time zero.
    #[serde(default)]
    pub rate: Option<f64>,

    /// Mean timesteps between events at time zero; the rate is its inverse.
    #[serde(default)]
    pub mean_interval: Option<f64>,

    /// Change of the rate per timestep.
    #[serde(default)]
    pub slope: f64,
}

impl RateConfig {
    const fn from_rate(rate: f64) -> Self {
        Self {
            rate: Some(rate),
            mean_interval: None,
            slope: 0.0,
        }
    }

    const fn from_mean_interval(mean_interval: f64) -> Self {
        Self {
            rate: None,
            mean_interval: Some(mean_interval),
            slope: 0.0,
        }
    }

    /// Convert to a [`RateFunction`]; `field` names the rate in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidParameter`] if both or neither
    /// form is given, or the mean interval is not positive.
    pub fn resolve(&self, field: &'static str) -> Result<RateFunction, ConfigurationError> {
        let base = match (self.rate, self.mean_interval) {
            (Some(rate), None) => rate,
            (None, Some(interval)) if interval > 0.0 => 1.0 / interval,
            (None, Some(interval)) => {
                return Err(ConfigurationError::InvalidParameter {
                    field,
                    reason: format!("mean_interval must be positive, got {interval}"),
                });
            }
            (Some(_), Some(_)) => {
                return Err(ConfigurationError::InvalidParameter {
                    field,
                    reason: "give either rate or mean_interval, not both".to_owned(),
                });
            }
            (None, None) => {
                return Err(ConfigurationError::InvalidParameter {
                    field,
                    reason: "missing rate or mean_interval".to_owned(),
                });
            }
        };
        Ok(RateFunction::new(base, self.slope))
    }
}

/// Female cohort configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WomenConfig {
    /// Women seeded at time zero.
    #[serde(default = "default_initial_population")]
    pub initial_population: u64,

    /// Death rate.
    #[serde(default = "default_female_death")]
    pub death: RateConfig,

    /// Emigration rate.
    #[serde(default = "default_emigration")]
    pub emigration: RateConfig,

    /// Birth rate per woman.
    #[serde(default = "default_birth")]
    pub birth: RateConfig,
}

impl Default for WomenConfig {
    fn default() -> Self {
        Self {
            initial_population: default_initial_population(),
            death: default_female_death(),
            emigration: default_emigration(),
            birth: default_birth(),
        }
    }
}

/// Male cohort configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MenConfig {
    /// Men seeded at time zero.
    #[serde(default = "default_initial_population")]
    pub initial_population: u64,

    /// Death rate.
    #[serde(default = "default_male_death")]
    pub death: RateConfig,

    /// Emigration rate.
    #[serde(default = "default_emigration")]
    pub emigration: RateConfig,
}

impl Default for MenConfig {
    fn default() -> Self {
        Self {
            initial_population: default_initial_population(),
            death: default_male_death(),
            emigration: default_emigration(),
        }
    }
}

/// Immigration configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImmigrationConfig {
    /// Arrival rate of the immigration clock.
    #[serde(default = "default_immigration_rate")]
    pub rate: RateConfig,

    /// Probability that an immigrant is a woman.
    #[serde(default = "default_female_proportion")]
    pub female_proportion: f64,

    /// Mean age of immigrants on arrival.
    #[serde(default = "default_mean_age")]
    pub mean_age: f64,

    /// Standard deviation of immigrant age.
    #[serde(default = "default_sd_age")]
    pub sd_age: f64,
}

impl Default for ImmigrationConfig {
    fn default() -> Self {
        Self {
            rate: default_immigration_rate(),
            female_proportion: default_female_proportion(),
            mean_age: default_mean_age(),
            sd_age: default_sd_age(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions for serde
// ---------------------------------------------------------------------------

const fn default_duration() -> u64 {
    100
}

const fn default_seed() -> u64 {
    42
}

const fn default_initial_population() -> u64 {
    1000
}

const fn default_female_death() -> RateConfig {
    RateConfig::from_mean_interval(80.0)
}

const fn default_male_death() -> RateConfig {
    RateConfig::from_mean_interval(75.0)
}

const fn default_emigration() -> RateConfig {
    RateConfig::from_mean_interval(200.0)
}

const fn default_birth() -> RateConfig {
    RateConfig::from_mean_interval(30.0)
}

const fn default_immigration_rate() -> RateConfig {
    RateConfig::from_rate(10.0)
}

const fn default_female_proportion() -> f64 {
    0.5
}

const fn default_mean_age() -> f64 {
    30.0
}

const fn default_sd_age() -> f64 {
    10.0
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = SimulationConfig::default();
        assert_eq!(config.simulation.duration, 100);
        assert_eq!(config.simulation.seed, 42);
        assert_eq!(config.women.initial_population, 1000);
        assert_eq!(config.logging.level, "info");
        let params = config.parameters().unwrap();
        assert!((params.women.death.base - 1.0 / 80.0).abs() < 1e-12);
        assert_eq!(params.late_events, LateEventPolicy::Drop);
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r"
simulation:
  duration: 250
  seed: 7
  late_events: resolve_same_step
women:
  initial_population: 500
  death: { mean_interval: 50 }
  emigration: { rate: 0.01, slope: 0.0001 }
  birth: { rate: 0.04, slope: -0.0001 }
men:
  initial_population: 400
  death: { rate: 0.025 }
  emigration: { mean_interval: 100 }
immigration:
  rate: { rate: 3.0, slope: 0.01 }
  female_proportion: 0.6
  mean_age: 25.0
  sd_age: 5.0
logging:
  level: debug
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.simulation.duration, 250);
        assert_eq!(config.simulation.late_events, LateEventPolicy::ResolveSameStep);
        assert_eq!(config.men.initial_population, 400);
        assert_eq!(config.logging.level, "debug");

        let params = config.parameters().unwrap();
        assert!((params.women.death.base - 0.02).abs() < 1e-12);
        assert!((params.men.emigration.base - 0.01).abs() < 1e-12);
        assert!((params.immigration.rate.slope - 0.01).abs() < 1e-12);
        assert!((params.immigration.female_proportion - 0.6).abs() < 1e-12);
        assert_eq!(params.seed, 7);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "simulation:\n  seed: 9\n";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert_eq!(config.simulation.seed, 9);
        assert_eq!(config.simulation.duration, 100);
        assert_eq!(config.men, MenConfig::default());
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(SimulationConfig::parse("").is_ok());
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let result = SimulationConfig::parse("simulation: [unclosed");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn rate_given_twice_is_rejected() {
        let rate = RateConfig {
            rate: Some(0.1),
            mean_interval: Some(10.0),
            slope: 0.0,
        };
        assert!(matches!(
            rate.resolve("women.death"),
            Err(ConfigurationError::InvalidParameter { field: "women.death", .. })
        ));
    }

    #[test]
    fn missing_rate_is_rejected() {
        assert!(RateConfig::default().resolve("men.death").is_err());
    }

    #[test]
    fn non_positive_mean_interval_is_rejected() {
        for interval in [0.0, -3.0] {
            assert!(RateConfig::from_mean_interval(interval).resolve("x").is_err());
        }
    }

    #[test]
    fn slope_that_turns_negative_fails_validation() {
        let yaml = "
simulation:
  duration: 100
men:
  death: { rate: 0.01, slope: -0.001 }
";
        let config = SimulationConfig::parse(yaml).unwrap();
        assert!(matches!(
            config.parameters(),
            Err(ConfigurationError::NegativeRate { .. })
        ));
    }

    #[test]
    fn seed_override_parses_integers_only() {
        let mut run = RunConfig::default();
        run.override_seed(Some(" 1234 "));
        assert_eq!(run.seed, 1234);
        run.override_seed(Some("not-a-number"));
        assert_eq!(run.seed, 1234);
        run.override_seed(None);
        assert_eq!(run.seed, 1234);
    }

    #[test]
    fn load_demo_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("demos")
            .join("popsim.yaml");
        if path.exists() {
            let config = SimulationConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load demo config: {config:?}");
            assert!(config.unwrap().parameters().is_ok());
        }
    }
}
