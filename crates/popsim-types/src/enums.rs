//! Enumeration types for the population model.

use serde::{Deserialize, Serialize};

/// Biological sex of a simulated person.
///
/// Only women carry a birth process; men only have an exit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    /// Female; has a birth renewal process.
    Female,
    /// Male.
    Male,
}

impl core::fmt::Display for Sex {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Female => write!(f, "F"),
            Self::Male => write!(f, "M"),
        }
    }
}

/// The single terminal event that ends a person's membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    /// The person dies.
    Death,
    /// The person leaves the population.
    Emigration,
}

impl core::fmt::Display for ExitKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Death => write!(f, "death"),
            Self::Emigration => write!(f, "emigration"),
        }
    }
}

/// Lifecycle phase of a simulator.
///
/// `Initialized` holds at `t == 0`, `Running` while `0 < t < duration`, and
/// `Completed` once `t == duration`. The phase is always derived from the
/// clock, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationPhase {
    /// Freshly constructed or reset; population seeded, no step taken.
    Initialized,
    /// At least one step taken and more remain.
    Running,
    /// Every step of the horizon has been taken.
    Completed,
}

impl SimulationPhase {
    /// Derive the phase from the current time and the horizon.
    pub const fn at(time: u64, duration: u64) -> Self {
        if time >= duration {
            Self::Completed
        } else if time == 0 {
            Self::Initialized
        } else {
            Self::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_follows_clock() {
        assert_eq!(SimulationPhase::at(0, 5), SimulationPhase::Initialized);
        assert_eq!(SimulationPhase::at(1, 5), SimulationPhase::Running);
        assert_eq!(SimulationPhase::at(4, 5), SimulationPhase::Running);
        assert_eq!(SimulationPhase::at(5, 5), SimulationPhase::Completed);
    }

    #[test]
    fn single_step_horizon_skips_running() {
        assert_eq!(SimulationPhase::at(0, 1), SimulationPhase::Initialized);
        assert_eq!(SimulationPhase::at(1, 1), SimulationPhase::Completed);
    }

    #[test]
    fn sex_serializes_snake_case() {
        let json = serde_json::to_string(&Sex::Female).unwrap_or_default();
        assert_eq!(json, "\"female\"");
        assert_eq!(ExitKind::Emigration.to_string(), "emigration");
    }
}
