//! The per-step statistics record.
//!
//! One [`StepStatistics`] is emitted for every advanced timestep. Its field
//! order is fixed: time, the two population sizes, then births, deaths,
//! immigrations and emigrations, each split female/male. Writers render it
//! through [`StepStatistics::HEADER`] and the [`core::fmt::Display`] impl so
//! column order lives in exactly one place.

use serde::{Deserialize, Serialize};

use crate::enums::Sex;

/// Number of numeric columns in a [`StepStatistics`] record.
pub const STAT_COUNT: usize = 11;

/// Aggregate counts for one simulated timestep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepStatistics {
    /// Simulation time after the step (the step at `t` reports `t + 1`).
    pub time: u64,
    /// Living women at the end of the step.
    pub population_female: u64,
    /// Living men at the end of the step.
    pub population_male: u64,
    /// Girls born during the step.
    pub births_female: u64,
    /// Boys born during the step.
    pub births_male: u64,
    /// Women who died during the step.
    pub deaths_female: u64,
    /// Men who died during the step.
    pub deaths_male: u64,
    /// Women who immigrated during the step.
    pub immigrations_female: u64,
    /// Men who immigrated during the step.
    pub immigrations_male: u64,
    /// Women who emigrated during the step.
    pub emigrations_female: u64,
    /// Men who emigrated during the step.
    pub emigrations_male: u64,
}

impl StepStatistics {
    /// Column header matching [`Self::to_array`] and the `Display` output.
    pub const HEADER: &'static str = "time, populationF, populationM, birthsF, birthsM, \
         deathsF, deathsM, immigrationsF, immigrationsM, emigrationsF, emigrationsM";

    /// Flatten the record into its fixed column order.
    pub const fn to_array(&self) -> [u64; STAT_COUNT] {
        [
            self.time,
            self.population_female,
            self.population_male,
            self.births_female,
            self.births_male,
            self.deaths_female,
            self.deaths_male,
            self.immigrations_female,
            self.immigrations_male,
            self.emigrations_female,
            self.emigrations_male,
        ]
    }

    /// Living population of one sex at the end of the step.
    pub const fn population(&self, sex: Sex) -> u64 {
        match sex {
            Sex::Female => self.population_female,
            Sex::Male => self.population_male,
        }
    }

    /// Births plus immigrations of one sex during the step.
    pub const fn arrivals(&self, sex: Sex) -> u64 {
        match sex {
            Sex::Female => self.births_female.saturating_add(self.immigrations_female),
            Sex::Male => self.births_male.saturating_add(self.immigrations_male),
        }
    }

    /// Deaths plus emigrations of one sex during the step.
    pub const fn departures(&self, sex: Sex) -> u64 {
        match sex {
            Sex::Female => self.deaths_female.saturating_add(self.emigrations_female),
            Sex::Male => self.deaths_male.saturating_add(self.emigrations_male),
        }
    }

    /// Add the event counts of `other` into `self`.
    ///
    /// Time and population sizes are left untouched; they describe the end
    /// of the step, not an accumulation.
    pub const fn add_events(&mut self, other: &Self) {
        self.births_female = self.births_female.saturating_add(other.births_female);
        self.births_male = self.births_male.saturating_add(other.births_male);
        self.deaths_female = self.deaths_female.saturating_add(other.deaths_female);
        self.deaths_male = self.deaths_male.saturating_add(other.deaths_male);
        self.immigrations_female = self
            .immigrations_female
            .saturating_add(other.immigrations_female);
        self.immigrations_male = self.immigrations_male.saturating_add(other.immigrations_male);
        self.emigrations_female = self
            .emigrations_female
            .saturating_add(other.emigrations_female);
        self.emigrations_male = self.emigrations_male.saturating_add(other.emigrations_male);
    }
}

impl core::fmt::Display for StepStatistics {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for value in self.to_array() {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> StepStatistics {
        StepStatistics {
            time: 3,
            population_female: 10,
            population_male: 9,
            births_female: 1,
            births_male: 2,
            deaths_female: 3,
            deaths_male: 4,
            immigrations_female: 5,
            immigrations_male: 6,
            emigrations_female: 7,
            emigrations_male: 8,
        }
    }

    #[test]
    fn header_has_one_column_per_value() {
        let columns = StepStatistics::HEADER.split(", ").count();
        assert_eq!(columns, STAT_COUNT);
    }

    #[test]
    fn display_matches_array_order() {
        assert_eq!(sample().to_string(), "3, 10, 9, 1, 2, 3, 4, 5, 6, 7, 8");
    }

    #[test]
    fn arrivals_and_departures_by_sex() {
        let s = sample();
        assert_eq!(s.arrivals(Sex::Female), 6);
        assert_eq!(s.arrivals(Sex::Male), 8);
        assert_eq!(s.departures(Sex::Female), 10);
        assert_eq!(s.departures(Sex::Male), 12);
        assert_eq!(s.population(Sex::Male), 9);
    }

    #[test]
    fn add_events_keeps_time_and_population() {
        let mut total = StepStatistics {
            time: 1,
            population_female: 4,
            ..StepStatistics::default()
        };
        total.add_events(&sample());
        assert_eq!(total.time, 1);
        assert_eq!(total.population_female, 4);
        assert_eq!(total.births_male, 2);
        assert_eq!(total.emigrations_male, 8);
    }

    #[test]
    fn json_field_names_are_snake_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["immigrations_female"], 5);
    }
}
