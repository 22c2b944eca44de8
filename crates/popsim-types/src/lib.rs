//! Shared type definitions for the population simulator.
//!
//! This crate holds the plain data that crosses crate boundaries: person
//! identifiers, the small closed enumerations of the model, and the
//! fixed-arity statistics record emitted once per simulated timestep.
//!
//! # Modules
//!
//! - [`ids`] -- Per-sex person identifiers and their allocator
//! - [`enums`] -- Sex, exit kind, and simulation phase
//! - [`stats`] -- The per-step statistics record and its CSV rendering

pub mod enums;
pub mod ids;
pub mod stats;

// Re-export all public types at crate root for convenience.
pub use enums::{ExitKind, Sex, SimulationPhase};
pub use ids::{IdAllocator, PersonId};
pub use stats::{STAT_COUNT, StepStatistics};
