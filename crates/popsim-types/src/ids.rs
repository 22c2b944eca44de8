//! Person identifiers.
//!
//! Ids are plain monotonically increasing integers, unique within one sex
//! and never reused during a run. The allocator is owned by whoever creates
//! people, so independent simulations in the same process never share an
//! id sequence.

use serde::{Deserialize, Serialize};

/// Identifier of one simulated person, unique within its sex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub u64);

impl core::fmt::Display for PersonId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for PersonId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<PersonId> for u64 {
    fn from(id: PersonId) -> Self {
        id.0
    }
}

/// Increment-only allocator handing out [`PersonId`]s starting at 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    /// Create an allocator whose first id is 0.
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Hand out the next id.
    ///
    /// Saturates at `u64::MAX`; a run would need more people than fit in
    /// memory to get there.
    pub const fn allocate(&mut self) -> PersonId {
        let id = PersonId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }

    /// Number of ids handed out so far.
    pub const fn issued(&self) -> u64 {
        self.next
    }
}
