// Core ID types for the relay protocol.
//
// `SlotId` is the relay-assigned identity of a connection. A match has exactly
// two slots, so the peer of slot `i` is always `(i + 1) % 2`; clients use that
// to pick the opponent's field out of an exchange. `RoundNumber` is the
// client-side round counter (1-based) carried in snapshots and logs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of participants in a match.
pub const SLOT_COUNT: usize = 2;

/// Relay-assigned slot index, always 0 or 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u8);

impl SlotId {
    pub const FIRST: SlotId = SlotId(0);
    pub const SECOND: SlotId = SlotId(1);

    /// Build a slot from an index, rejecting anything past the second slot.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < SLOT_COUNT).then(|| SlotId(index as u8))
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The other participant's slot.
    pub fn peer(self) -> SlotId {
        SlotId((self.0 + 1) % SLOT_COUNT as u8)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

/// 1-based round counter. Never decreases within a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundNumber(pub u32);

impl RoundNumber {
    pub const FIRST: RoundNumber = RoundNumber(1);

    pub fn next(self) -> RoundNumber {
        RoundNumber(self.0 + 1)
    }
}

impl fmt::Display for RoundNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {}", self.0)
    }
}
