// Data-driven outcome table: ordered (local, peer) move pair -> damage pair.
//
// The resolver never hard-codes combat rules; it looks every aligned pair up
// here. Keys are ordered, so `(A, B)` and `(B, A)` are independent entries and
// a table is free to be asymmetric. A pair with no entry resolves to zero
// damage both ways. That fallback is silent at resolution time, so
// `missing_pairs()` exists for loaders to report gaps up front (see
// `config.rs`).
//
// On disk a table is a JSON list of entries, because JSON object keys cannot
// be tuples:
//
//   [{ "local": "Attack Left", "peer": "Counter Left",
//      "damage_to_local": 15, "damage_to_peer": 0 }, ...]
//
// `standard()` builds the shipped balance from a handful of rules (see
// `standard_dealt`) and covers all 49 ordered pairs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::moves::{Move, Stance};

/// Light / medium / heavy damage tiers used by the standard table.
pub const LIGHT: u32 = 5;
pub const MEDIUM: u32 = 10;
pub const HEAVY: u32 = 15;

/// Damage produced by one aligned move pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Damage {
    pub to_local: u32,
    pub to_peer: u32,
}

impl Damage {
    pub const NONE: Damage = Damage {
        to_local: 0,
        to_peer: 0,
    };

    pub const fn new(to_local: u32, to_peer: u32) -> Self {
        Self { to_local, to_peer }
    }
}

/// One row of the on-disk representation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEntry {
    pub local: Move,
    pub peer: Move,
    pub damage_to_local: u32,
    pub damage_to_peer: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<OutcomeEntry>", into = "Vec<OutcomeEntry>")]
pub struct OutcomeTable {
    entries: BTreeMap<(Move, Move), Damage>,
}

impl OutcomeTable {
    /// A table with no entries; every pair resolves to zero damage.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shipped balance. Swap-symmetric by construction: the outcome of
    /// `(A, B)` is the outcome of `(B, A)` with the damages exchanged.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for local in Move::ALL {
            for peer in Move::ALL {
                table.insert(
                    local,
                    peer,
                    Damage::new(standard_dealt(peer, local), standard_dealt(local, peer)),
                );
            }
        }
        table
    }

    /// Insert or replace the entry for an ordered pair.
    pub fn insert(&mut self, local: Move, peer: Move, damage: Damage) {
        self.entries.insert((local, peer), damage);
    }

    /// The entry for an ordered pair, if the table has one.
    pub fn get(&self, local: Move, peer: Move) -> Option<Damage> {
        self.entries.get(&(local, peer)).copied()
    }

    /// Damage for an ordered pair, falling back to no damage for gaps.
    pub fn outcome(&self, local: Move, peer: Move) -> Damage {
        self.get(local, peer).unwrap_or(Damage::NONE)
    }

    /// Ordered pairs over the full move set that have no entry.
    pub fn missing_pairs(&self) -> Vec<(Move, Move)> {
        let mut missing = Vec::new();
        for local in Move::ALL {
            for peer in Move::ALL {
                if !self.entries.contains_key(&(local, peer)) {
                    missing.push((local, peer));
                }
            }
        }
        missing
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<OutcomeEntry>> for OutcomeTable {
    fn from(rows: Vec<OutcomeEntry>) -> Self {
        let mut table = Self::empty();
        for row in rows {
            table.insert(
                row.local,
                row.peer,
                Damage::new(row.damage_to_local, row.damage_to_peer),
            );
        }
        table
    }
}

impl From<OutcomeTable> for Vec<OutcomeEntry> {
    fn from(table: OutcomeTable) -> Self {
        table
            .entries
            .into_iter()
            .map(|((local, peer), d)| OutcomeEntry {
                local,
                peer,
                damage_to_local: d.to_local,
                damage_to_peer: d.to_peer,
            })
            .collect()
    }
}

/// Damage that `actor` inflicts on `target` under the standard rules.
///
/// - An attack blocked by a same-side guard does nothing; a guard on the
///   wrong side takes a medium hit.
/// - Two attacks trade: medium on the same side, light when they cross.
/// - A counter on the attacked side lands heavy and the attack does nothing.
///   A counter on the wrong side leaves the counterer open to a heavy hit.
/// - Attacks on an idle target land medium. Defend, counter and idle never
///   deal damage on their own.
fn standard_dealt(actor: Move, target: Move) -> u32 {
    let same_side = actor.side().is_some() && actor.side() == target.side();
    match (actor.stance(), target.stance()) {
        (Stance::Attack, Stance::Attack) => {
            if same_side {
                MEDIUM
            } else {
                LIGHT
            }
        }
        (Stance::Attack, Stance::Defend) => {
            if same_side {
                0
            } else {
                MEDIUM
            }
        }
        (Stance::Attack, Stance::Counter) => {
            if same_side {
                0
            } else {
                HEAVY
            }
        }
        (Stance::Attack, Stance::Idle) => MEDIUM,
        (Stance::Counter, Stance::Attack) if same_side => HEAVY,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_covers_every_pair() {
        let table = OutcomeTable::standard();
        assert_eq!(table.len(), 49);
        assert!(table.missing_pairs().is_empty());
    }

    #[test]
    fn standard_is_swap_symmetric() {
        let table = OutcomeTable::standard();
        for a in Move::ALL {
            for b in Move::ALL {
                let ab = table.outcome(a, b);
                let ba = table.outcome(b, a);
                assert_eq!(ab.to_local, ba.to_peer, "{a} vs {b}");
                assert_eq!(ab.to_peer, ba.to_local, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn standard_spot_checks() {
        let t = OutcomeTable::standard();
        assert_eq!(t.outcome(Move::AttackLeft, Move::DefendLeft), Damage::NONE);
        assert_eq!(
            t.outcome(Move::AttackLeft, Move::DefendRight),
            Damage::new(0, MEDIUM)
        );
        assert_eq!(
            t.outcome(Move::AttackLeft, Move::CounterLeft),
            Damage::new(HEAVY, 0)
        );
        assert_eq!(
            t.outcome(Move::AttackRight, Move::CounterLeft),
            Damage::new(0, HEAVY)
        );
        assert_eq!(
            t.outcome(Move::AttackLeft, Move::AttackRight),
            Damage::new(LIGHT, LIGHT)
        );
        assert_eq!(t.outcome(Move::Idle, Move::AttackRight), Damage::new(MEDIUM, 0));
        assert_eq!(t.outcome(Move::Idle, Move::Idle), Damage::NONE);
    }

    #[test]
    fn missing_pair_falls_back_to_zero() {
        let mut t = OutcomeTable::empty();
        t.insert(Move::AttackLeft, Move::Idle, Damage::new(0, 40));
        assert_eq!(t.get(Move::Idle, Move::AttackLeft), None);
        assert_eq!(t.outcome(Move::Idle, Move::AttackLeft), Damage::NONE);
        assert_eq!(t.missing_pairs().len(), 48);
    }

    #[test]
    fn asymmetric_entries_are_independent() {
        let mut t = OutcomeTable::empty();
        t.insert(Move::AttackLeft, Move::DefendLeft, Damage::new(1, 2));
        t.insert(Move::DefendLeft, Move::AttackLeft, Damage::new(7, 0));
        assert_eq!(t.outcome(Move::AttackLeft, Move::DefendLeft), Damage::new(1, 2));
        assert_eq!(t.outcome(Move::DefendLeft, Move::AttackLeft), Damage::new(7, 0));
    }

    #[test]
    fn json_entries_load() {
        let json = r#"[
            {"local": "Attack Left", "peer": "Idle", "damage_to_local": 0, "damage_to_peer": 12},
            {"local": "Idle", "peer": "Attack Left", "damage_to_local": 3, "damage_to_peer": 0}
        ]"#;
        let t: OutcomeTable = serde_json::from_str(json).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.outcome(Move::AttackLeft, Move::Idle), Damage::new(0, 12));
        assert_eq!(t.outcome(Move::Idle, Move::AttackLeft), Damage::new(3, 0));

        let back = serde_json::to_string(&t).unwrap();
        let again: OutcomeTable = serde_json::from_str(&back).unwrap();
        assert_eq!(again, t);
    }
}
