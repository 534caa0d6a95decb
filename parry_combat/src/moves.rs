// The closed set of combat moves.
//
// Six selectable moves (attack / defend / counter, each aimed left or right)
// plus `Idle`, which participants never choose: the resolver uses it to pad
// the shorter of two sequences, and the session submits two of them in place
// of an empty list. Moves serialize as their display labels (`"Attack Left"`)
// because that is what travels through the relay and what outcome tables are
// keyed by on disk.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side a move is aimed at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    Left,
    Right,
}

/// What a move does, independent of side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stance {
    Attack,
    Defend,
    Counter,
    Idle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Move {
    #[serde(rename = "Attack Left")]
    AttackLeft,
    #[serde(rename = "Attack Right")]
    AttackRight,
    #[serde(rename = "Defend Left")]
    DefendLeft,
    #[serde(rename = "Defend Right")]
    DefendRight,
    #[serde(rename = "Counter Left")]
    CounterLeft,
    #[serde(rename = "Counter Right")]
    CounterRight,
    #[serde(rename = "Idle")]
    Idle,
}

/// A label that names no move.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown move label {0:?}")]
pub struct UnknownMove(pub String);

impl Move {
    /// Every move, `Idle` last.
    pub const ALL: [Move; 7] = [
        Move::AttackLeft,
        Move::AttackRight,
        Move::DefendLeft,
        Move::DefendRight,
        Move::CounterLeft,
        Move::CounterRight,
        Move::Idle,
    ];

    /// The moves a participant may pick.
    pub const SELECTABLE: [Move; 6] = [
        Move::AttackLeft,
        Move::AttackRight,
        Move::DefendLeft,
        Move::DefendRight,
        Move::CounterLeft,
        Move::CounterRight,
    ];

    /// What a round with nothing selected is submitted as.
    pub const NOTHING_SELECTED: [Move; 2] = [Move::Idle, Move::Idle];

    pub fn label(self) -> &'static str {
        match self {
            Move::AttackLeft => "Attack Left",
            Move::AttackRight => "Attack Right",
            Move::DefendLeft => "Defend Left",
            Move::DefendRight => "Defend Right",
            Move::CounterLeft => "Counter Left",
            Move::CounterRight => "Counter Right",
            Move::Idle => "Idle",
        }
    }

    pub fn stance(self) -> Stance {
        match self {
            Move::AttackLeft | Move::AttackRight => Stance::Attack,
            Move::DefendLeft | Move::DefendRight => Stance::Defend,
            Move::CounterLeft | Move::CounterRight => Stance::Counter,
            Move::Idle => Stance::Idle,
        }
    }

    /// `None` for `Idle`.
    pub fn side(self) -> Option<Side> {
        match self {
            Move::AttackLeft | Move::DefendLeft | Move::CounterLeft => Some(Side::Left),
            Move::AttackRight | Move::DefendRight | Move::CounterRight => Some(Side::Right),
            Move::Idle => None,
        }
    }

    pub fn is_selectable(self) -> bool {
        self != Move::Idle
    }

    /// Labels for a whole sequence, in order.
    pub fn labels(moves: &[Move]) -> Vec<String> {
        moves.iter().map(|m| m.label().to_owned()).collect()
    }

    /// Parse a sequence of labels, failing on the first unknown one.
    pub fn parse_labels<S: AsRef<str>>(labels: &[S]) -> Result<Vec<Move>, UnknownMove> {
        labels.iter().map(|l| l.as_ref().parse()).collect()
    }
}

impl FromStr for Move {
    type Err = UnknownMove;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Move::ALL
            .into_iter()
            .find(|m| m.label() == s)
            .ok_or_else(|| UnknownMove(s.to_owned()))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
