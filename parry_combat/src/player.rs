// Per-participant state owned by the match session.
//
// Health only moves through `apply_damage` and `reset_health`, both
// crate-private: the session is the single writer, applying each step's
// damage as that step is revealed. Everything outside this crate sees
// `PlayerState` through shared references or cloned snapshots.

use serde::{Deserialize, Serialize};

use crate::moves::Move;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,
    pub max_health: u32,
    health: u32,
    /// Moves committed for the current round.
    moves: Vec<Move>,
}

impl PlayerState {
    pub fn new(name: impl Into<String>, max_health: u32) -> Self {
        Self {
            name: name.into(),
            max_health,
            health: max_health,
            moves: Vec::new(),
        }
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// 0.0 to 1.0, for health bars.
    pub fn health_fraction(&self) -> f32 {
        if self.max_health == 0 {
            return 0.0;
        }
        self.health as f32 / self.max_health as f32
    }

    pub(crate) fn set_moves(&mut self, moves: Vec<Move>) {
        self.moves = moves;
    }

    pub(crate) fn clear_moves(&mut self) {
        self.moves.clear();
    }

    pub(crate) fn apply_damage(&mut self, amount: u32) {
        self.health = self.health.saturating_sub(amount);
    }

    pub(crate) fn reset_health(&mut self) {
        self.health = self.max_health;
    }
}
