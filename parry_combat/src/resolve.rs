// The resolution engine.
//
// `Resolver::resolve` is a pure function of (local moves, peer moves,
// starting health, outcome table): it pads the shorter sequence with `Idle`,
// walks the aligned pairs in order, looks each pair up in the table and
// applies the damage with a floor at zero. The output is a
// `ResolutionResult` (the ordered steps plus both final healths), which the
// session caches for the round and plays back step by step.
//
// The starting-health parameters exist for testability and alternate
// policies. In a normal match the session passes the health currently shown
// and then applies each step's damage itself as the step is revealed, so the
// engine's final healths and the session's displayed healths agree at the
// end of playback.

use serde::{Deserialize, Serialize};

use crate::moves::Move;
use crate::outcome::OutcomeTable;

/// One aligned pair of moves and the damage it produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionStep {
    pub local_move: Move,
    pub peer_move: Move,
    pub damage_to_local: u32,
    pub damage_to_peer: u32,
    /// Local health after this step, floored at 0.
    pub local_health_after: u32,
    /// Peer health after this step, floored at 0.
    pub peer_health_after: u32,
}

/// A round's complete outcome. Read-only once produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub steps: Vec<ResolutionStep>,
    pub final_local_health: u32,
    pub final_peer_health: u32,
}

impl ResolutionResult {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn total_damage_to_local(&self) -> u32 {
        self.steps.iter().map(|s| s.damage_to_local).sum()
    }

    pub fn total_damage_to_peer(&self) -> u32 {
        self.steps.iter().map(|s| s.damage_to_peer).sum()
    }
}

/// Resolution engine bound to one outcome table.
#[derive(Clone, Debug)]
pub struct Resolver {
    table: OutcomeTable,
}

impl Resolver {
    pub fn new(table: OutcomeTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &OutcomeTable {
        &self.table
    }

    /// Resolve a round from full health on both sides.
    pub fn resolve_fresh(&self, local: &[Move], peer: &[Move], max_health: u32) -> ResolutionResult {
        self.resolve(local, peer, max_health, max_health)
    }

    /// Resolve two move sequences starting from the given healths.
    ///
    /// Produces exactly `max(local.len(), peer.len())` steps. Pairs missing
    /// from the table deal no damage.
    pub fn resolve(
        &self,
        local: &[Move],
        peer: &[Move],
        local_health: u32,
        peer_health: u32,
    ) -> ResolutionResult {
        let len = local.len().max(peer.len());
        let mut local_health = local_health;
        let mut peer_health = peer_health;
        let mut steps = Vec::with_capacity(len);

        for i in 0..len {
            let local_move = local.get(i).copied().unwrap_or(Move::Idle);
            let peer_move = peer.get(i).copied().unwrap_or(Move::Idle);
            let damage = self.table.outcome(local_move, peer_move);

            local_health = local_health.saturating_sub(damage.to_local);
            peer_health = peer_health.saturating_sub(damage.to_peer);

            steps.push(ResolutionStep {
                local_move,
                peer_move,
                damage_to_local: damage.to_local,
                damage_to_peer: damage.to_peer,
                local_health_after: local_health,
                peer_health_after: peer_health,
            });
        }

        ResolutionResult {
            steps,
            final_local_health: local_health,
            final_peer_health: peer_health,
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(OutcomeTable::standard())
    }
}
