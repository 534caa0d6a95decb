// The match state machine.
//
// `MatchSession` owns both `PlayerState`s, the current round's
// `ResolutionResult`, and the link to the relay. The presentation layer
// drives it with a handful of inputs (`start_match`, `select_move`,
// `submit_moves`, `acknowledge`, `quit`) and one `update(dt)` per frame,
// and reads it back through accessors or an owned `snapshot()`.
//
// Phases:
//
//   MainMenu --start_match--> Connecting --handshake ok--> Selecting
//   Connecting --connect/protocol error--> ConnectFailed --acknowledge--> MainMenu
//   Selecting --count reached / timer expired--> Waiting
//   Waiting --peer moves arrive, round resolved--> Resolving
//   Resolving --steps exhausted--> Selecting (next round) | GameOver
//   any phase after Connecting --MatchEnded / protocol error--> GameOver (aborted)
//   GameOver --acknowledge--> MainMenu
//
// Networking never blocks here. The `MatchLink` implementation runs the
// blocking socket calls elsewhere (see `parry_relay::link`) and the session
// polls it once per `update`. Health is written only by `reveal_next_step`,
// which applies one step's damage at the moment that step becomes current,
// so displayed health always matches the revealed step.
//
// Round end: a round that leaves either player at 0 health ends the match;
// otherwise the round number advances until `max_rounds` is reached. Playback
// of the round in progress always runs to its last step.

use std::time::Duration;

use parry_protocol::{LinkError, RoundNumber, SlotId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, MatchConfig};
use crate::moves::Move;
use crate::player::PlayerState;
use crate::resolve::{ResolutionResult, ResolutionStep, Resolver};
use crate::rng::MatchRng;

/// What the link reports once the handshake completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StartInfo {
    pub slot: SlotId,
    pub move_count_hint: Option<u32>,
}

/// The session's view of the network. Every method must return promptly;
/// blocking work belongs on whatever thread the implementation owns.
pub trait MatchLink {
    /// The handshake outcome, once it is known. `None` while still waiting.
    fn poll_start(&mut self) -> Option<Result<StartInfo, LinkError>>;

    /// Queue this round's local moves for exchange.
    fn submit_moves(&mut self, moves: &[Move]);

    /// The peer's moves for the submitted round, once they have arrived.
    fn poll_peer_moves(&mut self) -> Option<Result<Vec<Move>, LinkError>>;

    /// Tell the relay this side is leaving and drop the connection.
    fn close(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchPhase {
    MainMenu,
    Connecting,
    ConnectFailed,
    Selecting,
    Waiting,
    Resolving,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    Player,
    Opponent,
    Draw,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("cannot {action} while in {phase:?}")]
    WrongPhase {
        action: &'static str,
        phase: MatchPhase,
    },
    #[error("{submitted} moves submitted but this round allows {allowed}")]
    TooManyMoves { submitted: usize, allowed: usize },
    #[error("Idle cannot be selected")]
    IdleNotSelectable,
}

/// Owned, serializable copy of everything the presentation layer displays.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub phase: MatchPhase,
    pub round: RoundNumber,
    pub max_rounds: u32,
    pub player: PlayerState,
    pub opponent: PlayerState,
    pub moves_this_round: usize,
    pub pending_moves: Vec<Move>,
    pub selection_remaining_ms: u64,
    pub current_step: Option<ResolutionStep>,
    pub step_index: usize,
    pub total_steps: usize,
    pub step_timer_ms: u64,
    pub winner: Option<Winner>,
    pub abort_reason: Option<String>,
}

pub struct MatchSession<L: MatchLink> {
    config: MatchConfig,
    resolver: Resolver,
    rng: MatchRng,
    phase: MatchPhase,
    round: RoundNumber,
    player: PlayerState,
    opponent: PlayerState,
    link: Option<L>,
    slot: Option<SlotId>,
    move_count_hint: Option<u32>,
    moves_this_round: usize,
    pending: Vec<Move>,
    selection_remaining: Duration,
    result: Option<ResolutionResult>,
    /// Number of steps revealed so far this round.
    step_index: usize,
    step_timer: Duration,
    abort_reason: Option<LinkError>,
}

impl<L: MatchLink> MatchSession<L> {
    pub fn new(config: MatchConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let player = PlayerState::new(config.player_name.clone(), config.max_health);
        let opponent = PlayerState::new(config.opponent_name.clone(), config.max_health);
        Ok(Self {
            resolver: Resolver::new(config.outcomes.clone()),
            rng: MatchRng::new(seed),
            phase: MatchPhase::MainMenu,
            round: RoundNumber::FIRST,
            player,
            opponent,
            link: None,
            slot: None,
            move_count_hint: None,
            moves_this_round: config.min_moves,
            pending: Vec::new(),
            selection_remaining: Duration::ZERO,
            result: None,
            step_index: 0,
            step_timer: Duration::ZERO,
            abort_reason: None,
            config,
        })
    }

    // -----------------------------------------------------------------------
    // Inputs
    // -----------------------------------------------------------------------

    /// Begin a new match over `link`. Resets health, the round counter and
    /// any previous round's result.
    pub fn start_match(&mut self, link: L) -> Result<(), SessionError> {
        self.require(MatchPhase::MainMenu, "start a match")?;
        self.round = RoundNumber::FIRST;
        self.player.reset_health();
        self.opponent.reset_health();
        self.player.clear_moves();
        self.opponent.clear_moves();
        self.result = None;
        self.step_index = 0;
        self.pending.clear();
        self.abort_reason = None;
        self.slot = None;
        self.move_count_hint = None;
        self.link = Some(link);
        self.enter(MatchPhase::Connecting);
        Ok(())
    }

    /// Commit one move. Submits automatically once the round's count is
    /// reached.
    pub fn select_move(&mut self, mv: Move) -> Result<(), SessionError> {
        self.require(MatchPhase::Selecting, "select a move")?;
        if !mv.is_selectable() {
            return Err(SessionError::IdleNotSelectable);
        }
        self.pending.push(mv);
        if self.pending.len() >= self.moves_this_round {
            self.submit_pending();
        }
        Ok(())
    }

    /// Commit a whole list at once. Shorter than the round's count is allowed
    /// (it is what a timed-out selection sends); longer is not.
    pub fn submit_moves(&mut self, moves: Vec<Move>) -> Result<(), SessionError> {
        self.require(MatchPhase::Selecting, "submit moves")?;
        if moves.len() > self.moves_this_round {
            return Err(SessionError::TooManyMoves {
                submitted: moves.len(),
                allowed: self.moves_this_round,
            });
        }
        if moves.contains(&Move::Idle) {
            return Err(SessionError::IdleNotSelectable);
        }
        self.pending = moves;
        self.submit_pending();
        Ok(())
    }

    /// Dismiss a terminal screen and return to the main menu.
    pub fn acknowledge(&mut self) -> Result<(), SessionError> {
        match self.phase {
            MatchPhase::GameOver | MatchPhase::ConnectFailed => {
                self.link = None;
                self.enter(MatchPhase::MainMenu);
                Ok(())
            }
            phase => Err(SessionError::WrongPhase {
                action: "acknowledge",
                phase,
            }),
        }
    }

    /// Leave whatever is in progress: tell the relay, drop the link, and go
    /// back to the main menu.
    pub fn quit(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        if self.phase != MatchPhase::MainMenu {
            info!(phase = ?self.phase, "match quit");
            self.enter(MatchPhase::MainMenu);
        }
    }

    /// Advance by one presentation frame.
    pub fn update(&mut self, dt: Duration) {
        match self.phase {
            MatchPhase::Connecting => self.update_connecting(),
            MatchPhase::Selecting => {
                self.selection_remaining = self.selection_remaining.saturating_sub(dt);
                if self.selection_remaining.is_zero() {
                    debug!(
                        committed = self.pending.len(),
                        required = self.moves_this_round,
                        "selection timer expired"
                    );
                    self.submit_pending();
                }
            }
            MatchPhase::Waiting => self.update_waiting(),
            MatchPhase::Resolving => {
                self.step_timer = self.step_timer.saturating_sub(dt);
                if self.step_timer.is_zero() {
                    self.reveal_next_step();
                }
            }
            MatchPhase::MainMenu | MatchPhase::ConnectFailed | MatchPhase::GameOver => {}
        }
    }

    // -----------------------------------------------------------------------
    // Read-only surface
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn round_number(&self) -> RoundNumber {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.config.max_rounds
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn opponent(&self) -> &PlayerState {
        &self.opponent
    }

    /// Relay slot, once the handshake has completed.
    pub fn slot(&self) -> Option<SlotId> {
        self.slot
    }

    pub fn moves_this_round(&self) -> usize {
        self.moves_this_round
    }

    pub fn pending_moves(&self) -> &[Move] {
        &self.pending
    }

    pub fn selection_remaining(&self) -> Duration {
        self.selection_remaining
    }

    /// This round's resolution, once the peer's moves have arrived.
    pub fn result(&self) -> Option<&ResolutionResult> {
        self.result.as_ref()
    }

    /// The step currently on screen during playback.
    pub fn current_step(&self) -> Option<&ResolutionStep> {
        if self.phase != MatchPhase::Resolving || self.step_index == 0 {
            return None;
        }
        self.result.as_ref()?.steps.get(self.step_index - 1)
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn total_steps(&self) -> usize {
        self.result.as_ref().map_or(0, ResolutionResult::len)
    }

    pub fn step_timer(&self) -> Duration {
        self.step_timer
    }

    /// Only meaningful in `GameOver`.
    pub fn winner(&self) -> Option<Winner> {
        if self.phase != MatchPhase::GameOver {
            return None;
        }
        let (mine, theirs) = (self.player.health(), self.opponent.health());
        Some(if mine > theirs {
            Winner::Player
        } else if theirs > mine {
            Winner::Opponent
        } else {
            Winner::Draw
        })
    }

    /// Why the match stopped early, if it did.
    pub fn abort_reason(&self) -> Option<&LinkError> {
        self.abort_reason.as_ref()
    }

    pub fn link(&self) -> Option<&L> {
        self.link.as_ref()
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        MatchSnapshot {
            phase: self.phase,
            round: self.round,
            max_rounds: self.config.max_rounds,
            player: self.player.clone(),
            opponent: self.opponent.clone(),
            moves_this_round: self.moves_this_round,
            pending_moves: self.pending.clone(),
            selection_remaining_ms: self.selection_remaining.as_millis() as u64,
            current_step: self.current_step().copied(),
            step_index: self.step_index,
            total_steps: self.total_steps(),
            step_timer_ms: self.step_timer.as_millis() as u64,
            winner: self.winner(),
            abort_reason: self.abort_reason.as_ref().map(ToString::to_string),
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    fn require(&self, phase: MatchPhase, action: &'static str) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::WrongPhase {
                action,
                phase: self.phase,
            })
        }
    }

    fn enter(&mut self, phase: MatchPhase) {
        debug!(from = ?self.phase, to = ?phase, round = self.round.0, "phase change");
        self.phase = phase;
    }

    fn update_connecting(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        match link.poll_start() {
            None => {}
            Some(Ok(info)) => {
                info!(slot = %info.slot, hint = ?info.move_count_hint, "match started");
                self.slot = Some(info.slot);
                self.move_count_hint = info.move_count_hint;
                self.begin_selection();
            }
            Some(Err(LinkError::MatchEnded)) => self.abort(LinkError::MatchEnded),
            Some(Err(err)) => {
                warn!(%err, "could not join a match");
                self.abort_reason = Some(err);
                if let Some(mut link) = self.link.take() {
                    link.close();
                }
                self.enter(MatchPhase::ConnectFailed);
            }
        }
    }

    fn update_waiting(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        match link.poll_peer_moves() {
            None => {}
            Some(Ok(peer)) => self.begin_playback(peer),
            Some(Err(err)) => self.abort(err),
        }
    }

    fn begin_selection(&mut self) {
        self.moves_this_round = match self.move_count_hint {
            Some(hint) => {
                (hint as usize).clamp(self.config.min_moves, self.config.max_moves)
            }
            None => self
                .rng
                .range_usize_inclusive(self.config.min_moves, self.config.max_moves),
        };
        self.pending.clear();
        self.player.clear_moves();
        self.opponent.clear_moves();
        self.result = None;
        self.step_index = 0;
        self.selection_remaining = self.config.selection_time();
        self.enter(MatchPhase::Selecting);
    }

    /// Send the committed list and keep exactly what was sent as the local
    /// side of this round, so both peers resolve the same pair.
    fn submit_pending(&mut self) {
        let mut moves = std::mem::take(&mut self.pending);
        if moves.is_empty() {
            moves = Move::NOTHING_SELECTED.to_vec();
        }
        debug!(round = self.round.0, ?moves, "submitting moves");
        if let Some(link) = self.link.as_mut() {
            link.submit_moves(&moves);
        }
        self.player.set_moves(moves);
        self.enter(MatchPhase::Waiting);
    }

    fn begin_playback(&mut self, peer: Vec<Move>) {
        let result = self.resolver.resolve(
            self.player.moves(),
            &peer,
            self.player.health(),
            self.opponent.health(),
        );
        debug!(
            round = self.round.0,
            steps = result.len(),
            local = result.final_local_health,
            peer = result.final_peer_health,
            "round resolved"
        );
        self.opponent.set_moves(peer);
        self.result = Some(result);
        self.step_index = 0;
        self.enter(MatchPhase::Resolving);
        self.reveal_next_step();
    }

    /// Make the next step current and apply its damage, or finish the round.
    fn reveal_next_step(&mut self) {
        let step = self
            .result
            .as_ref()
            .and_then(|r| r.steps.get(self.step_index))
            .copied();
        match step {
            Some(step) => {
                self.player.apply_damage(step.damage_to_local);
                self.opponent.apply_damage(step.damage_to_peer);
                self.step_index += 1;
                self.step_timer = self.config.step_delay();
            }
            None => self.end_round(),
        }
    }

    fn end_round(&mut self) {
        let knocked_out = !self.player.is_alive() || !self.opponent.is_alive();
        if !knocked_out && self.round.0 < self.config.max_rounds {
            self.round = self.round.next();
            info!(round = self.round.0, "next round");
            self.begin_selection();
        } else {
            info!(
                player = self.player.health(),
                opponent = self.opponent.health(),
                knocked_out,
                "match over"
            );
            if let Some(link) = self.link.as_mut() {
                link.close();
            }
            self.enter(MatchPhase::GameOver);
        }
    }

    /// Stop the match where it stands; no further resolution.
    fn abort(&mut self, reason: LinkError) {
        warn!(%reason, phase = ?self.phase, "match aborted");
        if let Some(link) = self.link.as_mut() {
            link.close();
        }
        self.abort_reason = Some(reason);
        self.enter(MatchPhase::GameOver);
    }
}
