// parry_combat: the game core: move resolution and the match state machine.
//
// This crate turns two participants' per-round move lists into an ordered,
// deterministic sequence of damage steps, and sequences rounds, waiting and
// step playback around that. It owns no sockets: the network side is reached
// through the `MatchLink` trait in `session.rs`, implemented by
// `parry_relay::link::LinkWorker` (and by scripted doubles in tests).
//
// Module overview:
// - `moves.rs`:    `Move`: the closed set of combat actions plus synthetic `Idle`.
// - `outcome.rs`:  `OutcomeTable`: data-driven (Move, Move) -> damage mapping.
// - `resolve.rs`:  `Resolver`, `ResolutionStep`, `ResolutionResult`: the pure
//                  resolution engine.
// - `player.rs`:   `PlayerState`: name, health, current-round moves.
// - `config.rs`:   `MatchConfig`: all tunables, loaded from JSON.
// - `rng.rs`:      `MatchRng`: xoshiro256++ used for per-round move counts.
// - `session.rs`:  `MatchSession`: MainMenu -> Connecting -> Selecting ->
//                  Waiting -> Resolving -> GameOver.
//
// **Critical constraint: determinism.** Resolution is a pure function of
// (local moves, peer moves, starting health, table). The table is a
// `BTreeMap`, randomness comes only from an explicitly seeded `MatchRng`, and
// no wall-clock time is read; the session advances only by the `dt` it is
// handed each frame.

pub mod config;
pub mod moves;
pub mod outcome;
pub mod player;
pub mod resolve;
pub mod rng;
pub mod session;

pub use config::{ConfigError, MAX_MOVES_PER_ROUND, MatchConfig};
pub use moves::{Move, Side, Stance, UnknownMove};
pub use outcome::{Damage, OutcomeTable};
pub use player::PlayerState;
pub use resolve::{ResolutionResult, ResolutionStep, Resolver};
pub use rng::MatchRng;
pub use session::{
    MatchLink, MatchPhase, MatchSession, MatchSnapshot, SessionError, StartInfo, Winner,
};
