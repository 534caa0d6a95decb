// Test-only participant for two-player integration tests.
//
// Wraps a real `MatchSession` driven through a real `LinkWorker` (from
// `parry_relay::link`) to give tests a synchronous API for exercising the
// whole pipeline: relay -> link -> session -> resolution -> playback.
//
// The only test-specific code here is the blocking loops that pump
// `MatchSession::update` until a phase is reached. Every networking and
// game-logic path is the one the real game uses. Tests that need both
// participants to make progress at once use `pump_both`, since an exchange
// only completes when both sides have submitted.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use parry_combat::{MatchConfig, MatchPhase, MatchSession, Move};
use parry_relay::client::LinkConfig;
use parry_relay::link::LinkWorker;
use parry_relay::server::RelayConfig;

/// Default timeout for blocking pump operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep between pump iterations.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A test participant: a real session over a real link.
pub struct TestDuelist {
    pub session: MatchSession<LinkWorker>,
    /// Simulated time handed to `update` each frame.
    pub frame: Duration,
}

impl TestDuelist {
    fn new(config: MatchConfig, seed: u64, link: LinkWorker) -> Self {
        let frame = config.step_delay();
        let mut session =
            MatchSession::new(config, seed).expect("TestDuelist: invalid match config");
        session
            .start_match(link)
            .expect("TestDuelist: start_match failed");
        Self { session, frame }
    }

    /// Join the relay at `addr`.
    pub fn join(addr: SocketAddr, config: MatchConfig, seed: u64) -> Self {
        let link = LinkWorker::spawn(addr.to_string(), test_link_config());
        Self::new(config, seed, link)
    }

    /// Host an embedded relay and join it. Returns the relay's address for
    /// the opponent.
    pub fn host(relay: RelayConfig, config: MatchConfig, seed: u64) -> (Self, SocketAddr) {
        let (link, addr) =
            LinkWorker::host(relay, test_link_config()).expect("TestDuelist: host failed");
        (Self::new(config, seed, link), addr)
    }

    pub fn phase(&self) -> MatchPhase {
        self.session.phase()
    }

    /// One presentation frame.
    pub fn tick(&mut self) {
        self.session.update(self.frame);
    }

    /// Pump frames until `done` holds.
    pub fn pump_until(&mut self, what: &str, mut done: impl FnMut(&MatchSession<LinkWorker>) -> bool) {
        let start = Instant::now();
        while !done(&self.session) {
            assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
            self.tick();
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Pump until the session reaches `phase`.
    pub fn pump_until_phase(&mut self, phase: MatchPhase) {
        self.pump_until(&format!("{phase:?}"), |s| s.phase() == phase);
    }

    /// Commit this round's moves in one go.
    pub fn submit(&mut self, moves: &[Move]) {
        self.session
            .submit_moves(moves.to_vec())
            .expect("TestDuelist: submit_moves failed");
    }

    /// Pump until the round's playback is over.
    pub fn finish_round(&mut self) {
        self.pump_until("end of round", |s| {
            !matches!(s.phase(), MatchPhase::Waiting | MatchPhase::Resolving)
        });
    }
}

/// Pump both participants until `done` holds for both.
pub fn pump_both(
    a: &mut TestDuelist,
    b: &mut TestDuelist,
    what: &str,
    done: impl Fn(&MatchSession<LinkWorker>) -> bool,
) {
    let start = Instant::now();
    while !(done(&a.session) && done(&b.session)) {
        assert!(start.elapsed() < POLL_TIMEOUT, "timed out waiting for {what}");
        if !done(&a.session) {
            a.tick();
        }
        if !done(&b.session) {
            b.tick();
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Match config with fast timers for tests.
pub fn test_match_config() -> MatchConfig {
    MatchConfig {
        step_delay_ms: 5,
        selection_time_ms: 60_000,
        ..MatchConfig::default()
    }
}

/// Link timeouts short enough that a hung test fails rather than stalls.
pub fn test_link_config() -> LinkConfig {
    LinkConfig {
        connect_timeout_ms: 1_000,
        handshake_timeout_ms: Some(10_000),
        exchange_timeout_ms: Some(10_000),
    }
}
