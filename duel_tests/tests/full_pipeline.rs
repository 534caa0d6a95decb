// End-to-end integration tests for a two-player match.
//
// Each test hosts a real relay (embedded through `LinkWorker::host`), joins
// it with a second real session, and drives both `MatchSession`s frame by
// frame through `TestDuelist`. The paths exercised are the live ones:
// framing, relay buffering, the link worker thread, resolution and step
// playback. Only the pumping loops are test-specific.

use duel_tests::{TestDuelist, pump_both, test_match_config};
use parry_combat::{Damage, MatchConfig, MatchPhase, Move, OutcomeTable, Winner};
use parry_protocol::{LinkError, RoundNumber};
use parry_relay::server::RelayConfig;

fn relay_config(hint: Option<u32>) -> RelayConfig {
    RelayConfig {
        port: 0,
        move_count_hint: hint,
        ..RelayConfig::default()
    }
}

/// Host a relay and join it from a second session; both reach Selecting.
fn start_duel(
    hint: Option<u32>,
    host_config: MatchConfig,
    guest_config: MatchConfig,
) -> (TestDuelist, TestDuelist) {
    let (mut host, addr) = TestDuelist::host(relay_config(hint), host_config, 1);
    let mut guest = TestDuelist::join(addr, guest_config, 2);
    pump_both(&mut host, &mut guest, "match start", |s| {
        s.phase() == MatchPhase::Selecting
    });
    assert_eq!(
        host.session.slot().map(|s| s.peer()),
        guest.session.slot()
    );
    (host, guest)
}

fn play_round(host: &mut TestDuelist, guest: &mut TestDuelist, h: &[Move], g: &[Move]) {
    host.submit(h);
    guest.submit(g);
    pump_both(host, guest, "end of round", |s| {
        !matches!(s.phase(), MatchPhase::Waiting | MatchPhase::Resolving)
    });
}

// ---------------------------------------------------------------------------
// Test scenarios
// ---------------------------------------------------------------------------

/// Three full rounds to the round cap. Both sides must agree on every
/// health value and on who won.
#[test]
fn three_rounds_to_the_cap() {
    let (mut host, mut guest) = start_duel(Some(2), test_match_config(), test_match_config());
    assert_eq!(host.session.moves_this_round(), 2);
    assert_eq!(guest.session.moves_this_round(), 2);

    // Round 1: one blocked attack, one landing across the guard.
    play_round(
        &mut host,
        &mut guest,
        &[Move::AttackLeft, Move::AttackRight],
        &[Move::DefendLeft, Move::DefendLeft],
    );
    assert_eq!(host.session.round_number(), RoundNumber(2));
    assert_eq!(host.session.opponent().health(), 90);
    assert_eq!(guest.session.player().health(), 90);

    // Round 2: a same-side counter lands heavy.
    play_round(
        &mut host,
        &mut guest,
        &[Move::CounterLeft, Move::DefendRight],
        &[Move::AttackLeft, Move::AttackRight],
    );
    assert_eq!(guest.session.round_number(), RoundNumber(3));
    assert_eq!(host.session.player().health(), 100);
    assert_eq!(host.session.opponent().health(), 75);

    // Round 3: the host commits a short list and is padded with Idle.
    play_round(
        &mut host,
        &mut guest,
        &[Move::AttackLeft],
        &[Move::AttackLeft, Move::CounterRight],
    );

    assert_eq!(host.phase(), MatchPhase::GameOver);
    assert_eq!(guest.phase(), MatchPhase::GameOver);
    assert_eq!(host.session.round_number(), RoundNumber(3));
    assert_eq!(host.session.player().health(), 90);
    assert_eq!(host.session.opponent().health(), 65);
    assert_eq!(guest.session.player().health(), 65);
    assert_eq!(guest.session.opponent().health(), 90);
    assert_eq!(host.session.winner(), Some(Winner::Player));
    assert_eq!(guest.session.winner(), Some(Winner::Opponent));
    assert!(host.session.abort_reason().is_none());

    // The last round's results mirror each other step for step.
    let hr = host.session.result().unwrap();
    let gr = guest.session.result().unwrap();
    assert_eq!(hr.len(), 2);
    assert_eq!(hr.steps[1].local_move, Move::Idle);
    for (h, g) in hr.steps.iter().zip(&gr.steps) {
        assert_eq!(h.local_move, g.peer_move);
        assert_eq!(h.damage_to_local, g.damage_to_peer);
        assert_eq!(h.damage_to_peer, g.damage_to_local);
    }

    let snapshot = serde_json::to_value(host.session.snapshot()).unwrap();
    assert_eq!(snapshot["phase"], "GameOver");
    assert_eq!(snapshot["winner"], "Player");

    host.session.acknowledge().unwrap();
    guest.session.acknowledge().unwrap();
    assert_eq!(host.phase(), MatchPhase::MainMenu);
}

/// A knockout ends the match at the end of the round it happens in.
#[test]
fn knockout_ends_match_early() {
    let config = MatchConfig {
        max_health: 20,
        ..test_match_config()
    };
    let (mut host, mut guest) = start_duel(Some(2), config.clone(), config);

    play_round(
        &mut host,
        &mut guest,
        &[Move::CounterLeft, Move::CounterLeft],
        &[Move::AttackLeft, Move::AttackLeft],
    );

    assert_eq!(host.phase(), MatchPhase::GameOver);
    assert_eq!(guest.phase(), MatchPhase::GameOver);
    assert_eq!(host.session.round_number(), RoundNumber::FIRST);
    assert_eq!(host.session.opponent().health(), 0);
    assert!(!guest.session.player().is_alive());
    assert_eq!(host.session.winner(), Some(Winner::Player));
    assert_eq!(guest.session.winner(), Some(Winner::Opponent));
}

/// Without a relay hint each side draws its own count within bounds.
#[test]
fn move_count_drawn_locally_without_hint() {
    let config = MatchConfig {
        min_moves: 3,
        max_moves: 5,
        ..test_match_config()
    };
    let (host, guest) = start_duel(None, config.clone(), config);
    for duelist in [&host, &guest] {
        assert!((3..=5).contains(&duelist.session.moves_this_round()));
    }
}

/// A participant who runs out the selection timer submits what it has;
/// an empty list still goes through as two Idles.
#[test]
fn selection_timeout_submits_partial_list() {
    let hasty = MatchConfig {
        selection_time_ms: 20,
        ..test_match_config()
    };
    let (mut host, mut guest) = start_duel(Some(2), test_match_config(), hasty);

    host.submit(&[Move::AttackLeft, Move::AttackLeft]);
    pump_both(&mut host, &mut guest, "end of round", |s| {
        s.phase() == MatchPhase::Selecting && s.round_number() == RoundNumber(2)
    });

    assert_eq!(host.session.opponent().health(), 80);
    assert_eq!(guest.session.player().health(), 80);
    assert_eq!(host.session.player().health(), 100);
    assert_eq!(guest.session.opponent().health(), 100);
}

/// A side that selects nothing resolves against the same two Idles its peer
/// receives, so both views agree even when Idle against Idle deals damage.
#[test]
fn empty_selection_resolves_identically_on_both_sides() {
    let mut outcomes = OutcomeTable::standard();
    outcomes.insert(Move::Idle, Move::Idle, Damage::new(3, 3));
    let steady = MatchConfig {
        outcomes,
        ..test_match_config()
    };
    let hasty = MatchConfig {
        selection_time_ms: 20,
        ..steady.clone()
    };
    let (mut host, mut guest) = start_duel(Some(2), steady, hasty);

    host.submit(&[Move::DefendLeft]);
    pump_both(&mut host, &mut guest, "playback", |s| {
        s.phase() == MatchPhase::Resolving
    });

    let hr = host.session.result().unwrap().clone();
    let gr = guest.session.result().unwrap().clone();
    assert_eq!(hr.len(), 2);
    assert_eq!(gr.len(), 2);
    for (h, g) in hr.steps.iter().zip(&gr.steps) {
        assert_eq!(h.local_move, g.peer_move);
        assert_eq!(h.peer_move, g.local_move);
        assert_eq!(h.damage_to_local, g.damage_to_peer);
        assert_eq!(h.damage_to_peer, g.damage_to_local);
    }
    assert_eq!(hr.final_local_health, gr.final_peer_health);
    assert_eq!(hr.final_peer_health, gr.final_local_health);
    assert_eq!(hr.steps[1].damage_to_local, 3);

    pump_both(&mut host, &mut guest, "end of round", |s| {
        s.phase() == MatchPhase::Selecting && s.round_number() == RoundNumber(2)
    });
    assert_eq!(host.session.opponent().health(), guest.session.player().health());
    assert_eq!(host.session.player().health(), guest.session.opponent().health());
}

/// The opponent quitting mid-match aborts the match for the other side
/// with current health standing.
#[test]
fn opponent_quit_aborts_match() {
    let (mut host, mut guest) = start_duel(Some(2), test_match_config(), test_match_config());

    play_round(
        &mut host,
        &mut guest,
        &[Move::AttackRight, Move::AttackRight],
        &[Move::DefendLeft, Move::DefendRight],
    );
    assert_eq!(host.session.opponent().health(), 90);

    guest.session.quit();
    assert_eq!(guest.phase(), MatchPhase::MainMenu);

    host.submit(&[Move::DefendLeft, Move::DefendRight]);
    host.pump_until_phase(MatchPhase::GameOver);
    assert_eq!(host.session.abort_reason(), Some(&LinkError::MatchEnded));
    assert_eq!(host.session.round_number(), RoundNumber(2));
    assert_eq!(host.session.opponent().health(), 90);
    assert_eq!(host.session.winner(), Some(Winner::Player));
}

/// Joining an address nobody listens on shows the connect-failed screen.
#[test]
fn unreachable_relay_shows_connect_failed() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let addr = format!("127.0.0.1:{port}").parse().unwrap();
    let mut lonely = TestDuelist::join(addr, test_match_config(), 7);
    lonely.pump_until_phase(MatchPhase::ConnectFailed);
    assert!(matches!(
        lonely.session.abort_reason(),
        Some(LinkError::Connection { .. })
    ));
    lonely.session.acknowledge().unwrap();
    assert_eq!(lonely.phase(), MatchPhase::MainMenu);
}
