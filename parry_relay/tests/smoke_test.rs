// Integration smoke test for the relay server.
//
// Starts a relay on localhost and drives it with two plain TCP sockets using
// the protocol crate's framing and message types: slot assignment, start,
// move exchange, and every way a match can end. A final test runs the real
// `ClientLink` against the relay to check the end-to-end error mapping.

use std::io::{BufReader, BufWriter};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

use parry_combat::Move;
use parry_protocol::framing::{read_json, write_json};
use parry_protocol::{ClientMessage, LinkError, ServerMessage, SlotId};
use parry_relay::client::{ClientLink, LinkConfig};
use parry_relay::server::{EndReason, RelayConfig, start_relay};

struct RawClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    slot: SlotId,
}

impl RawClient {
    fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let writer = BufWriter::new(stream);
        let slot = match read_json(&mut reader).unwrap() {
            ServerMessage::Assigned { slot } => slot,
            other => panic!("expected Assigned, got {other:?}"),
        };
        Self {
            reader,
            writer,
            slot,
        }
    }

    fn send(&mut self, msg: &ClientMessage) {
        write_json(&mut self.writer, msg).unwrap();
    }

    fn send_moves(&mut self, labels: &[&str]) {
        let labels = labels.iter().map(|s| s.to_string()).collect();
        self.send(&ClientMessage::Moves { labels });
    }

    fn recv(&mut self) -> ServerMessage {
        read_json(&mut self.reader).unwrap()
    }

    fn expect_start(&mut self) -> Option<u32> {
        match self.recv() {
            ServerMessage::GameStarted { move_count_hint } => move_count_hint,
            other => panic!("expected GameStarted, got {other:?}"),
        }
    }

    fn expect_closed(&mut self) {
        assert!(read_json::<_, ServerMessage>(&mut self.reader).is_err());
    }
}

fn relay(hint: Option<u32>) -> (parry_relay::RelayHandle, SocketAddr) {
    start_relay(RelayConfig {
        port: 0,
        move_count_hint: hint,
        ..RelayConfig::default()
    })
    .unwrap()
}

/// Connect two raw clients and return them ordered by slot.
fn pair(addr: SocketAddr) -> (RawClient, RawClient) {
    let a = RawClient::connect(addr);
    let b = RawClient::connect(addr);
    assert_eq!(a.slot, SlotId::FIRST);
    assert_eq!(b.slot, SlotId::SECOND);
    (a, b)
}

#[test]
fn relays_each_round_to_both_slots() {
    let (handle, addr) = relay(Some(3));
    let (mut a, mut b) = pair(addr);
    assert_eq!(a.expect_start(), Some(3));
    assert_eq!(b.expect_start(), Some(3));

    a.send_moves(&["Attack Left", "Idle"]);
    b.send_moves(&["Defend Left"]);

    let reply_a = a.recv();
    let reply_b = b.recv();
    assert_eq!(reply_a, reply_b);
    assert_eq!(
        reply_a.peer_labels(SlotId::FIRST).unwrap(),
        &["Defend Left".to_string()]
    );
    assert_eq!(
        reply_b.peer_labels(SlotId::SECOND).unwrap(),
        &["Attack Left".to_string(), "Idle".to_string()]
    );

    // A second round goes through the same way.
    b.send_moves(&["Counter Right"]);
    a.send_moves(&["Attack Right"]);
    assert_eq!(
        a.recv().peer_labels(SlotId::FIRST).unwrap(),
        &["Counter Right".to_string()]
    );
    let _ = b.recv();

    a.send(&ClientMessage::End);
    assert_eq!(b.recv(), ServerMessage::GameEnded);
    b.expect_closed();

    let summary = handle.join().unwrap();
    assert_eq!(summary.exchanges, 2);
    assert_eq!(summary.participants, 2);
    assert_eq!(summary.reason, EndReason::Requested(SlotId::FIRST));
}

#[test]
fn disconnect_ends_match_for_the_other_side() {
    let (handle, addr) = relay(None);
    let (a, mut b) = pair(addr);
    assert_eq!(b.expect_start(), None);

    drop(a);
    assert_eq!(b.recv(), ServerMessage::GameEnded);
    b.expect_closed();

    let summary = handle.join().unwrap();
    assert_eq!(summary.reason, EndReason::Disconnected(SlotId::FIRST));
    assert_eq!(summary.exchanges, 0);
}

#[test]
fn third_connection_is_not_served() {
    let (handle, addr) = relay(None);
    let (mut a, mut b) = pair(addr);
    a.expect_start();
    b.expect_start();

    // The listener is gone once two participants are in, so a third either
    // fails to connect or is never assigned a slot.
    if let Ok(stream) = TcpStream::connect(addr) {
        stream
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();
        let mut reader = BufReader::new(stream);
        assert!(read_json::<_, ServerMessage>(&mut reader).is_err());
    }

    handle.stop().unwrap();
    assert_eq!(a.recv(), ServerMessage::GameEnded);
    assert_eq!(b.recv(), ServerMessage::GameEnded);
}

#[test]
fn stop_before_anyone_joins() {
    let (handle, _addr) = relay(None);
    let summary = handle.stop().unwrap();
    assert_eq!(summary.reason, EndReason::Stopped);
    assert_eq!(summary.participants, 0);
}

#[test]
fn client_link_sees_match_ended_when_peer_leaves() {
    let (handle, addr) = relay(None);
    let config = LinkConfig {
        handshake_timeout_ms: Some(5_000),
        exchange_timeout_ms: Some(5_000),
        ..LinkConfig::default()
    };

    let mut link = ClientLink::connect(&addr.to_string(), &config).unwrap();
    let mut raw = RawClient::connect(addr);
    assert_eq!(link.slot(), SlotId::FIRST);
    assert_eq!(raw.slot, SlotId::SECOND);

    let info = link.wait_for_start().unwrap();
    assert_eq!(info.slot, SlotId::FIRST);
    raw.expect_start();

    raw.send_moves(&["Attack Left", "Idle"]);
    let peer = link.exchange_moves(&[Move::DefendLeft]).unwrap();
    assert_eq!(peer, vec![Move::AttackLeft, Move::Idle]);
    assert_eq!(
        raw.recv().peer_labels(SlotId::SECOND).unwrap(),
        &["Defend Left".to_string()]
    );

    // The peer leaves instead of sending its next list.
    raw.send(&ClientMessage::End);
    assert_eq!(
        link.exchange_moves(&[Move::AttackRight]),
        Err(LinkError::MatchEnded)
    );

    handle.join().unwrap();
}
