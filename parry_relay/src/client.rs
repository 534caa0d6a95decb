// Blocking client for one participant's connection to the relay.
//
// `ClientLink` owns exactly one socket. Every call blocks the calling
// thread: `connect` until the relay assigns a slot, `wait_for_start` until
// the opponent arrives, `exchange_moves` until the relay sends the round's
// combined lists. It is meant to live on a worker thread (see `link.rs`); a
// frame-driven loop should never call it directly.
//
// Errors map onto `LinkError`:
// - anything failing inside `connect` is `Connection`;
// - a wrong-shaped or unparseable message is `Protocol`, and so is the relay
//   going away before the match starts;
// - `GameEnded`, EOF or a read timeout where an exchange reply was expected
//   is `MatchEnded`. The link is closed afterwards and every later exchange
//   fails the same way.
//
// An empty move list is sent as `["Idle", "Idle"]` so that every round's
// submission carries at least one label.

use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use parry_combat::{Move, StartInfo};
use parry_protocol::framing::{is_disconnect, read_json, write_json};
use parry_protocol::{ClientMessage, LinkError, ServerMessage, SlotId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Timeouts for a `ClientLink`. `None` waits forever.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub connect_timeout_ms: u64,
    /// Waiting for an opponent can legitimately take a long time.
    pub handshake_timeout_ms: Option<u64>,
    pub exchange_timeout_ms: Option<u64>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            handshake_timeout_ms: None,
            exchange_timeout_ms: Some(120_000),
        }
    }
}

impl LinkConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout_ms.map(Duration::from_millis)
    }

    pub fn exchange_timeout(&self) -> Option<Duration> {
        self.exchange_timeout_ms.map(Duration::from_millis)
    }
}

pub struct ClientLink {
    addr: String,
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    slot: SlotId,
    config: LinkConfig,
    closed: bool,
}

impl ClientLink {
    /// Connect to the relay at `addr` and read the assigned slot.
    pub fn connect(addr: &str, config: &LinkConfig) -> Result<Self, LinkError> {
        let stream = open_stream(addr, config.connect_timeout())?;
        let conn_err = |e: io::Error| LinkError::connection(addr, e);

        stream
            .set_read_timeout(config.handshake_timeout())
            .map_err(conn_err)?;
        stream.set_nodelay(true).ok();
        let reader_stream = stream.try_clone().map_err(conn_err)?;
        let mut reader = BufReader::new(reader_stream);
        let writer = BufWriter::new(stream);

        let slot = match read_json::<_, ServerMessage>(&mut reader) {
            Ok(ServerMessage::Assigned { slot }) => slot,
            Ok(other) => {
                return Err(LinkError::protocol(format!(
                    "expected slot assignment, got {other:?}"
                )));
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(LinkError::protocol(format!("bad slot assignment: {e}")));
            }
            Err(e) => return Err(conn_err(e)),
        };
        info!(addr, %slot, "connected to relay");

        Ok(Self {
            addr: addr.to_owned(),
            reader,
            writer,
            slot,
            config: config.clone(),
            closed: false,
        })
    }

    /// Block until both participants are present.
    pub fn wait_for_start(&mut self) -> Result<StartInfo, LinkError> {
        if self.closed {
            return Err(LinkError::protocol("link closed before the match started"));
        }
        self.set_read_timeout(self.config.handshake_timeout());
        match read_json::<_, ServerMessage>(&mut self.reader) {
            Ok(ServerMessage::GameStarted { move_count_hint }) => {
                info!(slot = %self.slot, hint = ?move_count_hint, "match started");
                Ok(StartInfo {
                    slot: self.slot,
                    move_count_hint,
                })
            }
            Ok(other) => {
                self.close();
                Err(LinkError::protocol(format!(
                    "expected match start, got {other:?}"
                )))
            }
            Err(e) => {
                self.close();
                Err(LinkError::protocol(format!(
                    "relay closed before the match started: {e}"
                )))
            }
        }
    }

    /// Send this round's moves and block for the opponent's.
    pub fn exchange_moves(&mut self, moves: &[Move]) -> Result<Vec<Move>, LinkError> {
        if self.closed {
            return Err(LinkError::MatchEnded);
        }
        let labels = if moves.is_empty() {
            Move::labels(&Move::NOTHING_SELECTED)
        } else {
            Move::labels(moves)
        };
        debug!(slot = %self.slot, ?labels, "sending moves");
        if let Err(e) = write_json(&mut self.writer, &ClientMessage::Moves { labels }) {
            debug!(%e, "send failed");
            self.close();
            return Err(LinkError::MatchEnded);
        }

        self.set_read_timeout(self.config.exchange_timeout());
        let reply = match read_json::<_, ServerMessage>(&mut self.reader) {
            Ok(reply) => reply,
            Err(e) if is_disconnect(&e) => {
                debug!(%e, "relay gone while waiting for exchange");
                self.close();
                return Err(LinkError::MatchEnded);
            }
            Err(e) => {
                self.close();
                return Err(LinkError::protocol(format!("bad exchange reply: {e}")));
            }
        };

        match reply {
            ServerMessage::Exchange { .. } => {
                let peer = reply.peer_labels(self.slot).unwrap_or_default();
                Move::parse_labels(peer).map_err(|e| {
                    self.close();
                    LinkError::protocol(e.to_string())
                })
            }
            ServerMessage::GameEnded => {
                info!(slot = %self.slot, "relay ended the match");
                self.close();
                Err(LinkError::MatchEnded)
            }
            other => {
                self.close();
                Err(LinkError::protocol(format!(
                    "expected exchange, got {other:?}"
                )))
            }
        }
    }

    /// Tell the relay this participant is leaving, then close the socket.
    pub fn end(&mut self) {
        if self.closed {
            return;
        }
        let _ = write_json(&mut self.writer, &ClientMessage::End);
        self.close();
    }

    /// A second handle to the socket, for shutting it down from another
    /// thread while a call is blocked on it.
    pub fn shutdown_handle(&self) -> io::Result<TcpStream> {
        self.writer.get_ref().try_clone()
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) {
        self.reader.get_ref().set_read_timeout(timeout).ok();
    }

    fn close(&mut self) {
        self.closed = true;
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}

/// Resolve `addr` and connect to the first address that answers.
fn open_stream(addr: &str, timeout: Duration) -> Result<TcpStream, LinkError> {
    let candidates: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|e| LinkError::connection(addr, e))?
        .collect();
    let mut last_err = None;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last_err = Some(e),
        }
    }
    Err(match last_err {
        Some(e) => LinkError::connection(addr, e),
        None => LinkError::connection(addr, "address resolved to nothing"),
    })
}
