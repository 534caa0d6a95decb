// TCP server and control loop for the move relay.
//
// Architecture: thread-per-reader with a central `mpsc` channel.
//
// - **Listener thread** (`TcpListener::accept()` loop): accepts connections
//   and sends `InternalEvent::NewConnection` to the control loop. It stops
//   after the second connection and drops the listener, so the relay never
//   takes a third participant and never re-listens.
// - **Reader threads** (one per participant): decode `ClientMessage` frames
//   in a loop and forward them as `InternalEvent::MovesFrom`. `End`, EOF, a
//   read error or a malformed frame all become `InternalEvent::Left`.
// - **Control loop**: owns the `Session` (slot buffer, backlog, every write
//   half) and dispatches events. It polls with `recv_timeout` so it notices
//   `RelayHandle::stop` promptly.
//
// The control loop is the only writer to participant sockets and the only
// mutator of the slot buffer. Reader threads only read.
//
// Shutdown: the first participant to leave ends the match. The session sends
// `GameEnded` to whoever is still connected, closes both sockets, and
// `run_relay` returns a `RelaySummary`. `RelayHandle::stop` ends the match
// the same way from outside.

use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use parry_protocol::framing::{is_disconnect, read_json};
use parry_protocol::{ClientMessage, SLOT_COUNT, SlotId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::session::Session;

/// How often the control loop wakes to check for `stop`.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Events sent from listener/reader threads to the control loop.
enum InternalEvent {
    NewConnection { stream: TcpStream, peer: SocketAddr },
    MovesFrom { slot: SlotId, labels: Vec<String> },
    Left { slot: SlotId, reason: EndReason },
}

/// Why the match ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    /// The participant sent `End`.
    Requested(SlotId),
    /// The participant's socket closed or produced garbage.
    Disconnected(SlotId),
    /// `RelayHandle::stop` was called.
    Stopped,
}

/// What the relay did over its lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RelaySummary {
    pub exchanges: u32,
    pub participants: usize,
    pub reason: EndReason,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Configuration for starting a relay server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind_addr: String,
    /// 0 lets the OS pick; the bound address is returned by `start_relay`.
    pub port: u16,
    /// Per-round move count announced in `GameStarted`. `None` leaves the
    /// choice to each client.
    pub move_count_hint: Option<u32>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".into(),
            port: 7878,
            move_count_hint: None,
        }
    }
}

/// Handle returned by `start_relay` to control the running server.
pub struct RelayHandle {
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<RelaySummary>>,
}

impl RelayHandle {
    /// Ask the relay to end the match without waiting for it.
    pub fn request_stop(&self) {
        self.keep_running.store(false, Ordering::SeqCst);
    }

    /// End the match early and wait for the relay to shut down.
    pub fn stop(mut self) -> Option<RelaySummary> {
        self.request_stop();
        self.thread.take().and_then(|t| t.join().ok())
    }

    /// Wait for the match to end on its own.
    pub fn join(mut self) -> Option<RelaySummary> {
        self.thread.take().and_then(|t| t.join().ok())
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|t| t.is_finished())
    }
}

/// Start the relay on a background thread. Returns a handle for stopping
/// or joining it and the actual bound address (useful with port 0).
pub fn start_relay(config: RelayConfig) -> Result<(RelayHandle, SocketAddr), RelayError> {
    let bind = format!("{}:{}", config.bind_addr, config.port);
    let listener = TcpListener::bind(&bind).map_err(|source| RelayError::Bind {
        addr: bind.clone(),
        source,
    })?;
    let addr = listener.local_addr()?;
    listener.set_nonblocking(true)?;
    info!(%addr, hint = ?config.move_count_hint, "relay listening");

    let keep_running = Arc::new(AtomicBool::new(true));
    let keep_running_clone = keep_running.clone();
    let thread = thread::Builder::new()
        .name("relay".into())
        .spawn(move || run_relay(listener, config, keep_running_clone))?;

    Ok((
        RelayHandle {
            keep_running,
            thread: Some(thread),
        },
        addr,
    ))
}

/// Control loop. Runs until the match ends or `keep_running` is cleared.
fn run_relay(
    listener: TcpListener,
    config: RelayConfig,
    keep_running: Arc<AtomicBool>,
) -> RelaySummary {
    let mut session = Session::new(config.move_count_hint);
    let (tx, rx): (Sender<InternalEvent>, Receiver<InternalEvent>) = mpsc::channel();

    let keep_running_listener = keep_running.clone();
    let tx_listener = tx.clone();
    thread::spawn(move || accept_loop(listener, tx_listener, keep_running_listener));

    let mut participants = 0;
    let mut reason = EndReason::Stopped;

    while keep_running.load(Ordering::SeqCst) && !session.is_ended() {
        let event = match rx.recv_timeout(POLL_INTERVAL) {
            Ok(event) => event,
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        };
        match event {
            InternalEvent::NewConnection { stream, peer } => {
                let reader = match stream.try_clone() {
                    Ok(s) => BufReader::new(s),
                    Err(err) => {
                        warn!(%peer, %err, "could not clone participant stream");
                        continue;
                    }
                };
                let Some(slot) = session.add_participant(stream) else {
                    continue;
                };
                participants += 1;
                info!(%peer, %slot, "participant connected");
                let tx_reader = tx.clone();
                thread::spawn(move || reader_loop(reader, slot, tx_reader));
                if session.is_full() {
                    session.start();
                }
            }
            InternalEvent::MovesFrom { slot, labels } => {
                debug!(%slot, count = labels.len(), "moves received");
                session.submit(slot, labels);
            }
            InternalEvent::Left { slot, reason: why } => {
                info!(%slot, reason = ?why, "participant left, ending match");
                session.remove_participant(slot);
                reason = why;
                session.end();
            }
        }
    }

    session.end();
    keep_running.store(false, Ordering::SeqCst);
    let summary = RelaySummary {
        exchanges: session.exchanges(),
        participants,
        reason,
    };
    info!(?summary, "relay finished");
    summary
}

/// Accept exactly `SLOT_COUNT` connections, then drop the listener.
fn accept_loop(listener: TcpListener, tx: Sender<InternalEvent>, keep_running: Arc<AtomicBool>) {
    let mut accepted = 0;
    while accepted < SLOT_COUNT && keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(err) = stream.set_nonblocking(false) {
                    warn!(%peer, %err, "could not configure participant stream");
                    continue;
                }
                stream.set_nodelay(true).ok();
                accepted += 1;
                if tx.send(InternalEvent::NewConnection { stream, peer }).is_err() {
                    break;
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                thread::sleep(POLL_INTERVAL);
            }
            Err(err) => {
                warn!(%err, "accept failed, no longer listening");
                break;
            }
        }
    }
}

/// Reader loop for a single participant. Runs in its own thread.
fn reader_loop(mut reader: BufReader<TcpStream>, slot: SlotId, tx: Sender<InternalEvent>) {
    loop {
        let reason = match read_json::<_, ClientMessage>(&mut reader) {
            Ok(ClientMessage::Moves { labels }) => {
                if tx.send(InternalEvent::MovesFrom { slot, labels }).is_err() {
                    return;
                }
                continue;
            }
            Ok(ClientMessage::End) => EndReason::Requested(slot),
            Err(err) => {
                if !is_disconnect(&err) {
                    warn!(%slot, %err, "malformed message from participant");
                }
                EndReason::Disconnected(slot)
            }
        };
        let _ = tx.send(InternalEvent::Left { slot, reason });
        return;
    }
}
