// Non-blocking bridge between a `MatchSession` and a blocking `ClientLink`.
//
// `LinkWorker` spawns one worker thread that exclusively owns the
// `ClientLink`. The worker connects, waits for the match to start, then
// serves one exchange per `Command::Exchange`, reporting each outcome on an
// `mpsc` channel. The session side implements `MatchLink` by draining that
// channel with `try_recv`, so `MatchSession::update` never blocks on the
// network.
//
// Cancellation is by closing the socket. Right after connecting, the worker
// hands back a clone of its stream (`Event::Connected`); `close` sends `End`
// through the worker and shuts that clone down, which unblocks any read the
// worker is stuck in. The relay sees EOF either way.
//
// `LinkWorker::host` embeds a relay in the same process before joining it,
// for the "one player hosts, the other joins" setup. The embedded relay is
// stopped when the worker is closed.
//
// See also: `parry_combat::session` for the polling side.

use std::net::{IpAddr, Ipv4Addr, Shutdown, SocketAddr, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use parry_combat::{MatchLink, Move, StartInfo};
use parry_protocol::LinkError;
use tracing::{debug, warn};

use crate::client::{ClientLink, LinkConfig};
use crate::server::{RelayConfig, RelayError, RelayHandle, start_relay};

enum Command {
    Exchange(Vec<Move>),
    End,
}

enum Event {
    Connected(TcpStream),
    Started(Result<StartInfo, LinkError>),
    PeerMoves(Result<Vec<Move>, LinkError>),
}

pub struct LinkWorker {
    commands: Sender<Command>,
    events: Receiver<Event>,
    socket: Option<TcpStream>,
    relay: Option<RelayHandle>,
    _thread: Option<JoinHandle<()>>,
    closed: bool,
}

impl LinkWorker {
    /// Start connecting to the relay at `addr` on a worker thread.
    pub fn spawn(addr: impl Into<String>, config: LinkConfig) -> Self {
        let addr = addr.into();
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("parry-link".into())
            .spawn(move || worker_loop(&addr, &config, command_rx, event_tx));
        let worker = match spawned {
            Ok(t) => Some(t),
            Err(err) => {
                warn!(%err, "failed to spawn link worker");
                None
            }
        };
        Self {
            commands: command_tx,
            events: event_rx,
            socket: None,
            relay: None,
            _thread: worker,
            closed: false,
        }
    }

    /// Start an embedded relay and join it as the first participant.
    /// Returns the worker and the relay's address for the opponent.
    pub fn host(
        relay_config: RelayConfig,
        link_config: LinkConfig,
    ) -> Result<(Self, SocketAddr), RelayError> {
        let (relay, addr) = start_relay(relay_config)?;
        let mut target = addr;
        if target.ip().is_unspecified() {
            target.set_ip(IpAddr::V4(Ipv4Addr::LOCALHOST));
        }
        let mut worker = Self::spawn(target.to_string(), link_config);
        worker.relay = Some(relay);
        Ok((worker, addr))
    }

    /// True if this worker started the relay it is connected to.
    pub fn is_host(&self) -> bool {
        self.relay.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Next event the worker has reported, remembering the socket handle
    /// along the way. `Err(())` once the worker is gone.
    fn next_event(&mut self) -> Result<Option<Event>, ()> {
        loop {
            match self.events.try_recv() {
                Ok(Event::Connected(socket)) => self.socket = Some(socket),
                Ok(event) => return Ok(Some(event)),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Disconnected) => return Err(()),
            }
        }
    }
}

impl MatchLink for LinkWorker {
    fn poll_start(&mut self) -> Option<Result<StartInfo, LinkError>> {
        match self.next_event() {
            Ok(Some(Event::Started(result))) => Some(result),
            Ok(Some(_)) => Some(Err(LinkError::protocol("exchange before match start"))),
            Ok(None) => None,
            Err(()) => Some(Err(LinkError::protocol("link worker stopped"))),
        }
    }

    fn submit_moves(&mut self, moves: &[Move]) {
        // A dead worker shows up on the next poll.
        let _ = self.commands.send(Command::Exchange(moves.to_vec()));
    }

    fn poll_peer_moves(&mut self) -> Option<Result<Vec<Move>, LinkError>> {
        match self.next_event() {
            Ok(Some(Event::PeerMoves(result))) => Some(result),
            Ok(Some(_)) => Some(Err(LinkError::protocol("unexpected link event"))),
            Ok(None) => None,
            Err(()) => Some(Err(LinkError::MatchEnded)),
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let _ = self.commands.send(Command::End);
        let _ = self.next_event();
        if let Some(socket) = self.socket.take() {
            let _ = socket.shutdown(Shutdown::Both);
        }
        if let Some(relay) = &self.relay {
            relay.request_stop();
        }
        debug!("link closed");
    }
}

impl Drop for LinkWorker {
    fn drop(&mut self) {
        // The worker exits once its socket is shut down; it is not joined.
        self.close();
    }
}

fn worker_loop(
    addr: &str,
    config: &LinkConfig,
    commands: Receiver<Command>,
    events: Sender<Event>,
) {
    let mut link = match ClientLink::connect(addr, config) {
        Ok(link) => link,
        Err(err) => {
            let _ = events.send(Event::Started(Err(err)));
            return;
        }
    };
    if let Ok(socket) = link.shutdown_handle() {
        let _ = events.send(Event::Connected(socket));
    }
    // Closed while connecting.
    if let Ok(Command::End) | Err(TryRecvError::Disconnected) = commands.try_recv() {
        link.end();
        return;
    }

    let started = link.wait_for_start();
    let failed = started.is_err();
    if events.send(Event::Started(started)).is_err() || failed {
        link.end();
        return;
    }

    for command in commands.iter() {
        match command {
            Command::Exchange(moves) => {
                let result = link.exchange_moves(&moves);
                let failed = result.is_err();
                if events.send(Event::PeerMoves(result)).is_err() || failed {
                    break;
                }
            }
            Command::End => break,
        }
    }
    link.end();
}
