// Match state for the relay.
//
// `Session` is the data structure `server.rs` drives. It holds the two
// participants' write halves, the two-slot move buffer, and a per-slot
// backlog for lists that arrive before the previous exchange went out. All
// mutation happens from the server's single control loop, so there is no
// internal locking.
//
// Responsibilities:
// - Slot assignment: the first connection gets slot 0, the second slot 1,
//   and each is told its slot immediately. A third is refused.
// - Start: once both slots are filled, `start` broadcasts `GameStarted`.
// - Relaying: each slot's move list is buffered untouched. When both slots
//   hold a list, one `Exchange` carrying both goes to both participants and
//   the buffer empties. A slot that submits twice before that broadcast has
//   its extra list queued and promoted afterwards, in order.
// - Termination: `end` sends `GameEnded` to every connection still open,
//   shuts the sockets down and marks the match over. A relay serves exactly
//   one match.
//
// Write failures on one participant are logged and otherwise ignored here;
// that participant's reader thread sees the broken socket and reports a
// disconnect, which ends the match through the normal path.

use std::collections::VecDeque;
use std::io::BufWriter;
use std::net::{Shutdown, TcpStream};

use parry_protocol::framing::write_json;
use parry_protocol::{SLOT_COUNT, ServerMessage, SlotId};
use tracing::{debug, info, warn};

/// Relay-side state for the single match this process serves.
pub struct Session {
    writers: [Option<BufWriter<TcpStream>>; SLOT_COUNT],
    buffer: [Option<Vec<String>>; SLOT_COUNT],
    backlog: [VecDeque<Vec<String>>; SLOT_COUNT],
    move_count_hint: Option<u32>,
    started: bool,
    ended: bool,
    exchanges: u32,
}

impl Session {
    pub fn new(move_count_hint: Option<u32>) -> Self {
        Self {
            writers: [None, None],
            buffer: [None, None],
            backlog: [VecDeque::new(), VecDeque::new()],
            move_count_hint,
            started: false,
            ended: false,
            exchanges: 0,
        }
    }

    /// Give `stream` the lowest free slot and send it `Assigned`. Returns
    /// `None` when both slots are taken or the match is already over; the
    /// stream is dropped in that case.
    pub fn add_participant(&mut self, stream: TcpStream) -> Option<SlotId> {
        if self.ended {
            return None;
        }
        let index = self.writers.iter().position(Option::is_none)?;
        let slot = SlotId::from_index(index)?;
        self.writers[index] = Some(BufWriter::new(stream));
        info!(%slot, "participant assigned");
        self.send_to(slot, &ServerMessage::Assigned { slot });
        Some(slot)
    }

    pub fn participant_count(&self) -> usize {
        self.writers.iter().filter(|w| w.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.participant_count() == SLOT_COUNT
    }

    /// Broadcast `GameStarted`. Anything buffered before the start is
    /// relayed right after.
    pub fn start(&mut self) {
        if self.started || self.ended {
            return;
        }
        self.started = true;
        info!(hint = ?self.move_count_hint, "both participants present, match started");
        self.broadcast(&ServerMessage::GameStarted {
            move_count_hint: self.move_count_hint,
        });
        self.flush_exchanges();
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Buffer one move list from `slot` and relay whatever is now complete.
    pub fn submit(&mut self, slot: SlotId, labels: Vec<String>) {
        if self.ended {
            return;
        }
        let i = slot.index();
        if self.buffer[i].is_some() {
            debug!(%slot, queued = self.backlog[i].len() + 1, "list queued behind pending exchange");
            self.backlog[i].push_back(labels);
        } else {
            self.buffer[i] = Some(labels);
        }
        self.flush_exchanges();
    }

    /// Lists waiting in `slot`'s buffer and backlog.
    pub fn pending_for(&self, slot: SlotId) -> usize {
        let i = slot.index();
        usize::from(self.buffer[i].is_some()) + self.backlog[i].len()
    }

    /// Exchanges broadcast so far.
    pub fn exchanges(&self) -> u32 {
        self.exchanges
    }

    /// Forget a participant whose connection is already gone, so `end`
    /// doesn't write to it.
    pub fn remove_participant(&mut self, slot: SlotId) {
        if let Some(writer) = self.writers[slot.index()].take() {
            let _ = writer.get_ref().shutdown(Shutdown::Both);
        }
    }

    /// Tell every remaining participant the match is over and close them.
    pub fn end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;
        info!(exchanges = self.exchanges, "match over");
        self.broadcast(&ServerMessage::GameEnded);
        for writer in self.writers.iter_mut() {
            if let Some(w) = writer.take() {
                let _ = w.get_ref().shutdown(Shutdown::Both);
            }
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    fn flush_exchanges(&mut self) {
        while self.started && !self.ended && self.buffer.iter().all(Option::is_some) {
            let [Some(first), Some(second)] = std::mem::take(&mut self.buffer) else {
                break;
            };
            self.exchanges += 1;
            debug!(exchange = self.exchanges, ?first, ?second, "relaying");
            self.broadcast(&ServerMessage::Exchange {
                slots: [first, second],
            });
            for i in 0..SLOT_COUNT {
                self.buffer[i] = self.backlog[i].pop_front();
            }
        }
    }

    fn send_to(&mut self, slot: SlotId, msg: &ServerMessage) {
        if let Some(writer) = self.writers[slot.index()].as_mut() {
            send_message(writer, slot, msg);
        }
    }

    fn broadcast(&mut self, msg: &ServerMessage) {
        for (i, writer) in self.writers.iter_mut().enumerate() {
            if let (Some(w), Some(slot)) = (writer.as_mut(), SlotId::from_index(i)) {
                send_message(w, slot, msg);
            }
        }
    }
}

fn send_message(writer: &mut BufWriter<TcpStream>, slot: SlotId, msg: &ServerMessage) {
    if let Err(err) = write_json(writer, msg) {
        warn!(%slot, %err, "write to participant failed");
    }
}
