// Protocol messages for client-relay communication.
//
// Two enums define the whole vocabulary:
// - `ClientMessage`: sent by a participant to the relay.
// - `ServerMessage`: sent by the relay to a participant.
//
// Move lists travel as their display labels (`"Attack Left"`, ...). The relay
// never parses them; it only buffers one list per slot and echoes both back in
// an `Exchange`. Parsing labels into moves is the client's job, which keeps
// this crate independent of the combat crate.
//
// Lifecycle of a connection:
//   relay -> Assigned { slot }           on accept
//   relay -> GameStarted { hint }        once both slots are filled
//   client -> Moves { labels }           once per round
//   relay -> Exchange { slots }          once both slots have submitted
//   client -> End / relay -> GameEnded   termination (EOF is equivalent)

use serde::{Deserialize, Serialize};

use crate::types::{SLOT_COUNT, SlotId};

/// Messages sent by a participant to the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// This round's move list, as labels.
    Moves { labels: Vec<String> },
    /// Participant is leaving; ends the match for both sides.
    End,
}

/// Messages sent by the relay to a participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Identity assignment, sent immediately on accept.
    Assigned { slot: SlotId },
    /// Both participants are present.
    GameStarted { move_count_hint: Option<u32> },
    /// Both slots' move lists for one round, indexed by slot.
    Exchange { slots: [Vec<String>; SLOT_COUNT] },
    /// The match is over; the relay closes the connection after this.
    GameEnded,
}

impl ServerMessage {
    /// Pull the opponent's labels out of an exchange.
    pub fn peer_labels(&self, me: SlotId) -> Option<&[String]> {
        match self {
            ServerMessage::Exchange { slots } => Some(&slots[me.peer().index()]),
            _ => None,
        }
    }
}
