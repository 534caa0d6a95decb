// parry_protocol: wire protocol for the Parry move relay.
//
// This crate defines the message types, framing, and error taxonomy shared by
// the relay server (`parry_relay::server`) and the participant-side link
// (`parry_relay::client`). It has no dependency on the combat rules.
//
// Module overview:
// - `types.rs`:    `SlotId` (relay-assigned identity, 0 or 1) and `RoundNumber`.
// - `message.rs`:  `ClientMessage` / `ServerMessage` enums.
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream:
//                  4-byte big-endian length prefix, then JSON payload.
// - `error.rs`:    `LinkError`: Connection / Protocol / MatchEnded.
//
// Design decisions:
// - **Typed records, not delimiters.** Each message is a framed JSON value, so
//   an empty move list can never be mistaken for a disconnect and no move
//   label can collide with a separator.
// - **Labels as opaque strings.** The relay forwards move lists verbatim.
// - **No async runtime.** Framing works on `std::io::Read`/`Write`.

pub mod error;
pub mod framing;
pub mod message;
pub mod types;

pub use error::LinkError;
pub use framing::{MAX_MESSAGE_SIZE, read_json, read_message, write_json, write_message};
pub use message::{ClientMessage, ServerMessage};
pub use types::{RoundNumber, SLOT_COUNT, SlotId};

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn client_roundtrip(msg: &ClientMessage) {
        let mut wire = Vec::new();
        write_json(&mut wire, msg).unwrap();
        let recovered: ClientMessage = read_json(&mut Cursor::new(&wire)).unwrap();
        assert_eq!(&recovered, msg);
    }

    fn server_roundtrip(msg: &ServerMessage) {
        let mut wire = Vec::new();
        write_json(&mut wire, msg).unwrap();
        let recovered: ServerMessage = read_json(&mut Cursor::new(&wire)).unwrap();
        assert_eq!(&recovered, msg);
    }

    #[test]
    fn roundtrip_moves_with_label_containing_separators() {
        // Labels are never split, so odd characters survive untouched.
        client_roundtrip(&ClientMessage::Moves {
            labels: vec!["Attack Left".into(), "a,b£@€c".into()],
        });
    }

    #[test]
    fn roundtrip_end() {
        client_roundtrip(&ClientMessage::End);
    }

    #[test]
    fn roundtrip_assigned_and_start() {
        server_roundtrip(&ServerMessage::Assigned {
            slot: SlotId::SECOND,
        });
        server_roundtrip(&ServerMessage::GameStarted {
            move_count_hint: Some(4),
        });
        server_roundtrip(&ServerMessage::GameStarted {
            move_count_hint: None,
        });
    }

    #[test]
    fn roundtrip_exchange_with_empty_slot() {
        server_roundtrip(&ServerMessage::Exchange {
            slots: [vec!["Defend Left".into()], vec![]],
        });
    }

    #[test]
    fn peer_labels_picks_the_other_slot() {
        let msg = ServerMessage::Exchange {
            slots: [
                vec!["Attack Left".into(), "Idle".into()],
                vec!["Defend Left".into()],
            ],
        };
        assert_eq!(
            msg.peer_labels(SlotId::FIRST).unwrap(),
            &["Defend Left".to_string()]
        );
        assert_eq!(
            msg.peer_labels(SlotId::SECOND).unwrap(),
            &["Attack Left".to_string(), "Idle".to_string()]
        );
        assert!(ServerMessage::GameEnded.peer_labels(SlotId::FIRST).is_none());
    }
}
