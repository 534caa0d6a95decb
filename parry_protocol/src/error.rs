// Failure taxonomy for a participant's link to the relay.
//
// Shared by the blocking client (`parry_relay::client`) and the match session
// (`parry_combat::session`), which reacts differently to each variant:
// - `Connection`: the socket could not be established. The match never starts.
// - `Protocol`: the relay sent something of the wrong shape. Fatal to the match.
// - `MatchEnded`: termination token, EOF or timeout where an exchange reply
//   was expected. A normal (if unhappy) end of the match, never a crash.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("could not connect to {addr}: {reason}")]
    Connection { addr: String, reason: String },
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("match ended")]
    MatchEnded,
}

impl LinkError {
    pub fn connection(addr: impl Into<String>, reason: impl ToString) -> Self {
        LinkError::Connection {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }

    pub fn protocol(reason: impl Into<String>) -> Self {
        LinkError::Protocol(reason.into())
    }
}
