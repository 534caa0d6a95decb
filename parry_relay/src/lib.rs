// parry_relay: the move relay and the participant-side link to it.
//
// The relay is a thin broker for exactly one two-participant match. It
// accepts two TCP connections, tells each its slot, announces the start, and
// then echoes each round's pair of move lists back to both sides. It never
// parses moves or runs the game; resolution happens on the clients.
//
// Module overview:
// - `session.rs`:  Relay-side match state: slot writers, the two-slot move
//                  buffer, per-slot backlog, termination. Driven by `server.rs`.
// - `server.rs`:   TCP listener, reader threads (one per participant), and the
//                  control loop. `std::net` with thread-per-reader and an
//                  `mpsc` channel funnelling events into the single-threaded
//                  `Session`.
// - `client.rs`:   `ClientLink`, the blocking participant connection:
//                  connect, wait for start, one exchange per round, end.
// - `link.rs`:     `LinkWorker`, which runs a `ClientLink` on its own thread
//                  and implements `parry_combat::MatchLink` with non-blocking
//                  polls. Also the embedded "host" mode.
//
// Dependencies: `parry_protocol` (messages and framing) and `parry_combat`
// (for `Move` labels and the `MatchLink` seam).
//
// The relay runs as a standalone binary (`main.rs`) or embedded in a game
// process via `start_relay` / `LinkWorker::host`.

pub mod client;
pub mod link;
pub mod server;
pub mod session;

pub use client::{ClientLink, LinkConfig};
pub use link::LinkWorker;
pub use server::{EndReason, RelayConfig, RelayError, RelayHandle, RelaySummary, start_relay};
