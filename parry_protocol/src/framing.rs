// Length-delimited message framing over TCP.
//
// Every message on the wire is a 4-byte big-endian length prefix followed by
// a JSON payload. The prefix is what lets the relay tell an empty message
// apart from a closed socket: a zero-length frame is still a frame, and a
// clean EOF before the prefix is the only disconnect signal.
//
// `write_message` / `read_message` work on raw bytes. `write_json` /
// `read_json` layer serde_json on top for the `message.rs` enums, mapping
// decode failures to `io::ErrorKind::InvalidData` so callers deal with a
// single error type.
//
// A `MAX_MESSAGE_SIZE` constant (64 KiB) bounds the allocation a malformed
// length prefix can trigger. The largest legitimate message is an exchange
// carrying two move lists, which is a few hundred bytes.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Maximum allowed message size (64 KiB).
pub const MAX_MESSAGE_SIZE: u32 = 64 * 1024;

/// Write a length-delimited message: 4-byte big-endian length, then payload.
pub fn write_message<W: Write>(writer: &mut W, msg: &[u8]) -> io::Result<()> {
    let len = msg.len();
    if len > MAX_MESSAGE_SIZE as usize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    #[expect(clippy::cast_possible_truncation)]
    let len_bytes = (len as u32).to_be_bytes();
    writer.write_all(&len_bytes)?;
    writer.write_all(msg)?;
    writer.flush()?;
    Ok(())
}

/// Read a length-delimited message: 4-byte big-endian length, then payload.
///
/// Returns `UnexpectedEof` if the stream closes before or during a message.
/// Returns `InvalidData` if the length exceeds `MAX_MESSAGE_SIZE`.
pub fn read_message<R: Read>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_MESSAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("message too large: {len} bytes (max {MAX_MESSAGE_SIZE})"),
        ));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` to JSON and write it as one frame.
pub fn write_json<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> io::Result<()> {
    let json = serde_json::to_vec(msg).map_err(io::Error::other)?;
    write_message(writer, &json)
}

/// Read one frame and deserialize it from JSON.
pub fn read_json<R: Read, T: DeserializeOwned>(reader: &mut R) -> io::Result<T> {
    let bytes = read_message(reader)?;
    serde_json::from_slice(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// True for the error kinds that mean "the peer went away" rather than
/// "the peer sent garbage".
pub fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
