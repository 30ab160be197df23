//! Length-prefixed framing
//!
//! Wire shape: a 4-byte big-endian total length (counting itself and the
//! 4-byte type tag), a 4-byte big-endian message type code, then
//! `length - 8` payload bytes. Reads block until the exact byte count is
//! available; a stream closing mid-message is an `EndOfStream`, terminal
//! for the connection.

use std::io::{ErrorKind, Read, Write};

use tallyarc_domain::constants::{FRAME_HEADER_LEN, MAX_FRAME_LEN};

use super::ProtocolError;

fn read_exact(stream: &mut impl Read, buf: &mut [u8]) -> Result<(), ProtocolError> {
    stream.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            ProtocolError::EndOfStream
        } else {
            ProtocolError::Io(e)
        }
    })
}

/// Read one complete frame, blocking until it is fully available.
pub fn read_frame(stream: &mut impl Read) -> Result<(i32, Vec<u8>), ProtocolError> {
    let mut word = [0u8; 4];
    read_exact(stream, &mut word)?;
    let length = usize::try_from(i32::from_be_bytes(word))
        .map_err(|_| ProtocolError::malformed("negative frame length"))?;
    if !(FRAME_HEADER_LEN..=MAX_FRAME_LEN).contains(&length) {
        return Err(ProtocolError::Malformed(format!("frame length {length} out of range")));
    }

    read_exact(stream, &mut word)?;
    let message_type = i32::from_be_bytes(word);

    let mut payload = vec![0u8; length - FRAME_HEADER_LEN];
    read_exact(stream, &mut payload)?;
    Ok((message_type, payload))
}

/// Write one complete frame as a single contiguous buffer.
///
/// The single `write_all` keeps concurrent senders from interleaving two
/// messages' bytes; callers serialize on a lock around the stream.
pub fn write_frame(
    stream: &mut impl Write,
    message_type: i32,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    let total = payload.len() + FRAME_HEADER_LEN;
    if total > MAX_FRAME_LEN {
        return Err(ProtocolError::Malformed(format!("frame length {total} out of range")));
    }
    let length = i32::try_from(total)
        .map_err(|_| ProtocolError::malformed("frame length overflows the length prefix"))?;

    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(&length.to_be_bytes());
    buf.extend_from_slice(&message_type.to_be_bytes());
    buf.extend_from_slice(payload);
    stream.write_all(&buf)?;
    stream.flush()?;
    Ok(())
}
