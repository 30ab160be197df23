//! Binary wire protocol
//!
//! Frames are length-prefixed and type-tagged; payloads are hand-encoded
//! big-endian. The format predates this client and is fixed by the server.

mod buffer;
mod frame;
mod messages;

use std::io;

use thiserror::Error;

pub use self::buffer::{WireReader, WireWriter};
pub use self::frame::{read_frame, write_frame};
pub use self::messages::{codes, Message};

/// Errors on the wire path.
///
/// All variants are terminal for the connection loop: the stream offers no
/// way to resynchronize after a short read or a corrupt frame, so no
/// partial-message recovery is attempted.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Socket-level failure.
    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),

    /// The stream closed, possibly mid-message.
    #[error("end of stream")]
    EndOfStream,

    /// A structurally invalid frame or payload.
    #[error("malformed message: {0}")]
    Malformed(String),
}

impl ProtocolError {
    /// Shorthand for a malformed-payload error with context.
    pub(crate) fn malformed(context: impl Into<String>) -> Self {
        Self::Malformed(context.into())
    }
}
