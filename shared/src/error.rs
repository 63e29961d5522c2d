//! Error types shared by the server and client.
//!
//! "Not enough bytes yet" is never an error: decoders report it as `Ok(None)`
//! or `Ok(false)`. Everything here is fatal for the connection it came from.

use crate::framing::MessageType;
use thiserror::Error;

/// A malformed or oversized message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A fixed-shape message declared the wrong payload size.
    #[error("{kind:?} message with size {actual} != {expected}")]
    UnexpectedSize {
        kind: MessageType,
        expected: usize,
        actual: usize,
    },

    /// The payload ended before every declared field was read.
    #[error("ran out of bytes reading {kind:?} message")]
    Truncated { kind: MessageType },

    /// Bytes were left over after the last declared field.
    #[error("trailing data in {kind:?} message ({remaining} bytes)")]
    TrailingBytes { kind: MessageType, remaining: usize },

    /// The payload does not fit the 24-bit size field.
    #[error("payload of {0} bytes exceeds the 24-bit size field")]
    PayloadTooLarge(usize),

    /// The leading byte is not a message this side of the protocol accepts.
    #[error("unexpected message type 0x{0:02x}")]
    UnexpectedMessageType(u8),

    /// A movement axis value other than 0 or 1.
    #[error("invalid movement axis {0}")]
    InvalidMovementAxis(u32),
}

/// Reasons a client or server session ends.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("malformed message: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("lost connection to peer")]
    ConnectionLost,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
