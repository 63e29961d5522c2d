//! Length-prefixed message framing.
//!
//! Every message on the wire is `[type: u8][size: u24 little-endian][payload]`.
//! Decoders peek at the front of a receive buffer and only consume a message
//! once all of it has arrived.

use crate::error::ProtocolError;
use crate::math::{Color, Vec2};
use std::fmt;
use std::str::FromStr;

/// Bytes in a message header (type + 24-bit size).
pub const HEADER_LEN: usize = 4;

/// Largest payload the 24-bit size field can describe.
pub const MAX_PAYLOAD_LEN: usize = 0x00FF_FFFF;

/// Message type byte leading every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    ControlsV1 = 0x01,
    ControlsV2 = 0x02,
    StateV1 = b's',
    StateV2 = b'S',
}

impl MessageType {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(MessageType::ControlsV1),
            0x02 => Some(MessageType::ControlsV2),
            b's' => Some(MessageType::StateV1),
            b'S' => Some(MessageType::StateV2),
            _ => None,
        }
    }

    /// Payload size of fixed-shape messages; `None` for variable-shape ones.
    pub fn fixed_payload_len(self) -> Option<usize> {
        match self {
            MessageType::ControlsV1 => Some(5),
            MessageType::ControlsV2 => Some(6),
            MessageType::StateV1 | MessageType::StateV2 => None,
        }
    }
}

/// Wire protocol generation spoken by a session.
///
/// V1 carries movement only. V2 adds the shoot button, per-player
/// movement axis, gravity and HP, and the bullet list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProtocolVersion {
    V1,
    #[default]
    V2,
}

impl ProtocolVersion {
    pub fn controls_message(self) -> MessageType {
        match self {
            ProtocolVersion::V1 => MessageType::ControlsV1,
            ProtocolVersion::V2 => MessageType::ControlsV2,
        }
    }

    pub fn state_message(self) -> MessageType {
        match self {
            ProtocolVersion::V1 => MessageType::StateV1,
            ProtocolVersion::V2 => MessageType::StateV2,
        }
    }

    /// Number of buttons carried in a controls message.
    pub fn button_count(self) -> usize {
        match self {
            ProtocolVersion::V1 => 5,
            ProtocolVersion::V2 => 6,
        }
    }

    /// Whether snapshots carry axis/gravity/HP fields and bullets.
    pub fn has_combat(self) -> bool {
        self == ProtocolVersion::V2
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V1 => write!(f, "v1"),
            ProtocolVersion::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "1" | "v1" => Ok(ProtocolVersion::V1),
            "2" | "v2" => Ok(ProtocolVersion::V2),
            other => Err(format!("unknown protocol version '{}'", other)),
        }
    }
}

/// Appends a complete frame for an already-encoded payload.
///
/// The size is known up front because the payload is finished before the
/// header is written.
pub fn write_message(
    out: &mut Vec<u8>,
    kind: MessageType,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge(payload.len()));
    }
    let size = payload.len() as u32;
    out.reserve(HEADER_LEN + payload.len());
    out.push(kind as u8);
    out.extend_from_slice(&size.to_le_bytes()[..3]);
    out.extend_from_slice(payload);
    Ok(())
}

/// Takes one message of type `kind` off the front of `buffer`.
///
/// Returns `Ok(None)` without touching the buffer when the header is
/// incomplete, the leading message is of another type, or the payload has
/// not fully arrived. A fixed-shape message whose header declares the wrong
/// size is rejected as soon as the header is visible.
pub fn try_read_message(
    buffer: &mut Vec<u8>,
    kind: MessageType,
) -> Result<Option<Vec<u8>>, ProtocolError> {
    if buffer.len() < HEADER_LEN {
        return Ok(None);
    }
    if buffer[0] != kind as u8 {
        return Ok(None);
    }

    let size = u32::from_le_bytes([buffer[1], buffer[2], buffer[3], 0]) as usize;
    if let Some(expected) = kind.fixed_payload_len() {
        if size != expected {
            return Err(ProtocolError::UnexpectedSize {
                kind,
                expected,
                actual: size,
            });
        }
    }

    if buffer.len() < HEADER_LEN + size {
        return Ok(None);
    }

    let payload = buffer[HEADER_LEN..HEADER_LEN + size].to_vec();
    buffer.drain(..HEADER_LEN + size);
    Ok(Some(payload))
}

/// Fails if the buffer starts with a message none of `accepted` can decode.
///
/// Callers poll each decoder they know first; anything left at the front
/// afterwards would otherwise stall the stream forever.
pub fn expect_known_message(buffer: &[u8], accepted: &[MessageType]) -> Result<(), ProtocolError> {
    match buffer.first() {
        Some(&byte) if !accepted.iter().any(|kind| *kind as u8 == byte) => {
            Err(ProtocolError::UnexpectedMessageType(byte))
        }
        _ => Ok(()),
    }
}

/// Little-endian field writer for message payloads.
#[derive(Debug, Default)]
pub struct PayloadWriter {
    bytes: Vec<u8>,
}

impl PayloadWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_i32(&mut self, value: i32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_f32(&mut self, value: f32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_vec2(&mut self, value: Vec2) {
        self.put_f32(value.x);
        self.put_f32(value.y);
    }

    pub fn put_color(&mut self, value: Color) {
        self.put_f32(value.r);
        self.put_f32(value.g);
        self.put_f32(value.b);
    }

    pub fn put_bytes(&mut self, value: &[u8]) {
        self.bytes.extend_from_slice(value);
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.bytes
    }
}

/// Strict cursor over a received payload.
///
/// Every read past the end is a `Truncated` error and `finish` rejects
/// leftover bytes, so a payload must match its declared shape exactly.
#[derive(Debug)]
pub struct PayloadReader<'a> {
    kind: MessageType,
    bytes: &'a [u8],
    at: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(kind: MessageType, bytes: &'a [u8]) -> Self {
        Self { kind, bytes, at: 0 }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        if self.bytes.len() - self.at < len {
            return Err(ProtocolError::Truncated { kind: self.kind });
        }
        let slice = &self.bytes[self.at..self.at + len];
        self.at += len;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, ProtocolError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, ProtocolError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_vec2(&mut self) -> Result<Vec2, ProtocolError> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_color(&mut self) -> Result<Color, ProtocolError> {
        Ok(Color::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.at
    }

    /// Ends the read, failing if any bytes were not consumed.
    pub fn finish(self) -> Result<(), ProtocolError> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(ProtocolError::TrailingBytes {
                kind: self.kind,
                remaining,
            }),
        }
    }
}
