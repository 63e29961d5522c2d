//! Buffered byte queues between the game core and a socket.
//!
//! The core never touches sockets. It appends outgoing frames to
//! `send_buffer` and decodes frames from the front of `recv_buffer`; the
//! runtime moves bytes between these buffers and the transport.

use crate::error::ProtocolError;
use crate::framing::{write_message, MessageType};

#[derive(Debug, Default, Clone)]
pub struct Connection {
    pub send_buffer: Vec<u8>,
    pub recv_buffer: Vec<u8>,
}

impl Connection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one framed message for sending.
    pub fn send_message(&mut self, kind: MessageType, payload: &[u8]) -> Result<(), ProtocolError> {
        write_message(&mut self.send_buffer, kind, payload)
    }

    /// Appends bytes read from the transport.
    pub fn append_received(&mut self, bytes: &[u8]) {
        self.recv_buffer.extend_from_slice(bytes);
    }

    /// Drains everything queued for sending.
    pub fn take_outgoing(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.send_buffer)
    }

    pub fn has_outgoing(&self) -> bool {
        !self.send_buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_and_take() {
        let mut connection = Connection::new();
        connection
            .send_message(MessageType::StateV1, &[1, 2])
            .unwrap();
        assert!(connection.has_outgoing());

        let bytes = connection.take_outgoing();
        assert_eq!(bytes, vec![b's', 2, 0, 0, 1, 2]);
        assert!(!connection.has_outgoing());
    }

    #[test]
    fn test_append_received() {
        let mut connection = Connection::new();
        connection.append_received(&[1, 2]);
        connection.append_received(&[3]);
        assert_eq!(connection.recv_buffer, vec![1, 2, 3]);
    }
}
