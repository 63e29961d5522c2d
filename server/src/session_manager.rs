//! Connected sessions and their byte queues
//!
//! Every TCP connection owns one player in the game and one [`Connection`]
//! whose buffers the game loop decodes from and encodes into. The socket
//! tasks never see game state; they only move bytes through channels.

use log::{debug, info, warn};
use shared::{Connection, PlayerId};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Snapshots queued for one socket writer before the session is dropped.
///
/// At 60 ticks per second this is about half a second of backlog.
pub const OUTGOING_QUEUE_LEN: usize = 32;

/// One connected client
#[derive(Debug)]
pub struct Session {
    /// Identifier assigned by the accept task
    pub id: u32,
    /// Remote peer, for logging
    pub addr: SocketAddr,
    /// Player this connection controls
    pub player: PlayerId,
    /// Received bytes waiting to be decoded and encoded bytes waiting to be sent
    pub connection: Connection,
    outgoing: mpsc::Sender<Vec<u8>>,
}

impl Session {
    pub fn new(
        id: u32,
        addr: SocketAddr,
        player: PlayerId,
        outgoing: mpsc::Sender<Vec<u8>>,
    ) -> Self {
        Self {
            id,
            addr,
            player,
            connection: Connection::new(),
            outgoing,
        }
    }

    /// Hands queued bytes to the socket writer.
    ///
    /// Returns false once the writer has gone away, or when its queue is
    /// full because the peer stopped reading. Either way the session should
    /// be dropped.
    pub fn flush(&mut self) -> bool {
        if !self.connection.has_outgoing() {
            return !self.outgoing.is_closed();
        }
        let bytes = self.connection.take_outgoing();
        match self.outgoing.try_send(bytes) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Session {} ({}) is not reading, {} snapshots queued",
                    self.id, self.addr, OUTGOING_QUEUE_LEN
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Writer for session {} is gone", self.id);
                false
            }
        }
    }
}

/// Tracks every live session, ordered by id.
///
/// Sessions are kept in a `BTreeMap` so snapshots go out in connection
/// order on every tick.
pub struct SessionManager {
    sessions: BTreeMap<u32, Session>,
    max_clients: usize,
}

impl SessionManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            max_clients,
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.sessions.len() < self.max_clients
    }

    /// Registers a session.
    ///
    /// Returns false if the server is full or the id is already taken. The
    /// rejected session is dropped, which closes its socket.
    pub fn add_session(&mut self, session: Session) -> bool {
        if !self.has_capacity() {
            return false;
        }
        if self.sessions.contains_key(&session.id) {
            warn!("Session id {} is already in use", session.id);
            return false;
        }
        info!(
            "Session {} connected from {} as {:?}",
            session.id, session.addr, session.player
        );
        self.sessions.insert(session.id, session);
        true
    }

    /// Removes a session. Dropping it closes its outgoing channel, which
    /// makes the writer task shut the socket down.
    pub fn remove_session(&mut self, id: u32) -> Option<Session> {
        let session = self.sessions.remove(&id)?;
        info!("Session {} ({}) disconnected", session.id, session.addr);
        Some(session)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
