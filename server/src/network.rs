//! Server network layer handling TCP sessions and game loop coordination

use crate::session_manager::{Session, SessionManager, OUTGOING_QUEUE_LEN};
use log::{debug, error, info, warn};
use shared::framing::expect_known_message;
use shared::{Connection, Controls, Game, ProtocolError, ProtocolVersion};
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Largest step the simulation is ever advanced by in one tick.
pub const MAX_TICK_DT: f32 = 0.05;

const READ_BUFFER_SIZE: usize = 4096;

/// Runtime settings for [`Server`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Simulation ticks per second
    pub tick_rate: u32,
    pub protocol: ProtocolVersion,
    /// Seed for spawn positions, colors and gravity draws
    pub seed: u64,
    pub max_clients: usize,
}

impl ServerConfig {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            tick_rate: 60,
            protocol: ProtocolVersion::default(),
            seed: 0,
            max_clients: 16,
        }
    }
}

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    ClientConnected {
        session_id: u32,
        addr: SocketAddr,
        outgoing: mpsc::Sender<Vec<u8>>,
    },
    BytesReceived {
        session_id: u32,
        bytes: Vec<u8>,
    },
    ClientDisconnected {
        session_id: u32,
    },
    Shutdown,
}

/// Main server coordinating networking and game simulation
///
/// The game loop is the only owner of the [`Game`]. Socket tasks hand it raw
/// bytes and receive encoded snapshots back through channels.
pub struct Server {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    config: ServerConfig,
    game: Game,
    sessions: SessionManager,
    tick: u64,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    pub async fn new(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.bind_address).await?;
        let local_addr = listener.local_addr()?;
        info!(
            "Server listening on {} (protocol {}, seed {})",
            local_addr, config.protocol, config.seed
        );

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Some(listener),
            local_addr,
            game: Game::new(config.seed),
            sessions: SessionManager::new(config.max_clients),
            tick: 0,
            config,
            server_tx,
            server_rx,
        })
    }

    /// Address the listener is bound to. Useful when binding port 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sender that can stop the loop with [`ServerMessage::Shutdown`].
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> io::Result<()> {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "server is already running"))?;
        let accept_task = tokio::spawn(accept_connections(listener, self.server_tx.clone()));

        let mut tick_interval = interval(self.config.tick_duration());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        info!("Server started at {} Hz", self.config.tick_rate);

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(message) => {
                            if !self.handle_message(message) {
                                break;
                            }
                        }
                        None => break,
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;
                    self.run_tick(dt);
                },
            }
        }

        info!("Server shutting down");
        accept_task.abort();
        Ok(())
    }

    /// Applies one event from the socket tasks. Returns false on shutdown.
    pub fn handle_message(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::ClientConnected {
                session_id,
                addr,
                outgoing,
            } => {
                if !self.sessions.has_capacity() {
                    warn!("Rejecting connection from {}: server full", addr);
                    // Dropping `outgoing` closes the socket.
                    return true;
                }
                let player = self.game.spawn_player();
                if !self
                    .sessions
                    .add_session(Session::new(session_id, addr, player, outgoing))
                {
                    warn!("Rejecting connection from {}", addr);
                    self.game.remove_player(player);
                }
            }
            ServerMessage::BytesReceived { session_id, bytes } => {
                self.handle_bytes(session_id, &bytes);
            }
            ServerMessage::ClientDisconnected { session_id } => {
                self.drop_session(session_id);
            }
            ServerMessage::Shutdown => return false,
        }
        true
    }

    fn handle_bytes(&mut self, session_id: u32, bytes: &[u8]) {
        let version = self.config.protocol;
        let Some(session) = self.sessions.get_mut(session_id) else {
            debug!("Ignoring {} bytes for closed session {}", bytes.len(), session_id);
            return;
        };
        session.connection.append_received(bytes);

        let result = match self.game.player_mut(session.player) {
            Some(player) => drain_controls(&mut player.controls, &mut session.connection, version),
            None => Ok(()),
        };

        if let Err(e) = result {
            error!("Protocol error from session {}: {}", session_id, e);
            self.drop_session(session_id);
        }
    }

    /// Advances the simulation and queues a snapshot for every session.
    pub fn run_tick(&mut self, dt: f32) {
        let dt = if dt > MAX_TICK_DT {
            debug!(
                "Large delta time detected ({:.3}s), capping to {:.3}s",
                dt, MAX_TICK_DT
            );
            MAX_TICK_DT
        } else {
            dt
        };

        self.game.update(dt);
        self.tick += 1;

        let version = self.config.protocol;
        let mut closed = Vec::new();
        for session in self.sessions.iter_mut() {
            if let Err(e) =
                self.game
                    .send_state_message(&mut session.connection, version, Some(session.player))
            {
                error!("Failed to encode snapshot for session {}: {}", session.id, e);
                closed.push(session.id);
                continue;
            }
            if !session.flush() {
                closed.push(session.id);
            }
        }
        for session_id in closed {
            self.drop_session(session_id);
        }

        if self.tick % 60 == 0 && !self.sessions.is_empty() {
            debug!(
                "Tick {}: {} sessions, {} bullets, {:.1}Hz",
                self.tick,
                self.sessions.len(),
                self.game.bullets.len(),
                1.0 / dt.max(f32::EPSILON)
            );
        }
    }

    fn drop_session(&mut self, session_id: u32) {
        if let Some(session) = self.sessions.remove_session(session_id) {
            self.game.remove_player(session.player);
        }
    }
}

/// Decodes every complete controls message waiting in `connection`.
fn drain_controls(
    controls: &mut Controls,
    connection: &mut Connection,
    version: ProtocolVersion,
) -> Result<(), ProtocolError> {
    while controls.recv_controls_message(connection, version)? {}
    expect_known_message(&connection.recv_buffer, &[version.controls_message()])
}

/// Accepts sockets and spawns their reader and writer tasks
async fn accept_connections(listener: TcpListener, server_tx: mpsc::UnboundedSender<ServerMessage>) {
    let mut next_session_id = 1u32;

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Error accepting connection: {}", e);
                tokio::time::sleep(Duration::from_millis(10)).await;
                continue;
            }
        };

        let session_id = next_session_id;
        next_session_id = next_session_id.wrapping_add(1);

        if !spawn_session_tasks(stream, addr, session_id, &server_tx) {
            break;
        }
    }
}

fn spawn_session_tasks(
    stream: TcpStream,
    addr: SocketAddr,
    session_id: u32,
    server_tx: &mpsc::UnboundedSender<ServerMessage>,
) -> bool {
    if let Err(e) = stream.set_nodelay(true) {
        warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
    }
    let (read_half, write_half) = stream.into_split();
    let (outgoing_tx, outgoing_rx) = mpsc::channel(OUTGOING_QUEUE_LEN);

    tokio::spawn(write_session(write_half, outgoing_rx, session_id));

    // Registered before the reader starts so bytes never arrive for an
    // unknown session.
    let connected = ServerMessage::ClientConnected {
        session_id,
        addr,
        outgoing: outgoing_tx,
    };
    if server_tx.send(connected).is_err() {
        error!("Server loop is gone, stopping accept task");
        return false;
    }

    tokio::spawn(read_session(read_half, server_tx.clone(), session_id));
    true
}

async fn read_session(
    mut read_half: OwnedReadHalf,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    session_id: u32,
) {
    let mut buffer = [0u8; READ_BUFFER_SIZE];

    loop {
        match read_half.read(&mut buffer).await {
            Ok(0) => break,
            Ok(len) => {
                let message = ServerMessage::BytesReceived {
                    session_id,
                    bytes: buffer[..len].to_vec(),
                };
                if server_tx.send(message).is_err() {
                    return;
                }
            }
            Err(e) => {
                debug!("Read error on session {}: {}", session_id, e);
                break;
            }
        }
    }

    let _ = server_tx.send(ServerMessage::ClientDisconnected { session_id });
}

/// Writes queued snapshots until the session is dropped by the game loop.
async fn write_session(
    mut write_half: OwnedWriteHalf,
    mut outgoing_rx: mpsc::Receiver<Vec<u8>>,
    session_id: u32,
) {
    while let Some(bytes) = outgoing_rx.recv().await {
        if let Err(e) = write_half.write_all(&bytes).await {
            debug!("Write error on session {}: {}", session_id, e);
            return;
        }
    }
    let _ = write_half.shutdown().await;
}
