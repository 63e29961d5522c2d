//! Client connection: snapshot decoding, control sending and reporting

use crate::input::{InputDriver, InputMode};
use crate::view::WorldView;
use log::{info, warn};
use shared::framing::expect_known_message;
use shared::{Connection, Controls, Game, ProtocolError, ProtocolVersion, SessionError};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{interval, MissedTickBehavior};

const READ_BUFFER_SIZE: usize = 8192;

/// How the client reports the world it receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    /// `info!` summary lines
    Log,
    /// One JSON `WorldView` per line on stdout
    Json,
    Quiet,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub protocol: ProtocolVersion,
    /// Control messages sent per second
    pub frame_rate: u32,
    pub input: InputMode,
    pub report: ReportMode,
    /// Report once every this many frames
    pub report_every: u64,
    /// Stop cleanly after this many frames
    pub max_frames: Option<u64>,
}

impl ClientConfig {
    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.frame_rate.max(1) as f64)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            protocol: ProtocolVersion::default(),
            frame_rate: 60,
            input: InputMode::Idle,
            report: ReportMode::Log,
            report_every: 60,
            max_frames: None,
        }
    }
}

/// Socket-free client state.
///
/// Received bytes go in through [`ClientSession::handle_bytes`], outgoing
/// controls come out of [`ClientSession::next_frame`].
pub struct ClientSession {
    protocol: ProtocolVersion,
    connection: Connection,
    game: Game,
    controls: Controls,
    input: InputDriver,
    frame: u64,
    snapshots: u64,
}

impl ClientSession {
    pub fn new(protocol: ProtocolVersion, input: InputMode) -> Self {
        Self {
            protocol,
            connection: Connection::new(),
            game: Game::new(0),
            controls: Controls::new(),
            input: InputDriver::new(input),
            frame: 0,
            snapshots: 0,
        }
    }

    /// Applies every complete snapshot in `bytes` plus whatever was buffered.
    ///
    /// Returns how many snapshots were applied.
    pub fn handle_bytes(&mut self, bytes: &[u8]) -> Result<usize, ProtocolError> {
        self.connection.append_received(bytes);

        let mut applied = 0;
        while self.game.recv_state_message(&mut self.connection, self.protocol)? {
            applied += 1;
        }
        expect_known_message(&self.connection.recv_buffer, &[self.protocol.state_message()])?;

        self.snapshots += applied as u64;
        Ok(applied)
    }

    /// Samples input for one frame and returns the encoded controls message.
    pub fn next_frame(&mut self) -> Result<Vec<u8>, ProtocolError> {
        self.input.step(&mut self.controls);
        self.controls
            .send_controls_message(&mut self.connection, self.protocol)?;
        self.frame += 1;
        Ok(self.connection.take_outgoing())
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn snapshots(&self) -> u64 {
        self.snapshots
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn view(&self) -> WorldView {
        WorldView::from_game(&self.game, self.frame)
    }
}

/// A client connected to a server over TCP
pub struct Client {
    stream: TcpStream,
    session: ClientSession,
    config: ClientConfig,
}

impl Client {
    pub async fn connect(server_addr: &str, config: ClientConfig) -> Result<Self, SessionError> {
        info!("Connecting to {}...", server_addr);
        let stream = TcpStream::connect(server_addr).await?;
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY: {}", e);
        }
        info!("Connected to {} using protocol {}", server_addr, config.protocol);

        Ok(Client {
            stream,
            session: ClientSession::new(config.protocol, config.input.clone()),
            config,
        })
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    /// Runs until the connection fails or `max_frames` is reached.
    pub async fn run(&mut self) -> Result<(), SessionError> {
        let Client {
            stream,
            session,
            config,
        } = self;

        let mut frame_interval = interval(config.frame_duration());
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut buffer = [0u8; READ_BUFFER_SIZE];

        loop {
            tokio::select! {
                read = stream.read(&mut buffer) => {
                    let len = read?;
                    if len == 0 {
                        return Err(SessionError::ConnectionLost);
                    }
                    session.handle_bytes(&buffer[..len])?;
                },

                _ = frame_interval.tick() => {
                    let bytes = session.next_frame()?;
                    stream.write_all(&bytes).await?;

                    let frame = session.frame();
                    if config.report_every > 0 && frame % config.report_every == 0 {
                        report(&session.view(), config.report);
                    }
                    if config.max_frames.is_some_and(|max| frame >= max) {
                        info!(
                            "Stopping after {} frames ({} snapshots received)",
                            frame,
                            session.snapshots()
                        );
                        let _ = stream.shutdown().await;
                        return Ok(());
                    }
                },
            }
        }
    }
}

fn report(view: &WorldView, mode: ReportMode) {
    match mode {
        ReportMode::Log => info!("{}", view.summary()),
        ReportMode::Json => match view.to_json() {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize world view: {}", e),
        },
        ReportMode::Quiet => {}
    }
}
