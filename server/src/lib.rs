//! # Gravity Arena Server
//!
//! Authoritative server for the gravity arena. It owns the only simulation,
//! decodes controls from every connected client, and streams world snapshots
//! back to them.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Every tick advances the shared [`Game`](shared::Game) engine: gravity
//! switches, jumps, platform collisions, bullets and hits are all decided
//! here. Clients only ever render what the server sends.
//!
//! ### Session Management
//! Handles the lifecycle of client connections:
//! - Player spawn when a TCP connection is accepted
//! - Controls decoding from each session's receive buffer
//! - Player removal when the socket closes or misbehaves
//! - Connection rejection once `max_clients` is reached
//!
//! ### State Broadcasting
//! After each tick every session receives its own snapshot. The recipient's
//! player is always listed first so the client can tell which avatar is its
//! own without any extra message.
//!
//! ## Architecture Design
//!
//! ### Single-Owner Game Loop
//! The engine is owned by one task. Accept, reader and writer tasks only move
//! bytes through `mpsc` channels, so no locks guard game state and every tick
//! sees a consistent world. Each writer's queue is bounded, and a client that
//! stops reading is dropped once its queue fills.
//!
//! ### TCP Byte Streams
//! The wire format is a stream of `[type][u24 size][payload]` frames. Partial
//! frames wait in the session's [`Connection`](shared::Connection) until the
//! rest arrives. A frame that cannot be decoded ends the session.
//!
//! ## Module Organization
//!
//! ### Session Manager Module (`session_manager`)
//! - Session ids, peer addresses and player ids
//! - Per-session receive and send buffers
//! - Capacity checks
//!
//! ### Network Module (`network`)
//! - `TcpListener` accept loop and per-socket reader/writer tasks
//! - The tick loop: decode, simulate, encode, flush
//! - Shutdown handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_address: "127.0.0.1:8080".to_string(),
//!         tick_rate: 60,
//!         ..ServerConfig::default()
//!     };
//!
//!     let mut server = Server::new(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod network;
pub mod session_manager;
