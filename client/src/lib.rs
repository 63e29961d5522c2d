//! # Gravity Arena Client
//!
//! Headless client for the gravity arena. It connects to a server over TCP,
//! streams its controls once per frame, and applies every world snapshot the
//! server sends back.
//!
//! ## Architecture Overview
//!
//! The server is fully authoritative. The client never simulates; it only
//! decodes snapshots into a local [`Game`](shared::Game) and exposes them as a
//! read-only [`WorldView`](view::WorldView) for whatever renders them.
//!
//! ### Own Player
//! Every snapshot lists the receiving client's player first. No ids travel on
//! the wire, so the first entry is how the client finds its own avatar.
//!
//! ### Edge Counting
//! Controls carry both the held state of each button and how many times it
//! went down since the last message. A tap shorter than one frame still
//! reaches the server as a jump or a shot.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! - Idle, seeded random and scripted input drivers
//! - Repeat filtering before events reach the controls
//!
//! ### Network Module (`network`)
//! - `TcpStream` connection and the frame loop
//! - Snapshot decoding and controls encoding
//! - Fatal handling of lost connections and malformed data
//!
//! ### View Module (`view`)
//! - Render snapshot of own player, other players, bullets and platforms
//! - JSON lines output for an external renderer
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::InputMode;
//! use client::network::{Client, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig {
//!         input: InputMode::Random { seed: 1 },
//!         ..ClientConfig::default()
//!     };
//!
//!     let mut client = Client::connect("127.0.0.1:8080", config).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod input;
pub mod network;
pub mod view;
