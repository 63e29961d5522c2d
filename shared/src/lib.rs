//! # Gravity Arena Core
//!
//! Simulation and wire protocol shared by the server and the client.
//!
//! ## Module Organization
//!
//! - `framing`: `[type][u24 size][payload]` message frames and strict payload
//!   cursors
//! - `controls`: button state and the fixed-size controls message
//! - `game`: the arena simulation (players, platforms, bullets)
//! - `sync`: world snapshots sent from server to client
//! - `connection`: the send/receive byte queues the core works on
//!
//! The core never opens sockets and never blocks. Callers feed received bytes
//! into a [`Connection`], poll the decoders, and flush the send buffer to
//! whatever transport they use.

pub mod connection;
pub mod controls;
pub mod error;
pub mod framing;
pub mod game;
pub mod math;
pub mod sync;

pub use connection::Connection;
pub use controls::{Action, Button, Controls};
pub use error::{ProtocolError, SessionError};
pub use framing::{MessageType, ProtocolVersion};
pub use game::{Bullet, Game, MovementAxis, Platform, Player, PlayerId};
pub use math::{Aabb, Color, Vec2};

pub const ARENA_MIN: Vec2 = Vec2::new(-1.5, -1.0);
pub const ARENA_MAX: Vec2 = Vec2::new(1.5, 1.0);
pub const PLAYER_RADIUS: f32 = 0.06;
pub const BULLET_RADIUS: f32 = 0.02;

/// Strafe speed along either axis.
pub const PLAYER_SPEED: f32 = 1.0;
pub const DEFAULT_GRAVITY: f32 = -9.8;
pub const JUMP_ACCELERATION: f32 = 3.0;
/// Bullet speed along the strafe axis.
pub const AIM_SPEED: f32 = 2.0;
/// Seconds between gravity/axis switches.
pub const GRAVITY_SWITCH_INTERVAL: f32 = 5.0;
/// Gap left between a player and the platform it was snapped against.
pub const COLLISION_EPSILON: f32 = 0.001;

pub const MAX_HP: i32 = 100;
pub const BULLET_DAMAGE: i32 = 10;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_fits_players() {
        assert!(ARENA_MAX.x - ARENA_MIN.x > 4.0 * PLAYER_RADIUS);
        assert!(ARENA_MAX.y - ARENA_MIN.y > 4.0 * PLAYER_RADIUS);
        assert!(BULLET_RADIUS < PLAYER_RADIUS);
    }

    #[test]
    fn test_jump_opposes_default_gravity() {
        assert!(DEFAULT_GRAVITY < 0.0);
        assert!(JUMP_ACCELERATION > 0.0);
        assert_eq!(MAX_HP % BULLET_DAMAGE, 0);
    }
}
