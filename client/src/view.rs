//! Read-only world snapshot handed to renderers and logs

use serde::Serialize;
use shared::{Bullet, Color, Game, Platform, Player, Vec2};

/// What a renderer needs to know about one player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub name: String,
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: Color,
    pub hp: i32,
    pub movement_index: u32,
    pub gravity: f32,
    /// "DOWN", "UP", "LEFT" or "RIGHT"
    pub falls: &'static str,
}

impl From<&Player> for PlayerView {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            position: player.position,
            velocity: player.velocity,
            color: player.color,
            hp: player.hp,
            movement_index: player.movement_axis.index(),
            gravity: player.gravity,
            falls: player.gravity_direction(),
        }
    }
}

/// Everything visible after the latest snapshot.
///
/// The first player of a snapshot is always the receiving client's own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldView {
    pub frame: u64,
    pub own: Option<PlayerView>,
    pub others: Vec<PlayerView>,
    pub bullets: Vec<Bullet>,
    pub platforms: Vec<Platform>,
}

impl WorldView {
    pub fn from_game(game: &Game, frame: u64) -> Self {
        let mut players = game.players.iter().map(PlayerView::from);
        let own = players.next();
        Self {
            frame,
            own,
            others: players.collect(),
            bullets: game.bullets.clone(),
            platforms: game.platforms.clone(),
        }
    }

    /// Gravity direction of the own player, if one has been received.
    pub fn gravity_label(&self) -> Option<&'static str> {
        self.own.as_ref().map(|own| own.falls)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// One-line description for the log.
    pub fn summary(&self) -> String {
        match &self.own {
            Some(own) => format!(
                "frame {}: {} at ({:.2}, {:.2}) hp {} falling {}, {} others, {} bullets",
                self.frame,
                own.name,
                own.position.x,
                own.position.y,
                own.hp,
                own.falls,
                self.others.len(),
                self.bullets.len()
            ),
            None => format!("frame {}: waiting for first snapshot", self.frame),
        }
    }
}
