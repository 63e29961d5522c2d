//! Authoritative arena simulation.
//!
//! Players fall along one axis at a time (their "fall axis"), strafe along
//! the other, and periodically have their gravity flipped or their axis
//! swapped. Collision response is positional: players are snapped out of
//! platforms and clamped to the arena, never bounced.

use crate::controls::{Button, Controls};
use crate::error::ProtocolError;
use crate::math::{Aabb, Color, Vec2};
use crate::{
    AIM_SPEED, ARENA_MAX, ARENA_MIN, BULLET_DAMAGE, BULLET_RADIUS, COLLISION_EPSILON,
    DEFAULT_GRAVITY, GRAVITY_SWITCH_INTERVAL, JUMP_ACCELERATION, MAX_HP, PLAYER_RADIUS,
    PLAYER_SPEED,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Stable player identifier, assigned at spawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

/// Which axis gravity and jumping act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementAxis {
    /// Falls along y, strafes along x with left/right.
    #[default]
    Vertical,
    /// Falls along x, strafes along y with down/up.
    Horizontal,
}

impl MovementAxis {
    /// Wire value of the axis: 0 for vertical, 1 for horizontal.
    pub fn index(self) -> u32 {
        match self {
            MovementAxis::Vertical => 0,
            MovementAxis::Horizontal => 1,
        }
    }

    /// Parses the wire value written by [`MovementAxis::index`].
    ///
    /// Anything other than 0 or 1 is rejected, which makes the whole
    /// snapshot carrying it malformed.
    pub fn from_index(index: u32) -> Result<Self, ProtocolError> {
        match index {
            0 => Ok(MovementAxis::Vertical),
            1 => Ok(MovementAxis::Horizontal),
            other => Err(ProtocolError::InvalidMovementAxis(other)),
        }
    }

    /// The other axis. Used when a gravity switch swaps a player's fall axis.
    pub fn toggled(self) -> Self {
        match self {
            MovementAxis::Vertical => MovementAxis::Horizontal,
            MovementAxis::Horizontal => MovementAxis::Vertical,
        }
    }

    fn fall(self, v: Vec2) -> f32 {
        match self {
            MovementAxis::Vertical => v.y,
            MovementAxis::Horizontal => v.x,
        }
    }

    fn fall_mut(self, v: &mut Vec2) -> &mut f32 {
        match self {
            MovementAxis::Vertical => &mut v.y,
            MovementAxis::Horizontal => &mut v.x,
        }
    }

    fn strafe(self, v: Vec2) -> f32 {
        match self {
            MovementAxis::Vertical => v.x,
            MovementAxis::Horizontal => v.y,
        }
    }

    fn strafe_mut(self, v: &mut Vec2) -> &mut f32 {
        match self {
            MovementAxis::Vertical => &mut v.x,
            MovementAxis::Horizontal => &mut v.y,
        }
    }

    /// Unit vector along the strafe axis.
    fn strafe_unit(self) -> Vec2 {
        match self {
            MovementAxis::Vertical => Vec2::new(1.0, 0.0),
            MovementAxis::Horizontal => Vec2::new(0.0, 1.0),
        }
    }

    /// Buttons moving toward the negative and positive strafe direction.
    fn strafe_buttons(self, controls: &Controls) -> (&Button, &Button) {
        match self {
            MovementAxis::Vertical => (&controls.left, &controls.right),
            MovementAxis::Horizontal => (&controls.down, &controls.up),
        }
    }

    /// -1, 0 or 1. Pressing both directions cancels out.
    fn strafe_direction(self, controls: &Controls) -> f32 {
        let (negative, positive) = self.strafe_buttons(controls);
        match (negative.pressed, positive.pressed) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub position: Vec2,
    /// Per-axis strafe speed. Constant, not integrated.
    pub velocity: Vec2,
    pub color: Color,
    pub name: String,
    /// Speed along the fall axis, driven by jumps and gravity.
    pub acceleration: f32,
    pub gravity: f32,
    pub movement_axis: MovementAxis,
    pub jump_pressing: bool,
    pub shoot_pressing: bool,
    pub hp: i32,
    /// Velocity given to the next bullet.
    pub bullet_direction: Vec2,
    pub controls: Controls,
}

impl Player {
    pub fn new(id: PlayerId, position: Vec2, color: Color, name: String) -> Self {
        Self {
            id,
            position,
            velocity: Vec2::new(PLAYER_SPEED, PLAYER_SPEED),
            color,
            name,
            acceleration: 0.0,
            gravity: DEFAULT_GRAVITY,
            movement_axis: MovementAxis::Vertical,
            jump_pressing: false,
            shoot_pressing: false,
            hp: MAX_HP,
            bullet_direction: Vec2::new(AIM_SPEED, 0.0),
            controls: Controls::new(),
        }
    }

    /// Square collision box of side `2 * PLAYER_RADIUS` around the player.
    ///
    /// Platform collision works on this box, while bullet hits use the
    /// circular distance to `position`.
    pub fn bounds(&self) -> Aabb {
        Aabb::around(self.position, PLAYER_RADIUS)
    }

    /// Whether the player may still shoot. HP can drop below zero, since
    /// hits keep landing on players who are already out.
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    /// Direction gravity currently pulls this player, for display.
    pub fn gravity_direction(&self) -> &'static str {
        match (self.movement_axis, self.gravity < 0.0) {
            (MovementAxis::Vertical, true) => "DOWN",
            (MovementAxis::Vertical, false) => "UP",
            (MovementAxis::Horizontal, true) => "LEFT",
            (MovementAxis::Horizontal, false) => "RIGHT",
        }
    }
}

/// Static axis-aligned obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub position_min: Vec2,
    pub position_max: Vec2,
}

impl Platform {
    pub const fn new(position_min: Vec2, position_max: Vec2) -> Self {
        Self {
            position_min,
            position_max,
        }
    }

    /// Box spanning the platform's two corners.
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position_min, self.position_max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Shooter's color; players of this color are never hit.
    pub color: Color,
}

impl Bullet {
    pub fn bounds(&self) -> Aabb {
        Aabb::around(self.position, BULLET_RADIUS)
    }

    fn outside_arena(&self) -> bool {
        self.position.x <= ARENA_MIN.x + BULLET_RADIUS
            || self.position.x >= ARENA_MAX.x - BULLET_RADIUS
            || self.position.y <= ARENA_MIN.y + BULLET_RADIUS
            || self.position.y >= ARENA_MAX.y - BULLET_RADIUS
    }
}

/// The fixed arena layout both server and client build.
pub fn standard_arena() -> Vec<Platform> {
    vec![
        // horizontal ledges
        Platform::new(Vec2::new(-0.2, 0.3), Vec2::new(0.2, 0.4)),
        Platform::new(Vec2::new(-1.3, -0.5), Vec2::new(-0.8, -0.4)),
        Platform::new(Vec2::new(0.6, 0.3), Vec2::new(1.2, 0.4)),
        Platform::new(Vec2::new(1.0, -0.7), Vec2::new(1.4, -0.6)),
        Platform::new(Vec2::new(0.0, -0.7), Vec2::new(0.4, -0.6)),
        Platform::new(Vec2::new(-1.0, -0.1), Vec2::new(-0.6, 0.0)),
        // vertical walls
        Platform::new(Vec2::new(-0.8, 0.3), Vec2::new(-0.7, 0.8)),
        Platform::new(Vec2::new(0.7, -1.0), Vec2::new(0.8, -0.5)),
        Platform::new(Vec2::new(0.5, 0.6), Vec2::new(0.6, 0.9)),
        Platform::new(Vec2::new(1.0, -0.3), Vec2::new(1.1, 0.2)),
        Platform::new(Vec2::new(-0.5, -0.7), Vec2::new(-0.4, -0.2)),
        Platform::new(Vec2::new(-0.1, -0.3), Vec2::new(0.0, 0.1)),
    ]
}

/// World state of one game session.
///
/// On the server this is the authoritative simulation. On a client it is
/// overwritten wholesale by every received snapshot.
#[derive(Debug, Clone)]
pub struct Game {
    pub players: Vec<Player>,
    pub platforms: Vec<Platform>,
    pub bullets: Vec<Bullet>,
    rng: StdRng,
    gravity_timer: f32,
    next_player_id: u32,
    next_player_number: u32,
}

impl Game {
    /// Empty game on the standard arena. `seed` drives spawns and gravity
    /// switches, so two games with the same seed and inputs stay identical.
    pub fn new(seed: u64) -> Self {
        Self::with_platforms(seed, standard_arena())
    }

    /// Empty game on a custom set of platforms.
    pub fn with_platforms(seed: u64, platforms: Vec<Platform>) -> Self {
        Self {
            players: Vec::new(),
            platforms,
            bullets: Vec::new(),
            rng: StdRng::seed_from_u64(seed),
            gravity_timer: 0.0,
            next_player_id: 0,
            next_player_number: 1,
        }
    }

    /// Time accumulated toward the next gravity switch. Server-internal.
    pub fn gravity_timer(&self) -> f32 {
        self.gravity_timer
    }

    /// Looks up a player by id.
    ///
    /// Returns `None` once the player has been removed. Ids are never
    /// reused, so a stale id can't resolve to somebody else.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    /// Mutable lookup, used by the server to feed decoded controls in.
    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// Adds a player in the middle band of the arena floor with a random
    /// color.
    pub fn spawn_player(&mut self) -> PlayerId {
        let id = PlayerId(self.next_player_id);
        self.next_player_id += 1;

        let t = 0.4 + 0.2 * self.rng.gen::<f32>();
        let min_x = ARENA_MIN.x + 2.0 * PLAYER_RADIUS;
        let max_x = ARENA_MAX.x - 2.0 * PLAYER_RADIUS;
        let position = Vec2::new(
            min_x + (max_x - min_x) * t,
            ARENA_MIN.y + 2.0 * PLAYER_RADIUS,
        );

        let color = loop {
            let candidate = Color::new(self.rng.gen(), self.rng.gen(), self.rng.gen());
            if !candidate.is_zero() {
                break candidate.normalized();
            }
        };

        let name = format!("Player {}", self.next_player_number);
        self.next_player_number += 1;

        info!(
            "Spawned {} ({:?}) at ({:.2}, {:.2})",
            name, id, position.x, position.y
        );
        self.players.push(Player::new(id, position, color, name));
        id
    }

    /// Removes a player, typically because its connection went away.
    ///
    /// Bullets the player already fired stay in flight. Returns false if
    /// no player has this id.
    pub fn remove_player(&mut self, id: PlayerId) -> bool {
        match self.players.iter().position(|p| p.id == id) {
            Some(index) => {
                let player = self.players.remove(index);
                info!("Removed {} ({:?})", player.name, id);
                true
            }
            None => false,
        }
    }

    /// Advances the simulation by `elapsed` seconds.
    pub fn update(&mut self, elapsed: f32) {
        self.advance_gravity_timer(elapsed);

        for player in &mut self.players {
            fire(player, &mut self.bullets);
            jump(player);
            fall(player, &self.platforms, elapsed);
            strafe(player, elapsed);
            player.controls.reset_downs();
        }

        for player in &mut self.players {
            resolve_strafe_collision(player, &self.platforms, elapsed);
            clamp_to_arena(player);
            update_aim(player);
        }

        self.update_bullets(elapsed);
    }

    fn advance_gravity_timer(&mut self, elapsed: f32) {
        self.gravity_timer += elapsed;
        while self.gravity_timer >= GRAVITY_SWITCH_INTERVAL {
            self.gravity_timer -= GRAVITY_SWITCH_INTERVAL;
            for player in &mut self.players {
                if self.rng.gen_bool(0.5) {
                    player.gravity = -player.gravity;
                } else {
                    player.movement_axis = player.movement_axis.toggled();
                }
                debug!(
                    "{} now falls {}",
                    player.name,
                    player.gravity_direction()
                );
            }
        }
    }

    fn update_bullets(&mut self, elapsed: f32) {
        let platforms = &self.platforms;
        let players = &mut self.players;

        self.bullets.retain_mut(|bullet| {
            bullet.position += bullet.velocity * elapsed;

            if bullet.outside_arena() {
                return false;
            }

            let bounds = bullet.bounds();
            if platforms.iter().any(|p| p.bounds().overlaps(&bounds)) {
                return false;
            }

            // HP has no floor. Players at or below zero still take hits.
            let hit = players.iter_mut().find(|p| {
                p.color != bullet.color
                    && p.position.distance(bullet.position) < PLAYER_RADIUS + BULLET_RADIUS
            });
            match hit {
                Some(target) => {
                    target.hp -= BULLET_DAMAGE;
                    debug!("{} hit, {} HP left", target.name, target.hp);
                    false
                }
                None => true,
            }
        });
    }
}

fn fire(player: &mut Player, bullets: &mut Vec<Bullet>) {
    if player.controls.shoot.rising_edge(player.shoot_pressing) && player.is_alive() {
        bullets.push(Bullet {
            position: player.position,
            velocity: player.bullet_direction,
            color: player.color,
        });
    }
    player.shoot_pressing = player.controls.shoot.pressed;
}

fn jump(player: &mut Player) {
    if player.controls.jump.rising_edge(player.jump_pressing) {
        // Always push against gravity.
        player.acceleration = if player.gravity < 0.0 {
            JUMP_ACCELERATION
        } else {
            -JUMP_ACCELERATION
        };
    }
    player.jump_pressing = player.controls.jump.pressed;
}

/// Integrates the fall axis and snaps out of any platform the move ran into.
fn fall(player: &mut Player, platforms: &[Platform], elapsed: f32) {
    let axis = player.movement_axis;
    let before = axis.fall(player.position);
    *axis.fall_mut(&mut player.position) += player.acceleration * elapsed;

    let bounds = player.bounds();
    match platforms.iter().find(|p| p.bounds().overlaps(&bounds)) {
        Some(platform) => {
            let low = axis.fall(platform.position_min) - PLAYER_RADIUS - COLLISION_EPSILON;
            let high = axis.fall(platform.position_max) + PLAYER_RADIUS + COLLISION_EPSILON;
            let snapped = if (before - high).abs() <= (before - low).abs() {
                high
            } else {
                low
            };
            *axis.fall_mut(&mut player.position) = snapped;
            player.acceleration = 0.0;
        }
        None => player.acceleration += player.gravity * elapsed,
    }
}

fn strafe(player: &mut Player, elapsed: f32) {
    let axis = player.movement_axis;
    let step = axis.strafe_direction(&player.controls) * axis.strafe(player.velocity) * elapsed;
    *axis.strafe_mut(&mut player.position) += step;
}

/// Pushes a player that strafed into a platform back out along the strafe
/// axis.
fn resolve_strafe_collision(player: &mut Player, platforms: &[Platform], elapsed: f32) {
    let axis = player.movement_axis;
    let direction = axis.strafe_direction(&player.controls);
    if direction == 0.0 {
        return;
    }

    let bounds = player.bounds();
    let Some(platform) = platforms.iter().find(|p| p.bounds().overlaps(&bounds)) else {
        return;
    };

    let speed = axis.strafe(player.velocity);
    let position = axis.strafe_mut(&mut player.position);
    *position -= direction * speed * elapsed;
    if direction < 0.0 {
        let limit = axis.strafe(platform.position_max) + PLAYER_RADIUS;
        if *position > limit {
            *position = limit;
        }
    } else {
        let limit = axis.strafe(platform.position_min) - PLAYER_RADIUS;
        if *position < limit {
            *position = limit;
        }
    }
}

fn clamp_to_arena(player: &mut Player) {
    let min = Vec2::new(ARENA_MIN.x + PLAYER_RADIUS, ARENA_MIN.y + PLAYER_RADIUS);
    let max = Vec2::new(ARENA_MAX.x - PLAYER_RADIUS, ARENA_MAX.y - PLAYER_RADIUS);

    let mut clamped_x = false;
    if player.position.x < min.x {
        player.position.x = min.x;
        clamped_x = true;
    } else if player.position.x > max.x {
        player.position.x = max.x;
        clamped_x = true;
    }

    let mut clamped_y = false;
    if player.position.y < min.y {
        player.position.y = min.y;
        clamped_y = true;
    } else if player.position.y > max.y {
        player.position.y = max.y;
        clamped_y = true;
    }

    let on_fall_axis = match player.movement_axis {
        MovementAxis::Vertical => clamped_y,
        MovementAxis::Horizontal => clamped_x,
    };
    if on_fall_axis {
        player.acceleration = 0.0;
    }
}

fn update_aim(player: &mut Player) {
    let axis = player.movement_axis;
    let direction = axis.strafe_direction(&player.controls);
    if direction != 0.0 {
        player.bullet_direction = axis.strafe_unit() * (direction * AIM_SPEED);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::Action;
    use assert_approx_eq::assert_approx_eq;

    const DT: f32 = 1.0 / 60.0;

    fn empty_game() -> Game {
        Game::with_platforms(7, Vec::new())
    }

    fn place(game: &mut Game, id: PlayerId, position: Vec2) {
        let player = game.player_mut(id).unwrap();
        player.position = position;
        player.acceleration = 0.0;
    }

    #[test]
    fn test_spawn_player() {
        let mut game = Game::new(1);
        let a = game.spawn_player();
        let b = game.spawn_player();
        assert_ne!(a, b);

        let player = game.player(a).unwrap();
        assert_eq!(player.name, "Player 1");
        assert_eq!(player.hp, MAX_HP);
        assert_approx_eq!(player.position.y, ARENA_MIN.y + 2.0 * PLAYER_RADIUS, 1e-6);
        let len = (player.color.r.powi(2) + player.color.g.powi(2) + player.color.b.powi(2)).sqrt();
        assert_approx_eq!(len, 1.0, 1e-5);
        assert_eq!(game.player(b).unwrap().name, "Player 2");
    }

    #[test]
    fn test_spawn_is_deterministic_per_seed() {
        let mut a = Game::new(42);
        let mut b = Game::new(42);
        let pa = a.spawn_player();
        let pb = b.spawn_player();
        assert_eq!(a.player(pa).unwrap().position, b.player(pb).unwrap().position);
        assert_eq!(a.player(pa).unwrap().color, b.player(pb).unwrap().color);
    }

    #[test]
    fn test_remove_player() {
        let mut game = Game::new(1);
        let a = game.spawn_player();
        let b = game.spawn_player();
        assert!(game.remove_player(a));
        assert!(!game.remove_player(a));
        assert_eq!(game.players.len(), 1);
        assert_eq!(game.players[0].id, b);
    }

    #[test]
    fn test_free_fall_accumulates_gravity() {
        let mut game = empty_game();
        let id = game.spawn_player();
        place(&mut game, id, Vec2::new(0.0, 0.5));

        game.update(DT);
        let player = game.player(id).unwrap();
        assert_approx_eq!(player.acceleration, DEFAULT_GRAVITY * DT, 1e-6);

        game.update(DT);
        let player = game.player(id).unwrap();
        assert!(player.position.y < 0.5);
    }

    #[test]
    fn test_landing_on_platform_top() {
        let top = 0.0;
        let platform = Platform::new(Vec2::new(-0.5, -0.1), Vec2::new(0.5, top));
        let mut game = Game::with_platforms(3, vec![platform]);
        let id = game.spawn_player();
        {
            let player = game.player_mut(id).unwrap();
            player.position = Vec2::new(0.0, top + PLAYER_RADIUS + 0.01);
            player.acceleration = -1.0;
        }

        game.update(DT);

        let player = game.player(id).unwrap();
        assert_eq!(player.acceleration, 0.0);
        assert_eq!(player.position.y, top + PLAYER_RADIUS + COLLISION_EPSILON);
    }

    #[test]
    fn test_hitting_platform_from_below() {
        let platform = Platform::new(Vec2::new(-0.5, 0.0), Vec2::new(0.5, 0.1));
        let mut game = Game::with_platforms(3, vec![platform]);
        let id = game.spawn_player();
        {
            let player = game.player_mut(id).unwrap();
            player.position = Vec2::new(0.0, -PLAYER_RADIUS - 0.01);
            player.acceleration = 3.0;
        }

        game.update(DT);

        let player = game.player(id).unwrap();
        assert_eq!(player.acceleration, 0.0);
        assert_eq!(player.position.y, 0.0 - PLAYER_RADIUS - COLLISION_EPSILON);
    }

    #[test]
    fn test_horizontal_fall_lands_on_wall() {
        let platform = Platform::new(Vec2::new(-0.1, -0.5), Vec2::new(0.0, 0.5));
        let mut game = Game::with_platforms(3, vec![platform]);
        let id = game.spawn_player();
        {
            let player = game.player_mut(id).unwrap();
            player.movement_axis = MovementAxis::Horizontal;
            player.position = Vec2::new(PLAYER_RADIUS + 0.01, 0.0);
            player.acceleration = -1.0;
        }

        game.update(DT);

        let player = game.player(id).unwrap();
        assert_eq!(player.acceleration, 0.0);
        assert_eq!(player.position.x, 0.0 + PLAYER_RADIUS + COLLISION_EPSILON);
    }

    #[test]
    fn test_jump_pushes_against_gravity() {
        let mut game = empty_game();
        let id = game.spawn_player();
        place(&mut game, id, Vec2::new(0.0, 0.0));
        game.player_mut(id).unwrap().controls.apply(Action::Jump, true);

        game.update(DT);
        let player = game.player(id).unwrap();
        assert_approx_eq!(player.acceleration, JUMP_ACCELERATION + DEFAULT_GRAVITY * DT, 1e-5);
        assert!(player.jump_pressing);

        let player = game.player_mut(id).unwrap();
        player.gravity = -DEFAULT_GRAVITY;
        player.acceleration = 0.0;
        player.controls.apply(Action::Jump, false);
        player.controls.apply(Action::Jump, true);
        game.update(DT);
        let player = game.player(id).unwrap();
        assert!(player.acceleration < 0.0);
    }

    #[test]
    fn test_held_jump_fires_once() {
        let mut game = empty_game();
        let id = game.spawn_player();
        place(&mut game, id, Vec2::new(0.0, 0.0));
        game.player_mut(id).unwrap().controls.apply(Action::Jump, true);
        game.update(DT);

        game.player_mut(id).unwrap().acceleration = 0.0;
        game.update(DT);
        let player = game.player(id).unwrap();
        assert_approx_eq!(player.acceleration, DEFAULT_GRAVITY * DT, 1e-6);
    }

    #[test]
    fn test_strafe_both_pressed_cancels() {
        let mut game = empty_game();
        let id = game.spawn_player();
        place(&mut game, id, Vec2::new(0.0, ARENA_MIN.y + PLAYER_RADIUS));
        {
            let controls = &mut game.player_mut(id).unwrap().controls;
            controls.apply(Action::Left, true);
            controls.apply(Action::Right, true);
        }
        game.update(DT);
        assert_eq!(game.player(id).unwrap().position.x, 0.0);

        game.player_mut(id).unwrap().controls.apply(Action::Left, false);
        game.update(DT);
        assert_approx_eq!(game.player(id).unwrap().position.x, PLAYER_SPEED * DT, 1e-6);
    }

    #[test]
    fn test_horizontal_mode_strafes_on_y() {
        let mut game = empty_game();
        let id = game.spawn_player();
        {
            let player = game.player_mut(id).unwrap();
            player.movement_axis = MovementAxis::Horizontal;
            player.position = Vec2::new(ARENA_MIN.x + PLAYER_RADIUS, 0.0);
            player.controls.apply(Action::Up, true);
        }
        game.update(DT);
        let player = game.player(id).unwrap();
        assert_approx_eq!(player.position.y, PLAYER_SPEED * DT, 1e-6);
        assert_eq!(player.bullet_direction, Vec2::new(0.0, AIM_SPEED));
    }

    #[test]
    fn test_strafing_into_platform_is_undone() {
        let wall = Platform::new(Vec2::new(0.1, -1.0), Vec2::new(0.2, 1.0));
        let mut game = Game::with_platforms(3, vec![wall]);
        let id = game.spawn_player();
        let start = 0.1 - PLAYER_RADIUS - 0.001;
        {
            let player = game.player_mut(id).unwrap();
            player.position = Vec2::new(start, ARENA_MIN.y + PLAYER_RADIUS);
            player.controls.apply(Action::Right, true);
        }

        game.update(DT);
        let player = game.player(id).unwrap();
        assert!(player.position.x + PLAYER_RADIUS <= 0.1 + 1e-6);
    }

    #[test]
    fn test_arena_clamp_zeroes_fall_acceleration() {
        let mut game = empty_game();
        let id = game.spawn_player();
        {
            let player = game.player_mut(id).unwrap();
            player.position = Vec2::new(0.0, ARENA_MIN.y + PLAYER_RADIUS);
            player.acceleration = -2.0;
        }
        game.update(DT);
        let player = game.player(id).unwrap();
        assert_eq!(player.position.y, ARENA_MIN.y + PLAYER_RADIUS);
        assert_eq!(player.acceleration, 0.0);
    }

    #[test]
    fn test_arena_clamp_on_strafe_axis_keeps_acceleration() {
        let mut game = empty_game();
        let id = game.spawn_player();
        {
            let player = game.player_mut(id).unwrap();
            player.position = Vec2::new(ARENA_MAX.x - PLAYER_RADIUS, 0.0);
            player.acceleration = 1.0;
            player.controls.apply(Action::Right, true);
        }
        game.update(DT);
        let player = game.player(id).unwrap();
        assert_eq!(player.position.x, ARENA_MAX.x - PLAYER_RADIUS);
        assert!(player.acceleration != 0.0);
    }

    #[test]
    fn test_aim_follows_strafe_input() {
        let mut game = empty_game();
        let id = game.spawn_player();
        place(&mut game, id, Vec2::new(0.0, ARENA_MIN.y + PLAYER_RADIUS));
        assert_eq!(game.player(id).unwrap().bullet_direction, Vec2::new(AIM_SPEED, 0.0));

        game.player_mut(id).unwrap().controls.apply(Action::Left, true);
        game.update(DT);
        assert_eq!(game.player(id).unwrap().bullet_direction, Vec2::new(-AIM_SPEED, 0.0));

        game.player_mut(id).unwrap().controls.apply(Action::Left, false);
        game.update(DT);
        assert_eq!(game.player(id).unwrap().bullet_direction, Vec2::new(-AIM_SPEED, 0.0));
    }

    #[test]
    fn test_held_shoot_spawns_one_bullet() {
        let mut game = empty_game();
        let id = game.spawn_player();
        place(&mut game, id, Vec2::new(-1.0, ARENA_MIN.y + PLAYER_RADIUS));
        game.player_mut(id).unwrap().controls.apply(Action::Shoot, true);

        for _ in 0..10 {
            game.update(DT);
        }
        assert_eq!(game.bullets.len(), 1);

        let player = game.player_mut(id).unwrap();
        player.controls.apply(Action::Shoot, false);
        player.controls.apply(Action::Shoot, true);
        game.update(DT);
        assert_eq!(game.bullets.len(), 2);
    }

    #[test]
    fn test_quick_tap_between_ticks_still_shoots() {
        let mut game = empty_game();
        let id = game.spawn_player();
        place(&mut game, id, Vec2::new(-1.0, ARENA_MIN.y + PLAYER_RADIUS));
        let controls = &mut game.player_mut(id).unwrap().controls;
        controls.apply(Action::Shoot, true);
        controls.apply(Action::Shoot, false);

        game.update(DT);
        assert_eq!(game.bullets.len(), 1);
        assert!(!game.player(id).unwrap().shoot_pressing);
    }

    #[test]
    fn test_dead_player_cannot_shoot() {
        let mut game = empty_game();
        let id = game.spawn_player();
        let player = game.player_mut(id).unwrap();
        player.hp = 0;
        player.controls.apply(Action::Shoot, true);
        game.update(DT);
        assert!(game.bullets.is_empty());
    }

    fn bullet_next_to(game: &Game, id: PlayerId) -> Bullet {
        let target = game.player(id).unwrap();
        Bullet {
            position: target.position + Vec2::new(0.05, 0.0),
            velocity: Vec2::new(0.0, 0.0),
            color: Color::new(1.0, 0.0, 0.0),
        }
    }

    fn weightless_player(game: &mut Game, hp: i32) -> PlayerId {
        let id = game.spawn_player();
        place(game, id, Vec2::new(0.0, 0.0));
        let player = game.player_mut(id).unwrap();
        player.gravity = 0.0;
        player.color = Color::new(0.0, 0.0, 1.0);
        player.hp = hp;
        id
    }

    #[test]
    fn test_hit_takes_hp_below_zero() {
        let mut game = empty_game();
        let id = weightless_player(&mut game, 5);
        let bullet = bullet_next_to(&game, id);
        game.bullets.push(bullet);

        game.update(DT);

        assert_eq!(game.player(id).unwrap().hp, -5);
        assert!(!game.player(id).unwrap().is_alive());
        assert!(game.bullets.is_empty());
    }

    #[test]
    fn test_player_at_zero_hp_still_stops_bullets() {
        let mut game = empty_game();
        let id = weightless_player(&mut game, 0);
        let bullet = bullet_next_to(&game, id);
        game.bullets.push(bullet);

        game.update(DT);

        assert_eq!(game.player(id).unwrap().hp, -BULLET_DAMAGE);
        assert!(game.bullets.is_empty());
    }

    #[test]
    fn test_bullet_leaves_arena() {
        let mut game = empty_game();
        game.bullets.push(Bullet {
            position: Vec2::new(ARENA_MAX.x - BULLET_RADIUS - 0.01, 0.0),
            velocity: Vec2::new(AIM_SPEED, 0.0),
            color: Color::new(1.0, 0.0, 0.0),
        });
        game.update(DT);
        assert!(game.bullets.is_empty());
    }

    #[test]
    fn test_bullet_stops_at_platform() {
        let wall = Platform::new(Vec2::new(0.1, -1.0), Vec2::new(0.2, 1.0));
        let mut game = Game::with_platforms(3, vec![wall]);
        game.bullets.push(Bullet {
            position: Vec2::new(0.1 - BULLET_RADIUS - 0.01, 0.0),
            velocity: Vec2::new(AIM_SPEED, 0.0),
            color: Color::new(1.0, 0.0, 0.0),
        });
        game.update(DT);
        assert!(game.bullets.is_empty());
    }

    #[test]
    fn test_bullet_flies_freely() {
        let mut game = empty_game();
        game.bullets.push(Bullet {
            position: Vec2::new(0.0, 0.0),
            velocity: Vec2::new(AIM_SPEED, 0.0),
            color: Color::new(1.0, 0.0, 0.0),
        });
        game.update(DT);
        assert_eq!(game.bullets.len(), 1);
        assert_approx_eq!(game.bullets[0].position.x, AIM_SPEED * DT, 1e-6);
    }

    #[test]
    fn test_gravity_timer_single_switch() {
        let mut game = empty_game();
        let id = game.spawn_player();
        place(&mut game, id, Vec2::new(0.0, 0.0));

        game.update(GRAVITY_SWITCH_INTERVAL * 0.5);
        let player = game.player(id).unwrap();
        assert_eq!(player.gravity, DEFAULT_GRAVITY);
        assert_eq!(player.movement_axis, MovementAxis::Vertical);

        game.update(GRAVITY_SWITCH_INTERVAL * 0.5);
        let player = game.player(id).unwrap();
        let flipped = player.gravity == -DEFAULT_GRAVITY;
        let toggled = player.movement_axis == MovementAxis::Horizontal;
        assert!(flipped != toggled, "exactly one of gravity/axis changes");
        assert_approx_eq!(game.gravity_timer(), 0.0, 1e-5);
    }

    #[test]
    fn test_movement_axis_index() {
        assert_eq!(MovementAxis::from_index(0), Ok(MovementAxis::Vertical));
        assert_eq!(MovementAxis::from_index(1), Ok(MovementAxis::Horizontal));
        assert_eq!(
            MovementAxis::from_index(2),
            Err(ProtocolError::InvalidMovementAxis(2))
        );
        assert_eq!(MovementAxis::Horizontal.index(), 1);
    }

    #[test]
    fn test_gravity_direction_labels() {
        let mut player = Player::new(PlayerId(0), Vec2::ZERO, Color::new(1.0, 0.0, 0.0), "p".into());
        assert_eq!(player.gravity_direction(), "DOWN");
        player.gravity = 1.0;
        assert_eq!(player.gravity_direction(), "UP");
        player.movement_axis = MovementAxis::Horizontal;
        assert_eq!(player.gravity_direction(), "RIGHT");
        player.gravity = -1.0;
        assert_eq!(player.gravity_direction(), "LEFT");
    }

    #[test]
    fn test_standard_arena_has_twelve_platforms() {
        let game = Game::new(0);
        assert_eq!(game.platforms.len(), 12);
        for platform in &game.platforms {
            assert!(platform.position_min.x < platform.position_max.x);
            assert!(platform.position_min.y < platform.position_max.y);
        }
    }
}
