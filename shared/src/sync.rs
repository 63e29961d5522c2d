//! World snapshots: server→client state messages.
//!
//! A snapshot replaces the receiver's players and bullets wholesale. The
//! receiving connection's own player is always sent first, so a client takes
//! `players[0]` as its avatar.

use crate::connection::Connection;
use crate::error::ProtocolError;
use crate::framing::{try_read_message, PayloadReader, PayloadWriter, ProtocolVersion};
use crate::game::{Bullet, Game, MovementAxis, Player, PlayerId};
use crate::{DEFAULT_GRAVITY, MAX_HP};
use log::warn;

/// Longest list or name a one-byte length can describe.
pub const MAX_LIST_LEN: usize = u8::MAX as usize;

impl Game {
    /// Encodes the state payload for one connection.
    ///
    /// `for_player` is moved to the front of the player list. Lists longer
    /// than 255 entries are cut short.
    pub fn encode_state(&self, version: ProtocolVersion, for_player: Option<PlayerId>) -> Vec<u8> {
        let mut writer = PayloadWriter::new();

        if self.players.len() > MAX_LIST_LEN {
            warn!(
                "Snapshot holds {} players, sending the first {}",
                self.players.len(),
                MAX_LIST_LEN
            );
        }
        let own = for_player.and_then(|id| self.player(id));
        let others = self
            .players
            .iter()
            .filter(|p| Some(p.id) != own.map(|o| o.id));
        let ordered: Vec<&Player> = own.into_iter().chain(others).take(MAX_LIST_LEN).collect();

        writer.put_u8(ordered.len() as u8);
        for player in ordered {
            write_player(&mut writer, player, version);
        }

        if version.has_combat() {
            if self.bullets.len() > MAX_LIST_LEN {
                warn!(
                    "Snapshot holds {} bullets, sending the first {}",
                    self.bullets.len(),
                    MAX_LIST_LEN
                );
            }
            let count = self.bullets.len().min(MAX_LIST_LEN);
            writer.put_u8(count as u8);
            for bullet in &self.bullets[..count] {
                writer.put_vec2(bullet.position);
                writer.put_vec2(bullet.velocity);
                writer.put_color(bullet.color);
            }
        }

        writer.into_inner()
    }

    /// Queues a state message for `connection`.
    pub fn send_state_message(
        &self,
        connection: &mut Connection,
        version: ProtocolVersion,
        for_player: Option<PlayerId>,
    ) -> Result<(), ProtocolError> {
        let payload = self.encode_state(version, for_player);
        connection.send_message(version.state_message(), &payload)
    }

    /// Replaces players and bullets with the contents of a state payload.
    ///
    /// Nothing is replaced if the payload is malformed.
    pub fn apply_state(&mut self, version: ProtocolVersion, payload: &[u8]) -> Result<(), ProtocolError> {
        let mut reader = PayloadReader::new(version.state_message(), payload);

        let player_count = reader.read_u8()?;
        let mut players = Vec::with_capacity(player_count as usize);
        for index in 0..player_count {
            players.push(read_player(&mut reader, version, PlayerId(index as u32))?);
        }

        let mut bullets = Vec::new();
        if version.has_combat() {
            let bullet_count = reader.read_u8()?;
            bullets.reserve(bullet_count as usize);
            for _ in 0..bullet_count {
                bullets.push(Bullet {
                    position: reader.read_vec2()?,
                    velocity: reader.read_vec2()?,
                    color: reader.read_color()?,
                });
            }
        }

        reader.finish()?;

        self.players = players;
        self.bullets = bullets;
        Ok(())
    }

    /// Applies one state message from the receive buffer, if complete.
    pub fn recv_state_message(
        &mut self,
        connection: &mut Connection,
        version: ProtocolVersion,
    ) -> Result<bool, ProtocolError> {
        match try_read_message(&mut connection.recv_buffer, version.state_message())? {
            Some(payload) => {
                self.apply_state(version, &payload)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The receiving client's avatar after a snapshot was applied.
    pub fn own_player(&self) -> Option<&Player> {
        self.players.first()
    }
}

/// Writes one player record in the layout of `version`.
///
/// The name is cut at 255 bytes, not characters, so a multi-byte character
/// straddling the limit is split. The reader decodes the leftover bytes
/// lossily as U+FFFD.
fn write_player(writer: &mut PayloadWriter, player: &Player, version: ProtocolVersion) {
    writer.put_vec2(player.position);
    writer.put_vec2(player.velocity);
    writer.put_color(player.color);
    if version.has_combat() {
        writer.put_u32(player.movement_axis.index());
        writer.put_f32(player.gravity);
        writer.put_i32(player.hp);
    }

    let name = player.name.as_bytes();
    let len = name.len().min(MAX_LIST_LEN);
    writer.put_u8(len as u8);
    writer.put_bytes(&name[..len]);
}

/// Reads one player record. V1 records get the default combat fields.
fn read_player(
    reader: &mut PayloadReader<'_>,
    version: ProtocolVersion,
    id: PlayerId,
) -> Result<Player, ProtocolError> {
    let position = reader.read_vec2()?;
    let velocity = reader.read_vec2()?;
    let color = reader.read_color()?;

    let (movement_axis, gravity, hp) = if version.has_combat() {
        (
            MovementAxis::from_index(reader.read_u32()?)?,
            reader.read_f32()?,
            reader.read_i32()?,
        )
    } else {
        (MovementAxis::Vertical, DEFAULT_GRAVITY, MAX_HP)
    };

    let name_len = reader.read_u8()? as usize;
    let name = String::from_utf8_lossy(reader.read_bytes(name_len)?).into_owned();

    let mut player = Player::new(id, position, color, name);
    player.velocity = velocity;
    player.movement_axis = movement_axis;
    player.gravity = gravity;
    player.hp = hp;
    Ok(player)
}
