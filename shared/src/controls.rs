//! Per-player button state and the controls message.
//!
//! Each button travels as one byte: the high bit is the current pressed
//! state, the low seven bits count press edges since the previous report.
//! Receivers add incoming counts to what they already hold, so merged or
//! late reports never lose a press.

use crate::connection::Connection;
use crate::error::ProtocolError;
use crate::framing::{try_read_message, ProtocolVersion};
use log::warn;
use serde::{Deserialize, Serialize};

const PRESSED_BIT: u8 = 0x80;
const DOWNS_MASK: u8 = 0x7f;

/// Logical player actions fed in by the input layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Left,
    Right,
    Up,
    Down,
    Jump,
    Shoot,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Left,
        Action::Right,
        Action::Up,
        Action::Down,
        Action::Jump,
        Action::Shoot,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Button {
    pub pressed: bool,
    /// Press edges not yet reported (client) or not yet acted on (server).
    pub downs: u8,
}

impl Button {
    /// Records a press. Repeats while already held are ignored.
    pub fn press(&mut self) {
        if !self.pressed {
            self.pressed = true;
            self.downs = self.downs.saturating_add(1);
        }
    }

    pub fn release(&mut self) {
        self.pressed = false;
    }

    /// Packs the button into one wire byte: bit 7 is `pressed`, bits 0..7
    /// hold `downs` saturated at 127.
    pub fn encode(&self) -> u8 {
        if self.downs > DOWNS_MASK {
            warn!(
                "Button pressed {} times since last report, sending {}",
                self.downs, DOWNS_MASK
            );
        }
        let pressed = if self.pressed { PRESSED_BIT } else { 0 };
        pressed | self.downs.min(DOWNS_MASK)
    }

    /// Takes `pressed` from the byte and adds its down count to ours.
    ///
    /// Counts accumulate across messages until the server acts on them, so a
    /// press is never lost between two ticks.
    pub fn decode(&mut self, byte: u8) {
        self.pressed = byte & PRESSED_BIT != 0;
        let total = u16::from(self.downs) + u16::from(byte & DOWNS_MASK);
        if total > u16::from(u8::MAX) {
            warn!("Received {} button downs, clamping to 255", total);
        }
        self.downs = total.min(u16::from(u8::MAX)) as u8;
    }

    /// True when the button went down since the latch was last cleared.
    pub fn rising_edge(&self, latched: bool) -> bool {
        self.downs > 0 || (self.pressed && !latched)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub left: Button,
    pub right: Button,
    pub up: Button,
    pub down: Button,
    pub jump: Button,
    pub shoot: Button,
}

impl Controls {
    /// All buttons released with no edges counted.
    pub fn new() -> Self {
        Self::default()
    }

    /// The button an action maps to.
    ///
    /// Every action has exactly one button, so lookups never fail. V1
    /// messages simply never carry the shoot button.
    pub fn button(&self, action: Action) -> &Button {
        match action {
            Action::Left => &self.left,
            Action::Right => &self.right,
            Action::Up => &self.up,
            Action::Down => &self.down,
            Action::Jump => &self.jump,
            Action::Shoot => &self.shoot,
        }
    }

    /// Mutable form of [`Controls::button`], used by input and decoding.
    pub fn button_mut(&mut self, action: Action) -> &mut Button {
        match action {
            Action::Left => &mut self.left,
            Action::Right => &mut self.right,
            Action::Up => &mut self.up,
            Action::Down => &mut self.down,
            Action::Jump => &mut self.jump,
            Action::Shoot => &mut self.shoot,
        }
    }

    /// Applies one press/release event from the input layer.
    pub fn apply(&mut self, action: Action, pressed: bool) {
        let button = self.button_mut(action);
        if pressed {
            button.press();
        } else {
            button.release();
        }
    }

    /// Clears every edge count, leaving `pressed` untouched.
    pub fn reset_downs(&mut self) {
        for action in Action::ALL {
            self.button_mut(action).downs = 0;
        }
    }

    /// Encodes the buttons carried by `version`, in wire order.
    pub fn encode(&self, version: ProtocolVersion) -> Vec<u8> {
        Action::ALL[..version.button_count()]
            .iter()
            .map(|action| self.button(*action).encode())
            .collect()
    }

    /// Merges a controls payload into the current state.
    pub fn decode(&mut self, version: ProtocolVersion, payload: &[u8]) -> Result<(), ProtocolError> {
        let expected = version.button_count();
        if payload.len() != expected {
            return Err(ProtocolError::UnexpectedSize {
                kind: version.controls_message(),
                expected,
                actual: payload.len(),
            });
        }
        for (action, byte) in Action::ALL.iter().zip(payload) {
            self.button_mut(*action).decode(*byte);
        }
        Ok(())
    }

    /// Queues a controls message and starts a new edge count.
    pub fn send_controls_message(
        &mut self,
        connection: &mut Connection,
        version: ProtocolVersion,
    ) -> Result<(), ProtocolError> {
        let payload = self.encode(version);
        connection.send_message(version.controls_message(), &payload)?;
        self.reset_downs();
        Ok(())
    }

    /// Decodes one controls message from the receive buffer, if complete.
    pub fn recv_controls_message(
        &mut self,
        connection: &mut Connection,
        version: ProtocolVersion,
    ) -> Result<bool, ProtocolError> {
        match try_read_message(&mut connection.recv_buffer, version.controls_message())? {
            Some(payload) => {
                self.decode(version, &payload)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
