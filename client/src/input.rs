//! Client input: held keys, latched presses, and the commands they turn into.

use crate::game::WorldView;
use shared::{ClientMessage, Direction};

/// Keyboard and mouse state shared between the render loop (which samples
/// the devices) and the fixed-interval input loop (which sends commands).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Set on a mouse press, cleared when the input loop sends it.
    pub attack_requested: bool,
    /// Set on a teleport key press, cleared when the input loop sends it.
    pub teleport_requested: bool,
}

impl KeyState {
    /// One direction out of the held keys. First match wins: up, down, left,
    /// right.
    pub fn intended_direction(&self) -> Option<Direction> {
        [
            (self.up, Direction::Up),
            (self.down, Direction::Down),
            (self.left, Direction::Left),
            (self.right, Direction::Right),
        ]
        .into_iter()
        .find_map(|(held, direction)| held.then_some(direction))
    }

    /// Replaces the held keys, keeping any presses not yet sent.
    pub fn set_held(&mut self, up: bool, down: bool, left: bool, right: bool) {
        self.up = up;
        self.down = down;
        self.left = left;
        self.right = right;
    }
}

/// Turns sampled key state into protocol commands, one batch per tick.
#[derive(Debug, Default)]
pub struct InputManager {
    ticks: u64,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Commands for one tick. Nothing is sent before the server has assigned
    /// an id. Latched presses are consumed from `keys`.
    pub fn plan(&mut self, keys: &mut KeyState, view: &WorldView) -> Vec<ClientMessage> {
        if view.player_id.is_none() {
            return Vec::new();
        }
        self.ticks += 1;

        let mut commands = Vec::with_capacity(3);
        if std::mem::take(&mut keys.attack_requested) {
            commands.push(ClientMessage::Attack);
            if let Some(chicken) = view.chicken_in_reach() {
                commands.push(ClientMessage::ChickenAttack(chicken));
            }
        }
        if std::mem::take(&mut keys.teleport_requested) {
            commands.push(ClientMessage::Teleport);
        }
        commands.push(match keys.intended_direction() {
            Some(direction) => ClientMessage::Move(direction),
            None => ClientMessage::Stop,
        });
        commands
    }
}
