//! The world registry: every live entity plus the broadcast fan-out list.
//!
//! A `World` is only ever reached through [`SharedWorld`]. Each operation
//! below mutates state and queues the resulting snapshots in one call, so a
//! caller holding the lock produces a complete, consistently ordered sequence
//! of lines for every client.

use crate::client_manager::{ClientManager, OutboundQueue};
use crate::config::WorldConfig;
use crate::game::GameState;
use log::{debug, warn};
use shared::{ClientMessage, PlayerId, ServerMessage, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

pub type SharedWorld = Arc<Mutex<World>>;

pub struct World {
    game: GameState,
    clients: ClientManager,
}

impl World {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            game: GameState::new(config),
            clients: ClientManager::new(),
        }
    }

    pub fn shared(config: &WorldConfig) -> SharedWorld {
        Arc::new(Mutex::new(Self::new(config)))
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    /// Registers a new connection and its player, greets it and tells
    /// everyone about the new arrival.
    pub fn join(
        &mut self,
        addr: SocketAddr,
        queue: OutboundQueue,
        now: Instant,
    ) -> PlayerId {
        let id = self.clients.allocate_id();
        self.game.add_player(id);
        self.clients.add_client(id, addr, queue);

        self.send_to(id, ServerMessage::Id(id));
        self.send_to(id, ServerMessage::Version(PROTOCOL_VERSION));
        self.broadcast_players(now);
        self.broadcast_portals();
        self.send_to(id, ServerMessage::Chickens(self.game.chicken_snapshots()));
        self.drop_stalled(now);
        id
    }

    /// Drops a player and its connection and tells the rest.
    pub fn leave(&mut self, id: PlayerId, now: Instant) {
        let had_player = self.game.remove_player(&id).is_some();
        let had_client = self.clients.remove_client(&id);
        if had_player || had_client {
            self.broadcast_players(now);
        }
        self.drop_stalled(now);
    }

    /// Applies one decoded command from `id`'s connection.
    pub fn handle(&mut self, id: PlayerId, message: ClientMessage, now: Instant) {
        match message {
            ClientMessage::Move(direction) => {
                if self.game.move_player(id, direction) {
                    self.broadcast_players(now);
                }
            }
            ClientMessage::Stop => {
                if self.game.stop_player(id) {
                    self.broadcast_players(now);
                }
            }
            ClientMessage::Attack => {
                if self.game.start_attack(id, now) {
                    self.broadcast_players(now);
                } else {
                    debug!("Player {} attack refused, not ready", id);
                }
            }
            ClientMessage::Teleport => {
                if self.game.teleport(id, now) {
                    self.broadcast_players(now);
                }
            }
            ClientMessage::Money(amount) => {
                debug!("Player {} reports balance {}", id, amount);
                self.game.set_money(id, amount);
            }
            ClientMessage::ChickenAttack(chicken_id) => {
                if let Some(hit) = self.game.attack_chicken(id, chicken_id, now) {
                    self.broadcast(&ServerMessage::ChickenUpdate(hit.chicken));
                    if let Some(balance) = hit.reward_balance {
                        self.send_to(id, ServerMessage::Money(balance));
                    }
                }
            }
        }
        self.drop_stalled(now);
    }

    /// Periodic update: resolves timed transitions no matter whether anyone
    /// is sending input, and broadcasts what changed.
    pub fn tick(&mut self, now: Instant) {
        if self.game.advance_players(now) {
            self.broadcast_players(now);
        }
        for chicken in self.game.advance_chickens(now) {
            debug!("Chicken {} is now {}", chicken.id, chicken.state.as_str());
            self.broadcast(&ServerMessage::ChickenUpdate(chicken));
        }
        self.drop_stalled(now);
    }

    /// Removes the players of clients evicted for not reading, and tells the
    /// rest. Repeats while that broadcast stalls someone else.
    fn drop_stalled(&mut self, now: Instant) {
        loop {
            let stalled = self.clients.take_stalled();
            if stalled.is_empty() {
                return;
            }
            for id in stalled {
                warn!("Dropping player {}: not reading its connection", id);
                self.game.remove_player(&id);
            }
            self.broadcast_players(now);
        }
    }

    /// Advances player timers, then sends the full player list to everyone.
    pub fn broadcast_players(&mut self, now: Instant) {
        self.game.advance_players(now);
        let message = ServerMessage::Players(self.game.player_snapshots());
        self.broadcast(&message);
    }

    pub fn broadcast_portals(&mut self) {
        self.broadcast(&ServerMessage::Portals(self.game.portal_snapshots()));
    }

    fn broadcast(&mut self, message: &ServerMessage) {
        let line = message.encode();
        let delivered = self.clients.broadcast(&line);
        debug!("Broadcast to {} clients: {}", delivered, line);
    }

    fn send_to(&mut self, id: PlayerId, message: ServerMessage) {
        self.clients.send_to(&id, message.encode());
    }
}
