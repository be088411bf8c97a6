//! Client-side view of the world, rebuilt from server snapshots and updates.

use log::{debug, info, warn};
use shared::{
    distance, ChickenId, ChickenSnapshot, PlayerId, PlayerSnapshot, PortalSnapshot,
    ServerMessage, ATTACK_RANGE, PROTOCOL_VERSION,
};
use std::collections::{BTreeMap, HashMap};

/// The client's copy of the world, rebuilt from server snapshots.
///
/// Player and portal lists are replaced wholesale on every snapshot; chickens
/// are replaced by `CHICKENS:` and merged one at a time by `CHICKEN_UPDATE:`.
#[derive(Debug, Clone, Default)]
pub struct WorldView {
    pub player_id: Option<PlayerId>,
    pub protocol_version: Option<u32>,
    pub players: HashMap<PlayerId, PlayerSnapshot>,
    pub portals: Vec<PortalSnapshot>,
    pub chickens: BTreeMap<ChickenId, ChickenSnapshot>,
    pub money: i64,
    /// Number of snapshots applied so far.
    pub updates: u64,
}

impl WorldView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Id(id) => {
                info!("Assigned player id {}", id);
                self.player_id = Some(id);
            }
            ServerMessage::Version(version) => {
                if version != PROTOCOL_VERSION {
                    warn!(
                        "Server speaks protocol {}, this client speaks {}",
                        version, PROTOCOL_VERSION
                    );
                }
                self.protocol_version = Some(version);
            }
            ServerMessage::Players(players) => {
                self.players = players
                    .into_iter()
                    .map(|player| (player.id, player))
                    .collect();
            }
            ServerMessage::Portals(portals) => {
                self.portals = portals;
            }
            ServerMessage::Chickens(chickens) => {
                self.chickens = chickens
                    .into_iter()
                    .map(|chicken| (chicken.id, chicken))
                    .collect();
            }
            ServerMessage::ChickenUpdate(chicken) => {
                debug!("Chicken {} now {}", chicken.id, chicken.state.as_str());
                self.chickens.insert(chicken.id, chicken);
            }
            ServerMessage::Money(amount) => {
                info!("Balance is now {}", amount);
                self.money = amount;
            }
        }
        self.updates += 1;
    }

    pub fn local_player(&self) -> Option<&PlayerSnapshot> {
        self.player_id.and_then(|id| self.players.get(&id))
    }

    /// Players ordered by id, for stable drawing.
    pub fn sorted_players(&self) -> Vec<&PlayerSnapshot> {
        let mut players: Vec<&PlayerSnapshot> = self.players.values().collect();
        players.sort_by_key(|player| player.id);
        players
    }

    /// The closest living chicken the local player can reach, if any.
    pub fn chicken_in_reach(&self) -> Option<ChickenId> {
        let center = self.local_player()?.center();
        self.chickens
            .values()
            .filter(|chicken| chicken.is_alive())
            .map(|chicken| (chicken.id, distance(center, chicken.center())))
            .filter(|(_, d)| *d <= ATTACK_RANGE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }
}
