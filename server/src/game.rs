//! Entity half of the world registry: players, chickens and portals, and the
//! rules that tie them together.

use crate::config::WorldConfig;
use crate::entity::{Chicken, Player, Portal};
use log::{debug, info};
use rand::Rng;
use shared::{
    distance, ChickenId, ChickenSnapshot, Direction, PlayerId, PlayerSnapshot, PortalId,
    PortalSnapshot, ATTACK_DAMAGE, ATTACK_RANGE, CHICKEN_REWARD,
};
use std::collections::HashMap;
use std::time::Instant;

/// Result of a landed chicken hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ChickenHit {
    pub chicken: ChickenSnapshot,
    /// The attacker's new balance when the hit was a kill.
    pub reward_balance: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct GameState {
    spawn: (f32, f32),
    players: HashMap<PlayerId, Player>,
    chickens: Vec<Chicken>,
    portals: Vec<Portal>,
}

impl GameState {
    /// Seeds the fixed chicken population and the portal pairs.
    pub fn new(config: &WorldConfig) -> Self {
        let mut rng = rand::thread_rng();
        let jitter = config.chicken_jitter.abs();
        let origin = config.chicken_origin;

        let chickens = (1..=config.chicken_count as u32)
            .map(|n| {
                let x = origin.x + rng.gen_range(-jitter..=jitter);
                let y = origin.y + rng.gen_range(-jitter..=jitter);
                Chicken::new(ChickenId(n), x, y)
            })
            .collect();

        let mut portals = Vec::with_capacity(config.portals.len() * 2);
        for (i, pair) in config.portals.iter().enumerate() {
            let a_id = PortalId(i as u32 * 2 + 1);
            let b_id = PortalId(i as u32 * 2 + 2);
            let (a, b) = Portal::pair(a_id, pair.a.as_tuple(), b_id, pair.b.as_tuple());
            portals.push(a);
            portals.push(b);
        }

        info!(
            "Seeded {} chickens and {} portals",
            config.chicken_count,
            portals.len()
        );

        Self {
            spawn: config.spawn.as_tuple(),
            players: HashMap::new(),
            chickens,
            portals,
        }
    }

    pub fn add_player(&mut self, id: PlayerId) {
        let player = Player::new(id, self.spawn.0, self.spawn.1);
        info!("Added player {} at {:?}", id, player.position());
        self.players.insert(id, player);
    }

    pub fn remove_player(&mut self, id: &PlayerId) -> Option<Player> {
        let removed = self.players.remove(id);
        if removed.is_some() {
            info!("Removed player {}", id);
        }
        removed
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn chickens(&self) -> &[Chicken] {
        &self.chickens
    }

    pub fn chicken_mut(&mut self, id: ChickenId) -> Option<&mut Chicken> {
        self.chickens.iter_mut().find(|chicken| chicken.id == id)
    }

    pub fn portals(&self) -> &[Portal] {
        &self.portals
    }

    pub fn move_player(&mut self, id: PlayerId, direction: Direction) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.apply_move(direction);
                true
            }
            None => false,
        }
    }

    pub fn stop_player(&mut self, id: PlayerId) -> bool {
        match self.players.get_mut(&id) {
            Some(player) => {
                player.stop();
                true
            }
            None => false,
        }
    }

    pub fn start_attack(&mut self, id: PlayerId, now: Instant) -> bool {
        self.players
            .get_mut(&id)
            .map_or(false, |player| player.start_attack(now))
    }

    pub fn set_money(&mut self, id: PlayerId, amount: i64) {
        if let Some(player) = self.players.get_mut(&id) {
            player.set_money(amount);
        }
    }

    /// Teleports through the first portal in range and off cooldown. Both ends
    /// of the pair start cooling down so the player is not bounced straight
    /// back.
    pub fn teleport(&mut self, id: PlayerId, now: Instant) -> bool {
        let Some(player) = self.players.get_mut(&id) else {
            return false;
        };
        let Some(index) = self
            .portals
            .iter()
            .position(|portal| portal.can_teleport(player, now))
        else {
            debug!("Player {} asked to teleport with no portal ready", id);
            return false;
        };

        let portal = &self.portals[index];
        let target_id = portal.target_id();
        portal.teleport_player(player);
        info!(
            "Player {} teleported through {} to {:?}",
            id,
            portal.id,
            player.position()
        );

        for portal in &mut self.portals {
            if portal.id == target_id || portal.target_id() == target_id {
                portal.mark_used(now);
            }
        }
        true
    }

    /// Applies a swing from `id` to a chicken. The player must be mid-attack,
    /// must not have landed a hit this swing and must be within reach.
    pub fn attack_chicken(
        &mut self,
        id: PlayerId,
        chicken_id: ChickenId,
        now: Instant,
    ) -> Option<ChickenHit> {
        let player = self.players.get_mut(&id)?;
        let chicken = self
            .chickens
            .iter_mut()
            .find(|chicken| chicken.id == chicken_id)?;

        if chicken.is_dead() || distance(player.center(), chicken.center()) > ATTACK_RANGE {
            return None;
        }
        if !player.claim_hit() {
            return None;
        }

        chicken.take_damage(ATTACK_DAMAGE, now);
        let reward_balance = if chicken.is_dead() {
            info!("Player {} killed chicken {}", id, chicken_id);
            Some(player.add_money(CHICKEN_REWARD))
        } else {
            None
        };

        Some(ChickenHit {
            chicken: chicken.snapshot(),
            reward_balance,
        })
    }

    /// Advances every player's timers. Returns true if any of them changed.
    pub fn advance_players(&mut self, now: Instant) -> bool {
        self.players
            .values_mut()
            .fold(false, |changed, player| player.update(now) | changed)
    }

    /// Advances chicken timers and returns the chickens that changed.
    pub fn advance_chickens(&mut self, now: Instant) -> Vec<ChickenSnapshot> {
        self.chickens
            .iter_mut()
            .filter_map(|chicken| chicken.update(now).then(|| chicken.snapshot()))
            .collect()
    }

    /// Player snapshots ordered by id.
    pub fn player_snapshots(&self) -> Vec<PlayerSnapshot> {
        let mut players: Vec<PlayerSnapshot> =
            self.players.values().map(Player::snapshot).collect();
        players.sort_by_key(|player| player.id);
        players
    }

    pub fn chicken_snapshots(&self) -> Vec<ChickenSnapshot> {
        self.chickens.iter().map(Chicken::snapshot).collect()
    }

    pub fn portal_snapshots(&self) -> Vec<PortalSnapshot> {
        self.portals.iter().map(Portal::snapshot).collect()
    }
}
