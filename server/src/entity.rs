//! Authoritative entity state machines: players, chickens and portals.
//!
//! All timed transitions take the current [`Instant`] as a parameter so the
//! world tick, broadcasts and tests drive time explicitly.

use shared::{
    clamp_to_world, distance, ChickenId, ChickenSnapshot, ChickenState, Direction, PlayerId,
    PlayerSnapshot, PlayerState, PortalId, PortalSnapshot, ATTACK_COOLDOWN, ATTACK_DURATION,
    CHICKEN_HIT_DURATION, CHICKEN_MAX_HEALTH, CHICKEN_RESPAWN, CHICKEN_SIZE, PLAYER_SIZE,
    PORTAL_COOLDOWN, PORTAL_TRIGGER_DISTANCE, STEP_SIZE,
};
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    x: f32,
    y: f32,
    direction: Direction,
    state: PlayerState,
    last_attack: Option<Instant>,
    attack_ready: bool,
    /// Whether the current swing already damaged something.
    hit_landed: bool,
    money: i64,
}

impl Player {
    pub fn new(id: PlayerId, x: f32, y: f32) -> Self {
        let (x, y) = clamp_to_world(x, y, PLAYER_SIZE);
        Self {
            id,
            x,
            y,
            direction: Direction::Down,
            state: PlayerState::Idle,
            last_attack: None,
            attack_ready: true,
            hit_landed: false,
            money: 0,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + PLAYER_SIZE / 2.0, self.y + PLAYER_SIZE / 2.0)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn attack_ready(&self) -> bool {
        self.attack_ready
    }

    pub fn money(&self) -> i64 {
        self.money
    }

    pub fn set_money(&mut self, amount: i64) {
        self.money = amount;
    }

    pub fn add_money(&mut self, amount: i64) -> i64 {
        self.money = self.money.saturating_add(amount);
        self.money
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        let (x, y) = clamp_to_world(x, y, PLAYER_SIZE);
        self.x = x;
        self.y = y;
    }

    /// Steps one `STEP_SIZE` towards `direction`. Mid-attack the player still
    /// moves but keeps its facing and state.
    pub fn apply_move(&mut self, direction: Direction) {
        let (dx, dy) = direction.delta();
        self.set_position(self.x + dx * STEP_SIZE, self.y + dy * STEP_SIZE);

        if self.state != PlayerState::Attack {
            self.direction = direction;
            self.state = PlayerState::Run;
        }
    }

    pub fn stop(&mut self) {
        if self.state != PlayerState::Attack {
            self.state = PlayerState::Idle;
        }
    }

    /// Starts an attack if one is allowed. Returns whether it started.
    pub fn start_attack(&mut self, now: Instant) -> bool {
        if !self.attack_ready {
            return false;
        }
        self.state = PlayerState::Attack;
        self.last_attack = Some(now);
        self.attack_ready = false;
        self.hit_landed = false;
        true
    }

    /// Claims the current swing for a hit. Only the first claim per swing
    /// succeeds.
    pub fn claim_hit(&mut self) -> bool {
        if self.state != PlayerState::Attack || self.hit_landed {
            return false;
        }
        self.hit_landed = true;
        true
    }

    /// Advances timed state. Returns true when something visible changed.
    pub fn update(&mut self, now: Instant) -> bool {
        let Some(started) = self.last_attack else {
            return false;
        };
        let elapsed = now.saturating_duration_since(started);

        let mut changed = false;
        if self.state == PlayerState::Attack && elapsed >= ATTACK_DURATION {
            self.state = PlayerState::Idle;
            changed = true;
        }
        if !self.attack_ready && elapsed >= ATTACK_DURATION + ATTACK_COOLDOWN {
            self.attack_ready = true;
        }
        changed
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            id: self.id,
            x: self.x,
            y: self.y,
            direction: self.direction,
            state: self.state,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Chicken {
    pub id: ChickenId,
    origin: (f32, f32),
    x: f32,
    y: f32,
    health: u32,
    state: ChickenState,
    hit_at: Option<Instant>,
    died_at: Option<Instant>,
}

impl Chicken {
    pub fn new(id: ChickenId, x: f32, y: f32) -> Self {
        let (x, y) = clamp_to_world(x, y, CHICKEN_SIZE);
        Self {
            id,
            origin: (x, y),
            x,
            y,
            health: CHICKEN_MAX_HEALTH,
            state: ChickenState::Idle,
            hit_at: None,
            died_at: None,
        }
    }

    pub fn origin(&self) -> (f32, f32) {
        self.origin
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + CHICKEN_SIZE / 2.0, self.y + CHICKEN_SIZE / 2.0)
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn state(&self) -> ChickenState {
        self.state
    }

    pub fn is_dead(&self) -> bool {
        self.state == ChickenState::Dead
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        let (x, y) = clamp_to_world(x, y, CHICKEN_SIZE);
        self.x = x;
        self.y = y;
    }

    /// Applies damage. Returns false if the chicken was already dead.
    pub fn take_damage(&mut self, amount: u32, now: Instant) -> bool {
        if self.is_dead() {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.state = ChickenState::Dead;
            self.died_at = Some(now);
            self.hit_at = None;
        } else {
            self.state = ChickenState::Hit;
            self.hit_at = Some(now);
        }
        true
    }

    /// Runs the hit recovery and respawn timers. Returns true on a visible
    /// change.
    pub fn update(&mut self, now: Instant) -> bool {
        match self.state {
            ChickenState::Dead => {
                let respawn_due = self
                    .died_at
                    .map_or(true, |died| now.saturating_duration_since(died) >= CHICKEN_RESPAWN);
                if respawn_due {
                    self.respawn();
                    return true;
                }
                false
            }
            ChickenState::Hit => {
                let recovered = self
                    .hit_at
                    .map_or(true, |hit| now.saturating_duration_since(hit) >= CHICKEN_HIT_DURATION);
                if recovered {
                    self.state = ChickenState::Idle;
                    self.hit_at = None;
                    return true;
                }
                false
            }
            ChickenState::Idle => false,
        }
    }

    fn respawn(&mut self) {
        let (x, y) = self.origin;
        self.x = x;
        self.y = y;
        self.health = CHICKEN_MAX_HEALTH;
        self.state = ChickenState::Idle;
        self.died_at = None;
        self.hit_at = None;
    }

    pub fn snapshot(&self) -> ChickenSnapshot {
        ChickenSnapshot {
            id: self.id,
            x: self.x,
            y: self.y,
            health: self.health,
            state: self.state,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Portal {
    pub id: PortalId,
    x: f32,
    y: f32,
    target: (f32, f32),
    target_id: PortalId,
    last_used: Option<Instant>,
}

impl Portal {
    pub fn new(id: PortalId, position: (f32, f32), target_id: PortalId, target: (f32, f32)) -> Self {
        Self {
            id,
            x: position.0,
            y: position.1,
            target,
            target_id,
            last_used: None,
        }
    }

    /// Builds both ends of a pair, each targeting the other.
    pub fn pair(a_id: PortalId, a: (f32, f32), b_id: PortalId, b: (f32, f32)) -> (Portal, Portal) {
        (Portal::new(a_id, a, b_id, b), Portal::new(b_id, b, a_id, a))
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn target(&self) -> (f32, f32) {
        self.target
    }

    pub fn target_id(&self) -> PortalId {
        self.target_id
    }

    pub fn in_range(&self, position: (f32, f32)) -> bool {
        distance(position, (self.x, self.y)) < PORTAL_TRIGGER_DISTANCE
    }

    pub fn is_ready(&self, now: Instant) -> bool {
        self.last_used
            .map_or(true, |used| now.saturating_duration_since(used) >= PORTAL_COOLDOWN)
    }

    pub fn can_teleport(&self, player: &Player, now: Instant) -> bool {
        self.in_range(player.position()) && self.is_ready(now)
    }

    pub fn mark_used(&mut self, now: Instant) {
        self.last_used = Some(now);
    }

    /// Moves the player onto this portal's target.
    pub fn teleport_player(&self, player: &mut Player) {
        player.set_position(self.target.0, self.target.1);
    }

    pub fn snapshot(&self) -> PortalSnapshot {
        PortalSnapshot {
            id: self.id,
            x: self.x,
            y: self.y,
            target_x: self.target.0,
            target_y: self.target.1,
            target_id: self.target_id,
        }
    }
}
