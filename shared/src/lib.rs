//! Types and constants shared by the server and the client.
//!
//! Everything that crosses the wire lives here: the world geometry, the
//! gameplay timings both sides need to agree on, the entity snapshots and the
//! line codec in [`protocol`].

use std::fmt;
use std::time::Duration;

pub mod protocol;

pub use protocol::{ClientMessage, DecodeError, ServerMessage, PROTOCOL_VERSION};

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;
pub const PLAYER_SIZE: f32 = 32.0;
pub const CHICKEN_SIZE: f32 = 24.0;
pub const PORTAL_SIZE: f32 = 40.0;
pub const STEP_SIZE: f32 = 16.0;

pub const SPAWN_X: f32 = 100.0;
pub const SPAWN_Y: f32 = 100.0;
pub const DEFAULT_PORT: u16 = 8080;

pub const ATTACK_DURATION: Duration = Duration::from_millis(400);
/// Extra wait after an attack ends before the next one is allowed.
pub const ATTACK_COOLDOWN: Duration = Duration::from_millis(300);
pub const ATTACK_RANGE: f32 = 48.0;
pub const ATTACK_DAMAGE: u32 = 1;

pub const CHICKEN_MAX_HEALTH: u32 = 3;
pub const CHICKEN_HIT_DURATION: Duration = Duration::from_millis(250);
pub const CHICKEN_RESPAWN: Duration = Duration::from_secs(5);
pub const CHICKEN_REWARD: i64 = 5;

pub const PORTAL_TRIGGER_DISTANCE: f32 = 40.0;
pub const PORTAL_COOLDOWN: Duration = Duration::from_millis(1500);

pub const INPUT_INTERVAL: Duration = Duration::from_millis(16);

/// Clamps a top-left position so an entity of `size` stays inside the world.
pub fn clamp_to_world(x: f32, y: f32, size: f32) -> (f32, f32) {
    (
        x.clamp(0.0, WORLD_WIDTH - size),
        y.clamp(0.0, WORLD_HEIGHT - size),
    )
}

pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub const PREFIX: &'static str = $prefix;
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", Self::PREFIX, self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.strip_prefix(Self::PREFIX)
                    .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
                    .and_then(|n| n.parse::<u32>().ok())
                    .map($name)
                    .ok_or_else(|| DecodeError::InvalidId(s.to_string()))
            }
        }
    };
}

entity_id!(
    /// Registry-issued player identity, `P<n>` on the wire.
    PlayerId,
    "P"
);
entity_id!(
    /// Chicken identity, `C<n>` on the wire.
    ChickenId,
    "C"
);
entity_id!(
    /// Portal identity, `PT<n>` on the wire.
    PortalId,
    "PT"
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit step for this direction. Screen coordinates, so up is negative y.
    pub fn delta(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(DecodeError::InvalidDirection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    Idle,
    Run,
    Attack,
}

impl PlayerState {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerState::Idle => "idle",
            PlayerState::Run => "run",
            PlayerState::Attack => "attack",
        }
    }
}

impl std::str::FromStr for PlayerState {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(PlayerState::Idle),
            "run" => Ok(PlayerState::Run),
            "attack" => Ok(PlayerState::Attack),
            other => Err(DecodeError::InvalidState(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChickenState {
    Idle,
    Hit,
    Dead,
}

impl ChickenState {
    pub fn as_str(self) -> &'static str {
        match self {
            ChickenState::Idle => "idle",
            ChickenState::Hit => "hit",
            ChickenState::Dead => "dead",
        }
    }
}

impl std::str::FromStr for ChickenState {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(ChickenState::Idle),
            "hit" => Ok(ChickenState::Hit),
            "dead" => Ok(ChickenState::Dead),
            other => Err(DecodeError::InvalidState(other.to_string())),
        }
    }
}

/// What every client sees of a player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub x: f32,
    pub y: f32,
    pub direction: Direction,
    pub state: PlayerState,
}

impl PlayerSnapshot {
    pub fn center(&self) -> (f32, f32) {
        (self.x + PLAYER_SIZE / 2.0, self.y + PLAYER_SIZE / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChickenSnapshot {
    pub id: ChickenId,
    pub x: f32,
    pub y: f32,
    pub health: u32,
    pub state: ChickenState,
}

impl ChickenSnapshot {
    pub fn center(&self) -> (f32, f32) {
        (self.x + CHICKEN_SIZE / 2.0, self.y + CHICKEN_SIZE / 2.0)
    }

    pub fn is_alive(&self) -> bool {
        self.state != ChickenState::Dead
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortalSnapshot {
    pub id: PortalId,
    pub x: f32,
    pub y: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub target_id: PortalId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_clamp_to_world() {
        assert_eq!(clamp_to_world(-5.0, -5.0, PLAYER_SIZE), (0.0, 0.0));
        assert_eq!(
            clamp_to_world(WORLD_WIDTH, WORLD_HEIGHT, PLAYER_SIZE),
            (WORLD_WIDTH - PLAYER_SIZE, WORLD_HEIGHT - PLAYER_SIZE)
        );
        assert_eq!(clamp_to_world(50.0, 60.0, PLAYER_SIZE), (50.0, 60.0));
    }

    #[test]
    fn test_distance() {
        assert_approx_eq!(distance((0.0, 0.0), (3.0, 4.0)), 5.0, 1e-6);
        assert_approx_eq!(distance((10.0, 10.0), (10.0, 10.0)), 0.0, 1e-6);
    }

    #[test]
    fn test_ids_display_and_parse() {
        assert_eq!(PlayerId(7).to_string(), "P7");
        assert_eq!("P7".parse::<PlayerId>().unwrap(), PlayerId(7));
        assert_eq!("PT3".parse::<PortalId>().unwrap(), PortalId(3));
        assert_eq!("C12".parse::<ChickenId>().unwrap(), ChickenId(12));

        assert!("7".parse::<PlayerId>().is_err());
        assert!("C1".parse::<PlayerId>().is_err());
        assert!("P-1".parse::<PlayerId>().is_err());
    }

    #[test]
    fn test_ids_must_be_canonical() {
        assert!("P+1".parse::<PlayerId>().is_err());
        assert!("C+1".parse::<ChickenId>().is_err());
        assert!("P 1".parse::<PlayerId>().is_err());
        assert!("P".parse::<PlayerId>().is_err());
        assert!("PT".parse::<PortalId>().is_err());
        assert_eq!("P007".parse::<PlayerId>().unwrap(), PlayerId(7));
    }

    #[test]
    fn test_direction_delta_is_unit() {
        for direction in Direction::ALL {
            let (dx, dy) = direction.delta();
            assert_approx_eq!((dx * dx + dy * dy).sqrt(), 1.0, 1e-6);
            assert_eq!(direction.as_str().parse::<Direction>().unwrap(), direction);
        }
    }

    #[test]
    fn test_unknown_state_names() {
        assert!("sleep".parse::<PlayerState>().is_err());
        assert!("RUN".parse::<PlayerState>().is_err());
        assert!("alive".parse::<ChickenState>().is_err());
    }
}
