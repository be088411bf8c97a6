//! Server configuration: runtime settings plus the world layout.
//!
//! The layout can be loaded from a JSON file; any field left out falls back to
//! the built-in default.

use serde::{Deserialize, Serialize};
use shared::{SPAWN_X, SPAWN_Y};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn as_tuple(self) -> (f32, f32) {
        (self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortalPairConfig {
    pub a: Point,
    pub b: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Where every new player appears.
    pub spawn: Point,
    pub chicken_count: usize,
    /// Centre of the chicken population.
    pub chicken_origin: Point,
    /// Maximum per-axis offset of a chicken from `chicken_origin`.
    pub chicken_jitter: f32,
    pub portals: Vec<PortalPairConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            spawn: Point::new(SPAWN_X, SPAWN_Y),
            chicken_count: 5,
            chicken_origin: Point::new(400.0, 300.0),
            chicken_jitter: 80.0,
            portals: vec![PortalPairConfig {
                a: Point::new(600.0, 100.0),
                b: Point::new(100.0, 450.0),
            }],
        }
    }
}

impl WorldConfig {
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&contents)?)
    }
}

/// Everything the listener needs besides the bind address.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Period of the world tick that advances timed state.
    pub tick_duration: Duration,
    /// Drop a connection that sends nothing for this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    pub world: WorldConfig,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            tick_duration: Duration::from_millis(50),
            idle_timeout: None,
            world: WorldConfig::default(),
        }
    }
}
