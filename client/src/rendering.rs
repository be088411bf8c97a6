//! Macroquad drawing of the current world view and the HUD.

use crate::game::WorldView;
use macroquad::prelude::*;
use shared::{
    ChickenSnapshot, ChickenState, Direction, PlayerSnapshot, PlayerState, PortalSnapshot,
    CHICKEN_MAX_HEALTH, CHICKEN_SIZE, PLAYER_SIZE, PORTAL_SIZE,
};

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub connected: bool,
    pub player_label: Option<String>,
    pub money: i64,
    pub player_count: usize,
    pub chickens_alive: usize,
}

pub struct Renderer {
    width: f32,
    height: f32,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Renderer {
            width: width as f32,
            height: height as f32,
        }
    }

    /// Draws one frame: portals under chickens under players, then the HUD.
    pub fn render(&mut self, view: &WorldView, connected: bool) {
        clear_background(Color::from_rgba(58, 94, 52, 255));
        draw_rectangle_lines(0.0, 0.0, self.width, self.height, 2.0, DARKGREEN);

        for portal in &view.portals {
            self.draw_portal(portal);
        }
        for chicken in view.chickens.values() {
            self.draw_chicken(chicken);
        }
        for player in view.sorted_players() {
            let is_local_player = Some(player.id) == view.player_id;
            self.draw_player(player, is_local_player);
        }

        self.draw_ui(UiConfig {
            connected,
            player_label: view.player_id.map(|id| id.to_string()),
            money: view.money,
            player_count: view.players.len(),
            chickens_alive: view.chickens.values().filter(|c| c.is_alive()).count(),
        });
    }

    fn draw_portal(&mut self, portal: &PortalSnapshot) {
        let half = PORTAL_SIZE / 2.0;
        let color = Color::from_rgba(140, 80, 220, 255);
        draw_circle(portal.x + half, portal.y + half, half, color);
        draw_circle_lines(portal.x + half, portal.y + half, half, 2.0, WHITE);
        draw_text(&portal.id.to_string(), portal.x, portal.y - 4.0, 14.0, WHITE);
    }

    fn draw_chicken(&mut self, chicken: &ChickenSnapshot) {
        let color = match chicken.state {
            ChickenState::Idle => WHITE,
            ChickenState::Hit => Color::from_rgba(255, 120, 120, 255),
            ChickenState::Dead => return,
        };
        draw_rectangle(chicken.x, chicken.y, CHICKEN_SIZE, CHICKEN_SIZE, color);

        let filled = CHICKEN_SIZE * chicken.health as f32 / CHICKEN_MAX_HEALTH as f32;
        draw_rectangle(chicken.x, chicken.y - 5.0, CHICKEN_SIZE, 3.0, DARKGRAY);
        draw_rectangle(chicken.x, chicken.y - 5.0, filled, 3.0, RED);
    }

    fn draw_player(&mut self, player: &PlayerSnapshot, is_local_player: bool) {
        let color = match (is_local_player, player.state) {
            (_, PlayerState::Attack) => ORANGE,
            (true, _) => GREEN,
            (false, _) => Color::from_rgba(255, 68, 68, 255),
        };
        draw_rectangle(player.x, player.y, PLAYER_SIZE, PLAYER_SIZE, color);
        draw_rectangle_lines(player.x, player.y, PLAYER_SIZE, PLAYER_SIZE, 2.0, WHITE);

        self.draw_facing(player);
        draw_text(&player.id.to_string(), player.x, player.y - 6.0, 14.0, WHITE);
    }

    /// A short tick on the edge the player is facing.
    fn draw_facing(&mut self, player: &PlayerSnapshot) {
        let (cx, cy) = player.center();
        let half = PLAYER_SIZE / 2.0;
        let (x1, y1, x2, y2) = match player.direction {
            Direction::Up => (cx, cy - half, cx, cy - half - 6.0),
            Direction::Down => (cx, cy + half, cx, cy + half + 6.0),
            Direction::Left => (cx - half, cy, cx - half - 6.0, cy),
            Direction::Right => (cx + half, cy, cx + half + 6.0, cy),
        };
        draw_line(x1, y1, x2, y2, 2.0, YELLOW);
    }

    fn draw_ui(&mut self, config: UiConfig) {
        let y_start = 10.0;

        let connection_color = if config.connected { GREEN } else { RED };
        draw_rectangle(10.0, y_start, 8.0, 8.0, connection_color);
        let label = config.player_label.as_deref().unwrap_or("connecting");
        draw_text(label, 24.0, y_start + 8.0, 16.0, WHITE);

        let money_text = format!("Money: {}", config.money);
        draw_text(&money_text, 10.0, y_start + 28.0, 16.0, GOLD);

        let counts = format!(
            "{} players, {} chickens",
            config.player_count, config.chickens_alive
        );
        draw_text(&counts, 10.0, y_start + 46.0, 14.0, WHITE);

        draw_text(
            "WASD/arrows move, click attacks, T teleports",
            10.0,
            self.height - 10.0,
            14.0,
            LIGHTGRAY,
        );
    }
}
