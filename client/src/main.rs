use clap::Parser;
use client::input::KeyState;
use client::network::{self, lock, Client, SharedKeys};
use client::rendering::Renderer;
use log::info;
use macroquad::prelude::*;
use macroquad::window::Conf;
use shared::INPUT_INTERVAL;
use std::sync::{Arc, Mutex};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Window width
    #[arg(short = 'w', long, default_value = "800")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "600")]
    height: usize,
}

/// Samples the devices into `keys`. Presses stay latched until the input
/// loop sends them.
fn sample_input(keys: &SharedKeys) {
    let up = is_key_down(KeyCode::W) || is_key_down(KeyCode::Up);
    let down = is_key_down(KeyCode::S) || is_key_down(KeyCode::Down);
    let left = is_key_down(KeyCode::A) || is_key_down(KeyCode::Left);
    let right = is_key_down(KeyCode::D) || is_key_down(KeyCode::Right);

    let mut keys = lock(keys);
    keys.set_held(up, down, left, right);
    if is_mouse_button_pressed(MouseButton::Left) || is_key_pressed(KeyCode::Space) {
        keys.attack_requested = true;
    }
    if is_key_pressed(KeyCode::T) {
        keys.teleport_requested = true;
    }
}

async fn render_loop(client: Client, keys: SharedKeys, mut renderer: Renderer) {
    loop {
        if is_key_pressed(KeyCode::Escape) {
            info!("Escape pressed, closing");
            break;
        }
        sample_input(&keys);
        renderer.render(&client.snapshot(), client.is_connected());
        next_frame().await;
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Controls: WASD/arrows to move, click or Space to attack, T to teleport");

    // Network tasks live on the runtime; the window owns the main thread.
    let runtime = tokio::runtime::Runtime::new()?;
    let client = runtime.block_on(Client::connect(&args.server))?;

    let keys: SharedKeys = Arc::new(Mutex::new(KeyState::default()));
    runtime.spawn(network::input_loop(
        keys.clone(),
        client.view(),
        client.sender(),
        INPUT_INTERVAL,
    ));

    let conf = Conf {
        window_title: "Meadow".to_owned(),
        window_width: args.width as i32,
        window_height: args.height as i32,
        window_resizable: false,
        ..Default::default()
    };
    let renderer = Renderer::new(args.width, args.height);
    macroquad::Window::from_config(conf, render_loop(client, keys, renderer));

    runtime.shutdown_background();
    Ok(())
}
