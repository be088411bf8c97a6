//! Windowless scripted client: connects, walks, swings, then reports what it
//! saw. Handy for poking a running server from a terminal.

use clap::Parser;
use client::network::{lock, Client};
use log::{info, warn};
use shared::{ClientMessage, Direction, INPUT_INTERVAL};
use tokio::time::sleep;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Direction to walk
    #[arg(short = 'd', long, default_value = "right")]
    direction: Direction,

    /// Number of steps to take
    #[arg(short = 'n', long, default_value = "10")]
    steps: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let client = Client::connect(&args.server).await?;
    let view = client.view();

    while lock(&view).player_id.is_none() {
        if !client.is_connected() {
            return Err("server closed the connection before assigning an id".into());
        }
        sleep(INPUT_INTERVAL).await;
    }

    for _ in 0..args.steps {
        if !client.send(ClientMessage::Move(args.direction)) {
            warn!("Connection lost while walking");
            break;
        }
        sleep(INPUT_INTERVAL).await;
    }
    client.send(ClientMessage::Stop);
    client.send(ClientMessage::Attack);
    if let Some(chicken) = lock(&view).chicken_in_reach() {
        client.send(ClientMessage::ChickenAttack(chicken));
    }
    sleep(INPUT_INTERVAL * 10).await;

    let view = client.snapshot();
    match view.local_player() {
        Some(me) => info!(
            "{} ended at ({}, {}) facing {} while {}",
            me.id,
            me.x,
            me.y,
            me.direction,
            me.state.as_str()
        ),
        None => warn!("No snapshot of the local player arrived"),
    }
    info!(
        "{} players, {} portals, {} chickens, money {}, {} updates",
        view.players.len(),
        view.portals.len(),
        view.chickens.len(),
        view.money,
        view.updates
    );
    Ok(())
}
