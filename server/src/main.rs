use clap::Parser;
use log::info;
use server::config::{ServerSettings, WorldConfig};
use server::network::{Server, ServerResult};
use shared::DEFAULT_PORT;
use std::path::PathBuf;
use std::time::Duration;

const MAX_TICK_RATE: i64 = 1000;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// World tick rate (updates per second, 1 to 1000)
    #[arg(
        short,
        long,
        default_value = "20",
        value_parser = clap::value_parser!(u32).range(1..=MAX_TICK_RATE)
    )]
    tick_rate: u32,

    /// Drop clients that stay silent this many seconds (0 disables)
    #[arg(short, long, default_value = "0")]
    idle_timeout: u64,

    /// JSON file describing spawn point, chickens and portals
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ServerResult<()> {
    env_logger::init();

    let args = Args::parse();

    let world = match &args.config {
        Some(path) => {
            info!("Loading world layout from {}", path.display());
            WorldConfig::load(path)?
        }
        None => WorldConfig::default(),
    };

    let settings = ServerSettings {
        tick_duration: Duration::from_secs_f64(1.0 / f64::from(args.tick_rate)),
        idle_timeout: (args.idle_timeout > 0).then(|| Duration::from_secs(args.idle_timeout)),
        world,
    };

    let address = format!("{}:{}", args.host, args.port);
    let server = Server::bind(&address, settings).await?;

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}
