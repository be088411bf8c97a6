//! Server listener: accepts TCP clients and drives the world tick.

use crate::config::ServerSettings;
use crate::connection::Connection;
use crate::world::{SharedWorld, World};
use log::{debug, info};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::time::{interval, MissedTickBehavior};

pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Listener plus the world registry it owns.
pub struct Server {
    listener: TcpListener,
    world: SharedWorld,
    tick_duration: Duration,
    idle_timeout: Option<Duration>,
}

impl Server {
    /// Binds `addr` and seeds the world. A bind failure is returned to the
    /// caller; the server cannot start without its port.
    pub async fn bind(addr: &str, settings: ServerSettings) -> ServerResult<Self> {
        if settings.tick_duration.is_zero() {
            return Err("tick duration must be greater than zero".into());
        }

        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            world: World::shared(&settings.world),
            tick_duration: settings.tick_duration,
            idle_timeout: settings.idle_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn world(&self) -> SharedWorld {
        self.world.clone()
    }

    /// Spawns the task that advances timed state at a fixed rate.
    fn spawn_world_tick(&self) {
        let world = self.world.clone();
        let tick_duration = self.tick_duration;

        tokio::spawn(async move {
            let mut ticker = interval(tick_duration);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                world.lock().await.tick(Instant::now());
            }
        });
    }

    /// Accepts clients forever, one actor task each. Returns only when
    /// accepting fails.
    pub async fn run(self) -> ServerResult<()> {
        self.spawn_world_tick();
        info!("Server started successfully");

        loop {
            let (stream, addr) = self.listener.accept().await?;
            debug!("Accepted connection from {}", addr);
            tokio::spawn(Connection::serve(
                stream,
                addr,
                self.world.clone(),
                self.idle_timeout,
            ));
        }
    }
}
