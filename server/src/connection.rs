//! Per-client connection actor.
//!
//! One actor owns one socket and one player. The read half is driven line by
//! line here; the write half belongs to a writer task fed through the queue
//! registered in the [`ClientManager`](crate::client_manager::ClientManager).

use crate::client_manager::{outbound_queue, OUTBOUND_QUEUE_CAPACITY};
use crate::world::SharedWorld;
use log::{debug, info, warn};
use shared::{ClientMessage, PlayerId};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

/// Why a connection actor stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disconnect {
    Closed,
    IdleTimeout,
    /// Removed by the registry for not reading its queue.
    Evicted,
    ReadError(String),
}

pub struct Connection {
    id: PlayerId,
    addr: SocketAddr,
    world: SharedWorld,
    idle_timeout: Option<Duration>,
    evicted: watch::Receiver<()>,
}

impl Connection {
    /// Registers the player for `stream` and starts its writer task.
    pub async fn accept(
        stream: TcpStream,
        addr: SocketAddr,
        world: SharedWorld,
        idle_timeout: Option<Duration>,
    ) -> (Self, BufReader<tokio::net::tcp::OwnedReadHalf>) {
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not set TCP_NODELAY for {}: {}", addr, e);
        }
        let (read_half, write_half) = stream.into_split();
        let (queue, outbox) = outbound_queue(OUTBOUND_QUEUE_CAPACITY);
        tokio::spawn(write_lines(write_half, outbox.lines, outbox.evicted.clone()));

        let id = world.lock().await.join(addr, queue, Instant::now());
        let connection = Self {
            id,
            addr,
            world,
            idle_timeout,
            evicted: outbox.evicted,
        };
        (connection, BufReader::new(read_half))
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// Full actor lifetime for an accepted socket.
    pub async fn serve(
        stream: TcpStream,
        addr: SocketAddr,
        world: SharedWorld,
        idle_timeout: Option<Duration>,
    ) {
        let (connection, reader) = Self::accept(stream, addr, world, idle_timeout).await;
        let reason = connection.run(reader).await;
        info!(
            "Player {} at {} leaving: {:?}",
            connection.id, connection.addr, reason
        );
        connection.close().await;
    }

    /// Reads and applies lines until the peer goes away or the registry
    /// evicts it.
    pub async fn run<R: AsyncBufRead + Unpin>(&self, reader: R) -> Disconnect {
        let mut lines = reader.lines();
        let mut evicted = self.evicted.clone();
        loop {
            let read = async {
                match self.idle_timeout {
                    Some(limit) => timeout(limit, lines.next_line()).await.ok(),
                    None => Some(lines.next_line().await),
                }
            };
            let next = tokio::select! {
                next = read => match next {
                    Some(result) => result,
                    None => return Disconnect::IdleTimeout,
                },
                // Nothing is ever sent on it; this fires when the sender drops.
                _ = evicted.changed() => return Disconnect::Evicted,
            };

            match next {
                Ok(Some(line)) => self.handle_line(&line).await,
                Ok(None) => return Disconnect::Closed,
                Err(e) => {
                    warn!("Read error from player {}: {}", self.id, e);
                    return Disconnect::ReadError(e.to_string());
                }
            }
        }
    }

    async fn handle_line(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        match ClientMessage::decode(line) {
            Ok(message) => {
                self.world
                    .lock()
                    .await
                    .handle(self.id, message, Instant::now());
            }
            Err(e) => debug!("Ignoring line from player {}: {}", self.id, e),
        }
    }

    /// Removes the player and its queue; the writer task ends once the queue
    /// is dropped.
    pub async fn close(self) {
        self.world.lock().await.leave(self.id, Instant::now());
    }
}

/// Drains a connection's outbound queue onto its socket. Stops early, even
/// mid-write, once the client is evicted.
pub async fn write_lines<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::Receiver<String>,
    mut evicted: watch::Receiver<()>,
) {
    loop {
        let line = tokio::select! {
            line = rx.recv() => match line {
                Some(line) => line,
                None => break,
            },
            _ = evicted.changed() => break,
        };
        let mut bytes = line.into_bytes();
        bytes.push(b'\n');
        tokio::select! {
            result = writer.write_all(&bytes) => {
                if let Err(e) = result {
                    debug!("Write failed, stopping writer: {}", e);
                    break;
                }
            }
            _ = evicted.changed() => {
                debug!("Client evicted mid-write, stopping writer");
                break;
            }
        }
    }
    let _ = writer.shutdown().await;
}
