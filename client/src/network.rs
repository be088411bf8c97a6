//! Client network layer: one TCP connection, a read loop that folds server
//! lines into the shared [`WorldView`], a writer that drains the outbound
//! queue, and the fixed-interval input loop.

use crate::game::WorldView;
use crate::input::{InputManager, KeyState};
use log::{debug, error, info, warn};
use shared::{ClientMessage, ServerMessage};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub type ClientResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

pub type SharedView = Arc<Mutex<WorldView>>;
pub type SharedKeys = Arc<Mutex<KeyState>>;

/// Locks a shared value, recovering it if a panicking holder poisoned it.
pub fn lock<T>(shared: &Mutex<T>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Client {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    view: SharedView,
    reader: JoinHandle<()>,
    _writer: JoinHandle<()>,
}

impl Client {
    pub async fn connect(server_addr: &str) -> ClientResult<Self> {
        info!("Connecting to {}...", server_addr);
        let stream = TcpStream::connect(server_addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream))
    }

    /// Starts the read and write tasks on an already connected stream.
    pub fn from_stream(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        let view: SharedView = Arc::new(Mutex::new(WorldView::new()));
        let (outbound, rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(read_loop(BufReader::new(read_half), view.clone()));
        let writer = tokio::spawn(write_loop(write_half, rx));

        Self {
            outbound,
            view,
            reader,
            _writer: writer,
        }
    }

    /// Queues one command. Returns false once the connection is gone.
    pub fn send(&self, message: ClientMessage) -> bool {
        self.outbound.send(message).is_ok()
    }

    pub fn sender(&self) -> mpsc::UnboundedSender<ClientMessage> {
        self.outbound.clone()
    }

    pub fn view(&self) -> SharedView {
        self.view.clone()
    }

    /// A copy of the latest view, for rendering without holding the lock.
    pub fn snapshot(&self) -> WorldView {
        lock(&self.view).clone()
    }

    /// True until the server closes the connection.
    pub fn is_connected(&self) -> bool {
        !self.reader.is_finished()
    }
}

/// Reads server lines until EOF. Lines that fail to decode are dropped on
/// their own; the loop keeps going.
pub async fn read_loop<R: AsyncBufRead + Unpin>(reader: R, view: SharedView) {
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match ServerMessage::decode(&line) {
                    Ok(message) => lock(&view).apply(message),
                    Err(e) => warn!("Dropping server line {:?}: {}", line, e),
                }
            }
            Ok(None) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) => {
                error!("Error reading from server: {}", e);
                break;
            }
        }
    }
}

pub async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<ClientMessage>,
) {
    while let Some(message) = rx.recv().await {
        let mut line = message.encode();
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            error!("Error sending to server: {}", e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}

/// Every `period`, turns the current key state into commands and queues
/// them. Ends when the outbound queue closes.
pub async fn input_loop(
    keys: SharedKeys,
    view: SharedView,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    period: Duration,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut manager = InputManager::new();

    loop {
        ticker.tick().await;
        let commands = {
            let view = lock(&view);
            let mut keys = lock(&keys);
            manager.plan(&mut keys, &view)
        };
        for command in commands {
            if outbound.send(command).is_err() {
                debug!("Outbound queue closed after {} ticks", manager.ticks());
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Direction, PlayerId};
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_loop_classifies_lines() {
        let reader = Builder::new()
            .read(b"ID:P3\nVERSION:1\n")
            .read(b"PLAYERS:P3,100,100,down,idle;P4,10,20,up,run\n")
            .read(b"PORTALS:PT1,600,100,100,450,PT2;PT2,100,450,600,100,PT1\n")
            .read(b"CHICKENS:C1,400,300,3,idle\nCHICKEN_UPDATE:C1,400,300,2,hit\n")
            .read(b"MONEY:25\n")
            .build();
        let view: SharedView = Arc::new(Mutex::new(WorldView::new()));

        read_loop(BufReader::new(reader), view.clone()).await;

        let view = lock(&view);
        assert_eq!(view.player_id, Some(PlayerId(3)));
        assert_eq!(view.protocol_version, Some(1));
        assert_eq!(view.players.len(), 2);
        assert_eq!(view.local_player().unwrap().x, 100.0);
        assert_eq!(view.portals.len(), 2);
        assert_eq!(view.chickens.len(), 1);
        assert_eq!(view.chickens.values().next().unwrap().health, 2);
        assert_eq!(view.money, 25);
    }

    #[tokio::test]
    async fn test_read_loop_drops_only_bad_lines() {
        let reader = Builder::new()
            .read(b"PLAYERS:P1,100,100,down,idle\n")
            .read(b"PLAYERS:P1,oops,100,down,idle\n")
            .read(b"WEATHER:rain\n\n")
            .read(b"PLAYERS:P1,116,100,right,run\n")
            .build();
        let view: SharedView = Arc::new(Mutex::new(WorldView::new()));

        read_loop(BufReader::new(reader), view.clone()).await;

        let view = lock(&view);
        assert_eq!(view.updates, 2);
        assert_eq!(view.players[&PlayerId(1)].x, 116.0);
    }

    #[tokio::test]
    async fn test_write_loop_sends_lines() {
        let writer = Builder::new()
            .write(b"MOVE:up\n")
            .write(b"ATTACK\n")
            .build();
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ClientMessage::Move(Direction::Up)).unwrap();
        tx.send(ClientMessage::Attack).unwrap();
        drop(tx);

        write_loop(writer, rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_loop_sends_each_tick() {
        let keys: SharedKeys = Arc::new(Mutex::new(KeyState::default()));
        let view: SharedView = Arc::new(Mutex::new(WorldView::new()));
        lock(&view).apply(ServerMessage::Id(PlayerId(1)));
        lock(&keys).right = true;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(input_loop(
            keys.clone(),
            view.clone(),
            tx,
            Duration::from_millis(16),
        ));

        for _ in 0..3 {
            assert_eq!(rx.recv().await, Some(ClientMessage::Move(Direction::Right)));
        }

        lock(&keys).right = false;
        lock(&keys).attack_requested = true;
        let mut seen = Vec::new();
        while seen.last() != Some(&ClientMessage::Stop) {
            seen.push(rx.recv().await.unwrap());
        }
        assert!(seen.contains(&ClientMessage::Attack));

        drop(rx);
        handle.await.unwrap();
    }
}
