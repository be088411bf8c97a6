//! Integration tests for the meadow server and client
//!
//! These run a real server on an ephemeral port and talk to it over TCP.

use assert_approx_eq::assert_approx_eq;
use client::network::{lock, Client};
use server::config::{Point, PortalPairConfig, ServerSettings, WorldConfig};
use server::network::Server;
use shared::{
    ChickenId, ChickenSnapshot, ChickenState, ClientMessage, Direction, PlayerId,
    PlayerSnapshot, ServerMessage, CHICKEN_MAX_HEALTH, CHICKEN_REWARD,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(3);

/// A world with nothing in it but the spawn point.
fn empty_world() -> WorldConfig {
    WorldConfig {
        chicken_count: 0,
        portals: Vec::new(),
        ..WorldConfig::default()
    }
}

async fn start_server(settings: ServerSettings) -> SocketAddr {
    let server = Server::bind("127.0.0.1:0", settings).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn start_with_world(world: WorldConfig) -> SocketAddr {
    start_server(ServerSettings {
        world,
        ..ServerSettings::default()
    })
    .await
}

/// A raw line-level peer.
struct Peer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Peer {
    async fn connect(addr: SocketAddr) -> (Self, PlayerId) {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, writer) = stream.into_split();
        let mut peer = Peer {
            lines: BufReader::new(read_half).lines(),
            writer,
        };
        let id = match peer.next_message().await {
            ServerMessage::Id(id) => id,
            other => panic!("expected ID first, got {:?}", other),
        };
        (peer, id)
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .unwrap();
    }

    async fn next_message(&mut self) -> ServerMessage {
        let line = timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a server line")
            .unwrap()
            .expect("server closed the connection");
        ServerMessage::decode(&line).unwrap()
    }

    /// Reads until a PLAYERS snapshot satisfies `pred`.
    async fn players_where<F>(&mut self, pred: F) -> Vec<PlayerSnapshot>
    where
        F: Fn(&[PlayerSnapshot]) -> bool,
    {
        loop {
            if let ServerMessage::Players(players) = self.next_message().await {
                if pred(&players) {
                    return players;
                }
            }
        }
    }

    async fn chicken_update_where<F>(&mut self, pred: F) -> ChickenSnapshot
    where
        F: Fn(&ChickenSnapshot) -> bool,
    {
        loop {
            if let ServerMessage::ChickenUpdate(chicken) = self.next_message().await {
                if pred(&chicken) {
                    return chicken;
                }
            }
        }
    }
}

fn find(players: &[PlayerSnapshot], id: PlayerId) -> Option<&PlayerSnapshot> {
    players.iter().find(|player| player.id == id)
}

mod session_tests {
    use super::*;

    /// A new connection is greeted in a fixed order.
    #[tokio::test]
    async fn join_sequence() {
        let addr = start_server(ServerSettings::default()).await;
        let (mut peer, id) = Peer::connect(addr).await;
        assert_eq!(id, PlayerId(1));

        assert!(matches!(peer.next_message().await, ServerMessage::Version(1)));
        match peer.next_message().await {
            ServerMessage::Players(players) => {
                assert_eq!(players.len(), 1);
                assert_eq!((players[0].x, players[0].y), (100.0, 100.0));
                assert_eq!(players[0].direction, Direction::Down);
            }
            other => panic!("expected PLAYERS, got {:?}", other),
        }
        match peer.next_message().await {
            ServerMessage::Portals(portals) => assert_eq!(portals.len(), 2),
            other => panic!("expected PORTALS, got {:?}", other),
        }
        match peer.next_message().await {
            ServerMessage::Chickens(chickens) => assert_eq!(chickens.len(), 5),
            other => panic!("expected CHICKENS, got {:?}", other),
        }
    }

    /// Two players see each other and every move.
    #[tokio::test]
    async fn two_players_share_moves() {
        let addr = start_with_world(empty_world()).await;
        let (mut first, p1) = Peer::connect(addr).await;
        let (mut second, p2) = Peer::connect(addr).await;
        assert_eq!((p1, p2), (PlayerId(1), PlayerId(2)));

        for _ in 0..4 {
            first.send("MOVE:right").await;
        }

        let seen = second
            .players_where(|players| find(players, p1).map_or(false, |p| p.x == 164.0))
            .await;
        assert_eq!(seen.len(), 2);
        let mover = find(&seen, p1).unwrap();
        assert_eq!(mover.direction, Direction::Right);
        assert_eq!(mover.y, 100.0);
        assert!(find(&seen, p2).is_some());

        first
            .players_where(|players| find(players, p1).map_or(false, |p| p.x == 164.0))
            .await;
    }

    #[tokio::test]
    async fn disconnect_removes_player() {
        let addr = start_with_world(empty_world()).await;
        let (first, p1) = Peer::connect(addr).await;
        let (mut second, p2) = Peer::connect(addr).await;
        second
            .players_where(|players| players.len() == 2)
            .await;

        drop(first);

        let remaining = second
            .players_where(|players| find(players, p1).is_none())
            .await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, p2);
    }

    #[tokio::test]
    async fn malformed_lines_are_ignored() {
        let addr = start_with_world(empty_world()).await;
        let (mut peer, id) = Peer::connect(addr).await;

        peer.send("GARBAGE").await;
        peer.send("MOVE:sideways").await;
        peer.send("CHICKEN_ATTACK:").await;
        peer.send("").await;
        peer.send("MOVE:down").await;

        let players = peer
            .players_where(|players| find(players, id).map_or(false, |p| p.y == 116.0))
            .await;
        assert_eq!(find(&players, id).unwrap().direction, Direction::Down);
    }

    #[tokio::test]
    async fn idle_connection_is_closed() {
        let addr = start_server(ServerSettings {
            idle_timeout: Some(Duration::from_millis(200)),
            world: empty_world(),
            ..ServerSettings::default()
        })
        .await;
        let (mut peer, _) = Peer::connect(addr).await;

        let closed = timeout(WAIT, async {
            loop {
                match peer.lines.next_line().await {
                    Ok(Some(_)) => continue,
                    _ => break,
                }
            }
        })
        .await;
        assert!(closed.is_ok(), "idle connection was never closed");
    }
}

mod gameplay_tests {
    use super::*;

    #[tokio::test]
    async fn teleport_then_cooldown() {
        let addr = start_with_world(WorldConfig {
            chicken_count: 0,
            portals: vec![PortalPairConfig {
                a: Point::new(110.0, 100.0),
                b: Point::new(500.0, 400.0),
            }],
            ..WorldConfig::default()
        })
        .await;
        let (mut peer, id) = Peer::connect(addr).await;

        peer.send("TELEPORT").await;
        let players = peer
            .players_where(|players| find(players, id).map_or(false, |p| p.x == 500.0))
            .await;
        assert_eq!(find(&players, id).unwrap().y, 400.0);

        // Standing on the far end, which is cooling down too.
        peer.send("TELEPORT").await;
        peer.send("MOVE:left").await;
        let players = peer
            .players_where(|players| find(players, id).map_or(false, |p| p.x != 500.0))
            .await;
        let me = find(&players, id).unwrap();
        assert_approx_eq!(me.x, 484.0);
        assert_approx_eq!(me.y, 400.0);
    }

    #[tokio::test]
    async fn killing_a_chicken_pays_out() {
        let addr = start_with_world(WorldConfig {
            chicken_count: 1,
            chicken_origin: Point::new(110.0, 100.0),
            chicken_jitter: 0.0,
            portals: Vec::new(),
            ..WorldConfig::default()
        })
        .await;
        let (mut peer, _) = Peer::connect(addr).await;

        for swing in 1..=CHICKEN_MAX_HEALTH {
            peer.send("ATTACK").await;
            peer.send("CHICKEN_ATTACK:C1").await;
            let chicken = peer
                .chicken_update_where(|c| c.health == CHICKEN_MAX_HEALTH - swing)
                .await;
            assert_eq!(chicken.id, ChickenId(1));
            if swing < CHICKEN_MAX_HEALTH {
                assert_eq!(chicken.state, ChickenState::Hit);
                // Wait out the swing and its cooldown.
                sleep(Duration::from_millis(800)).await;
            } else {
                assert_eq!(chicken.state, ChickenState::Dead);
            }
        }

        loop {
            if let ServerMessage::Money(amount) = peer.next_message().await {
                assert_eq!(amount, CHICKEN_REWARD);
                break;
            }
        }
    }

    #[tokio::test]
    async fn one_hit_per_swing() {
        let addr = start_with_world(WorldConfig {
            chicken_count: 1,
            chicken_origin: Point::new(110.0, 100.0),
            chicken_jitter: 0.0,
            portals: Vec::new(),
            ..WorldConfig::default()
        })
        .await;
        let (mut peer, _) = Peer::connect(addr).await;

        peer.send("ATTACK").await;
        peer.send("CHICKEN_ATTACK:C1").await;
        peer.send("CHICKEN_ATTACK:C1").await;
        peer.send("MOVE:down").await;

        let mut updates = Vec::new();
        loop {
            match peer.next_message().await {
                ServerMessage::ChickenUpdate(chicken) if chicken.state == ChickenState::Hit => {
                    updates.push(chicken.health)
                }
                ServerMessage::Players(players) if players[0].y == 116.0 => break,
                _ => {}
            }
        }
        assert_eq!(updates, vec![CHICKEN_MAX_HEALTH - 1]);
    }
}

mod client_tests {
    use super::*;

    async fn wait_until<F: Fn() -> bool>(cond: F) {
        timeout(WAIT, async {
            while !cond() {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("condition never became true");
    }

    #[tokio::test]
    async fn client_tracks_server_world() {
        let addr = start_server(ServerSettings::default()).await;
        let client = Client::connect(&addr.to_string()).await.unwrap();
        let view = client.view();

        wait_until(|| {
            let view = lock(&view);
            view.player_id.is_some() && view.chickens.len() == 5 && view.portals.len() == 2
        })
        .await;

        assert!(client.send(ClientMessage::Move(Direction::Right)));
        wait_until(|| lock(&view).local_player().map_or(false, |p| p.x == 116.0)).await;

        let snapshot = client.snapshot();
        assert_eq!(snapshot.player_id, Some(PlayerId(1)));
        assert_eq!(snapshot.protocol_version, Some(1));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn clients_see_each_other_leave() {
        let addr = start_with_world(empty_world()).await;
        let first = Client::connect(&addr.to_string()).await.unwrap();
        let second = Client::connect(&addr.to_string()).await.unwrap();
        let view = second.view();

        wait_until(|| lock(&view).players.len() == 2).await;
        drop(first);
        wait_until(|| lock(&view).players.len() == 1).await;
    }
}
