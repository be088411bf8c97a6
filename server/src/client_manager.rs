//! Connected-client bookkeeping for the world registry.
//!
//! This module handles:
//! - Player identity allocation (monotonic, never reused within a server run)
//! - The broadcast fan-out list: one bounded outbound line queue per connection
//! - Delivery to a single client or to everyone
//!
//! Each queue is drained by that connection's writer task, so pushing a line
//! here never blocks on a socket. A client whose queue fills up has stopped
//! reading; it is evicted on the spot and its connection is told through the
//! eviction signal.

use log::{debug, info, warn};
use shared::PlayerId;
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};

/// Lines a connection may have waiting before it counts as stalled.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 512;

/// Registry end of one connection's outbound path.
#[derive(Debug)]
pub struct OutboundQueue {
    sender: mpsc::Sender<String>,
    /// Dropped together with the client; the connection side sees its
    /// receiver close.
    _evict: watch::Sender<()>,
}

/// Connection end of an outbound path.
#[derive(Debug)]
pub struct Outbox {
    pub lines: mpsc::Receiver<String>,
    /// Resolves with an error from `changed()` once the client has been
    /// removed from the roster.
    pub evicted: watch::Receiver<()>,
}

pub fn outbound_queue(capacity: usize) -> (OutboundQueue, Outbox) {
    let (sender, lines) = mpsc::channel(capacity);
    let (evict, evicted) = watch::channel(());
    let queue = OutboundQueue {
        sender,
        _evict: evict,
    };
    (queue, Outbox { lines, evicted })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Queued,
    /// The queue is full; the peer is not reading.
    Stalled,
    /// The writer task has already gone away.
    Closed,
}

/// Outbound side of one connection.
#[derive(Debug)]
pub struct Client {
    pub id: PlayerId,
    pub addr: SocketAddr,
    queue: OutboundQueue,
}

impl Client {
    pub fn new(id: PlayerId, addr: SocketAddr, queue: OutboundQueue) -> Self {
        Self { id, addr, queue }
    }

    /// Queues one line without waiting.
    pub fn send(&self, line: String) -> Delivery {
        match self.queue.sender.try_send(line) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Stalled,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }
}

pub struct ClientManager {
    clients: HashMap<PlayerId, Client>,
    next_client_id: u32,
    /// Evicted since the last `take_stalled`.
    stalled: Vec<PlayerId>,
}

impl ClientManager {
    /// Ids start at 1 and only ever grow.
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            stalled: Vec::new(),
        }
    }

    pub fn allocate_id(&mut self) -> PlayerId {
        let id = PlayerId(self.next_client_id);
        self.next_client_id += 1;
        id
    }

    pub fn add_client(&mut self, id: PlayerId, addr: SocketAddr, queue: OutboundQueue) {
        info!("Client {} connected from {}", id, addr);
        self.clients.insert(id, Client::new(id, addr, queue));
    }

    /// Returns true if the client was found and removed.
    pub fn remove_client(&mut self, id: &PlayerId) -> bool {
        if let Some(client) = self.clients.remove(id) {
            info!("Client {} disconnected ({})", client.id, client.addr);
            true
        } else {
            false
        }
    }

    pub fn send_to(&mut self, id: &PlayerId, line: String) -> bool {
        let delivery = match self.clients.get(id) {
            Some(client) => client.send(line),
            None => return false,
        };
        if delivery == Delivery::Stalled {
            self.evict(*id);
        }
        delivery == Delivery::Queued
    }

    /// Queues `line` for every client and returns how many accepted it.
    /// A closed queue is skipped; its actor removes it on the way out. A full
    /// queue gets its client evicted.
    pub fn broadcast(&mut self, line: &str) -> usize {
        let mut delivered = 0;
        let mut stalled = Vec::new();
        for client in self.clients.values() {
            match client.send(line.to_string()) {
                Delivery::Queued => delivered += 1,
                Delivery::Stalled => stalled.push(client.id),
                Delivery::Closed => debug!("Skipping closed queue for client {}", client.id),
            }
        }
        for id in stalled {
            self.evict(id);
        }
        delivered
    }

    fn evict(&mut self, id: PlayerId) {
        if let Some(client) = self.clients.remove(&id) {
            warn!(
                "Evicting client {} ({}): outbound queue full",
                client.id, client.addr
            );
            self.stalled.push(id);
        }
    }

    /// Clients evicted for stalling since the last call.
    pub fn take_stalled(&mut self) -> Vec<PlayerId> {
        std::mem::take(&mut self.stalled)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.clients.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl Default for ClientManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new();
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut manager = ClientManager::new();
        let first = manager.allocate_id();
        let second = manager.allocate_id();
        assert_eq!(first, PlayerId(1));
        assert_eq!(second, PlayerId(2));

        let (queue, _outbox) = outbound_queue(4);
        manager.add_client(first, test_addr(), queue);
        manager.remove_client(&first);
        assert_eq!(manager.allocate_id(), PlayerId(3));
    }

    #[test]
    fn test_add_and_remove_client() {
        let mut manager = ClientManager::new();
        let id = manager.allocate_id();
        let (queue, outbox) = outbound_queue(4);
        manager.add_client(id, test_addr(), queue);

        assert!(manager.contains(&id));
        assert_eq!(manager.len(), 1);
        assert!(!outbox.evicted.has_changed().unwrap());

        assert!(manager.remove_client(&id));
        assert!(!manager.remove_client(&id));
        assert!(manager.is_empty());
        assert!(outbox.evicted.has_changed().is_err());
    }

    #[test]
    fn test_send_to_single_client() {
        let mut manager = ClientManager::new();
        let (queue1, mut outbox1) = outbound_queue(4);
        let (queue2, mut outbox2) = outbound_queue(4);
        let id1 = manager.allocate_id();
        let id2 = manager.allocate_id();
        manager.add_client(id1, test_addr(), queue1);
        manager.add_client(id2, test_addr2(), queue2);

        assert!(manager.send_to(&id2, "MONEY:5".to_string()));
        assert!(!manager.send_to(&PlayerId(99), "MONEY:5".to_string()));

        assert_eq!(outbox2.lines.try_recv().unwrap(), "MONEY:5");
        assert!(outbox1.lines.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_skips_closed_queues() {
        let mut manager = ClientManager::new();
        let (queue1, mut outbox1) = outbound_queue(4);
        let (queue2, outbox2) = outbound_queue(4);
        let id1 = manager.allocate_id();
        let id2 = manager.allocate_id();
        manager.add_client(id1, test_addr(), queue1);
        manager.add_client(id2, test_addr2(), queue2);
        drop(outbox2);

        assert_eq!(manager.broadcast("PLAYERS:"), 1);
        assert_eq!(outbox1.lines.try_recv().unwrap(), "PLAYERS:");
        assert!(manager.contains(&id2));
        assert!(manager.take_stalled().is_empty());
    }

    #[test]
    fn test_undrained_client_is_evicted_when_full() {
        let mut manager = ClientManager::new();
        let (reader_queue, mut reader) = outbound_queue(2);
        let (stuck_queue, stuck) = outbound_queue(2);
        let reading = manager.allocate_id();
        let stuck_id = manager.allocate_id();
        manager.add_client(reading, test_addr(), reader_queue);
        manager.add_client(stuck_id, test_addr2(), stuck_queue);

        for _ in 0..2 {
            assert_eq!(manager.broadcast("PLAYERS:"), 2);
            reader.lines.try_recv().unwrap();
        }
        assert!(manager.take_stalled().is_empty());

        assert_eq!(manager.broadcast("PLAYERS:"), 1);
        assert!(!manager.contains(&stuck_id));
        assert!(manager.contains(&reading));
        assert_eq!(manager.take_stalled(), vec![stuck_id]);
        assert!(manager.take_stalled().is_empty());
        assert!(stuck.evicted.has_changed().is_err());

        // Later lines are not queued for the evicted client at all.
        assert_eq!(manager.broadcast("PLAYERS:"), 1);
        assert!(!manager.send_to(&stuck_id, "MONEY:1".to_string()));
    }

    #[test]
    fn test_send_to_full_queue_evicts() {
        let mut manager = ClientManager::new();
        let (queue, _outbox) = outbound_queue(1);
        let id = manager.allocate_id();
        manager.add_client(id, test_addr(), queue);

        assert!(manager.send_to(&id, "ID:P1".to_string()));
        assert!(!manager.send_to(&id, "VERSION:1".to_string()));
        assert!(manager.is_empty());
        assert_eq!(manager.take_stalled(), vec![id]);
    }
}
