//! # World Server Library
//!
//! Authoritative server for the shared meadow world. It owns the single truth
//! about connected players, the chicken population and the portal network,
//! and pushes full snapshots to every client after each change.
//!
//! ## Architecture
//!
//! ### One registry, one lock
//! [`world::World`] holds the entities ([`game::GameState`]) and the broadcast
//! fan-out list ([`client_manager::ClientManager`]). It lives behind a single
//! `tokio::sync::Mutex`; every mutation and the snapshot broadcast that
//! follows it happen under one lock acquisition, so clients never observe a
//! half-applied change and all of them see broadcasts in the same order.
//!
//! ### Actor per connection
//! [`connection::Connection`] owns one TCP socket and one player. It reads
//! newline-terminated commands, applies them to the registry and lets a
//! dedicated writer task flush outbound lines, so a slow socket never holds
//! the lock.
//!
//! ### World tick
//! [`network::Server`] runs a fixed-rate tick next to the accept loop. The
//! tick resolves timed transitions (attack expiry, chicken recovery and
//! respawn) even when nobody is sending input.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerSettings;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let server = Server::bind("127.0.0.1:8080", ServerSettings::default()).await?;
//!     server.run().await
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod connection;
pub mod entity;
pub mod game;
pub mod network;
pub mod world;
