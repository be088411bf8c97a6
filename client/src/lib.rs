//! # Meadow Client Library
//!
//! Client side of the meadow world: a thin terminal onto the server.
//!
//! The server owns every rule. The client keeps no simulation of its own; it
//! sends one movement command per input tick, latches attack and teleport
//! presses until they are sent, and draws whatever the latest snapshots say.
//!
//! ## Modules
//!
//! - [`game`]: the [`WorldView`](game::WorldView) rebuilt from server lines.
//! - [`input`]: held keys and the commands they produce each tick.
//! - [`network`]: the TCP connection, read and write loops, and the input loop.
//! - [`rendering`]: macroquad drawing of the view.

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
