//! The lobby engine for trivia games.
//!
//! Each lobby runs as an isolated Tokio task (actor model) that owns its
//! players, its ready gate, the round timers, and scoring. Everything else
//! talks to it through a [`LobbyHandle`].
//!
//! # Key types
//!
//! - [`LobbyHandle`]: send commands to a running lobby actor
//! - [`SessionDirectory`]: creates lobbies, maps session IDs to handles
//! - [`LobbyPhase`]: lifecycle state machine
//! - [`LobbyConfig`]: tick counts and channel sizing

#![allow(async_fn_in_trait)]

mod config;
mod directory;
mod error;
mod lobby;
pub mod scoring;

pub use config::{LobbyConfig, LobbyPhase};
pub use directory::SessionDirectory;
pub use error::LobbyError;
pub use lobby::{LobbyHandle, LobbyInfo};
