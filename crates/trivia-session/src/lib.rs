//! Player sessions for trivia lobbies.
//!
//! A [`PlayerSession`] owns exactly one client's [`Connection`]:
//!
//! 1. **Outbound**: [`PlayerSession::send`] encodes a [`ServerMessage`] and
//!    writes it under a per-session guard, so broadcasts from the lobby and
//!    direct replies never interleave.
//! 2. **Inbound**: [`PlayerSession::run`] decodes envelopes and forwards
//!    them to the owning lobby through the [`LobbyInbox`] seam.
//! 3. **Cleanup**: when the receive loop ends for any reason, the lobby is
//!    told to remove the player and the connection is closed, exactly once.
//!
//! # How it fits in the stack
//!
//! ```text
//! Lobby (above)      ← implements LobbyInbox, holds Arc<PlayerSession>
//!     ↕
//! Session (this crate)
//!     ↕
//! Protocol + Transport (below)
//! ```
//!
//! [`Connection`]: trivia_transport::Connection
//! [`ServerMessage`]: trivia_protocol::ServerMessage

mod error;
mod ids;
mod inbox;
mod session;

pub use error::SessionError;
pub use ids::{generate_player_id, generate_session_id};
pub use inbox::LobbyInbox;
pub use session::{DisconnectReason, PlayerSession};
