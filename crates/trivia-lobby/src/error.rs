//! Error types for the lobby layer.

use trivia_protocol::{PlayerId, SessionId};

/// Errors that can occur during lobby operations.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// No lobby is registered under this session ID.
    #[error("session {0} not found")]
    NotFound(SessionId),

    /// A player with this ID is already a member.
    #[error("player {0} is already in the lobby")]
    AlreadyInLobby(PlayerId),

    /// The lobby's actor has stopped (host left, or a fatal error).
    #[error("session {0} is closed")]
    Closed(SessionId),

    /// The requested category is not offered by the question source.
    #[error("unknown category: {0}")]
    UnknownCategory(String),
}
