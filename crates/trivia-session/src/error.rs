//! Error types for the session layer.

use trivia_protocol::ProtocolError;
use trivia_transport::TransportError;

/// Errors raised by a [`PlayerSession`](crate::PlayerSession).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The underlying connection failed or is closed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The lobby this session belongs to is no longer accepting commands.
    #[error("lobby unavailable: {0}")]
    LobbyUnavailable(String),
}
