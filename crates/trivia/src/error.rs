//! Unified error type for the trivia server.

use trivia_lobby::LobbyError;
use trivia_protocol::ProtocolError;
use trivia_questions::QuestionError;
use trivia_session::SessionError;
use trivia_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates a `From` impl, so `?`
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TriviaError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, unknown message type).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Loading or drawing questions failed.
    #[error(transparent)]
    Questions(#[from] QuestionError),

    /// A player-session error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A lobby-level error (not found, closed, unknown category).
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The join handshake did not complete.
    #[error("handshake failed: {0}")]
    Handshake(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use trivia_protocol::SessionId;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let trivia_err: TriviaError = err.into();
        assert!(matches!(trivia_err, TriviaError::Transport(_)));
        assert!(trivia_err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownType("chat".into());
        let trivia_err: TriviaError = err.into();
        assert!(matches!(trivia_err, TriviaError::Protocol(_)));
    }

    #[test]
    fn test_from_question_error() {
        let err = QuestionError::EmptyCategory("General".into());
        let trivia_err: TriviaError = err.into();
        assert!(matches!(trivia_err, TriviaError::Questions(_)));
    }

    #[test]
    fn test_from_session_error() {
        let err = SessionError::LobbyUnavailable("ABCDE".into());
        let trivia_err: TriviaError = err.into();
        assert!(matches!(trivia_err, TriviaError::Session(_)));
    }

    #[test]
    fn test_from_lobby_error() {
        let err = LobbyError::NotFound(SessionId::new("ABCDE"));
        let trivia_err: TriviaError = err.into();
        assert!(matches!(trivia_err, TriviaError::Lobby(_)));
        assert!(trivia_err.to_string().contains("ABCDE"));
    }
}
