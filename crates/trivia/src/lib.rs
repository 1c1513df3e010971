//! # Trivia
//!
//! Real-time multiplayer trivia over WebSockets.
//!
//! Players create or join a lobby, ready up, and play a fixed number of
//! rounds. Each round broadcasts one question; players guess a number,
//! and the guesses at or below the answer score by rank. Every lobby is a
//! single Tokio task that owns its players and timers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trivia::prelude::*;
//!
//! # async fn start() -> Result<(), TriviaError> {
//! let bank = QuestionBank::load("questions.json").await?;
//! let server = TriviaServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(bank)
//!     .await?;
//! server.run().await
//! # }
//! ```
//!
//! ## Connection flow
//!
//! A fresh connection speaks [`JoinRequest`](trivia_protocol::JoinRequest)
//! until it creates or joins a lobby. From then on the server sends
//! [`ServerMessage`](trivia_protocol::ServerMessage) frames and the client
//! sends `{"type": "ready" | "guess", "content": ...}` envelopes.

mod error;
mod handler;
mod server;

pub use error::TriviaError;
pub use server::{DEFAULT_HANDSHAKE_TIMEOUT, TriviaServer, TriviaServerBuilder};

/// Everything needed to run a server or write a client test.
pub mod prelude {
    pub use crate::{TriviaError, TriviaServer, TriviaServerBuilder};
    pub use trivia_lobby::{LobbyConfig, LobbyError, LobbyPhase};
    pub use trivia_protocol::{
        CategoryInfo, ClientMessage, Envelope, JoinRequest, JoinResponse, PlayerId, Question,
        RosterEntry, ScoreEntry, ServerMessage, SessionId,
    };
    pub use trivia_questions::{Category, QuestionBank, QuestionError, QuestionSource};
    pub use trivia_tick::TickConfig;
}
