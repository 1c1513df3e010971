//! Wire protocol for trivia lobbies.
//!
//! - **Identities** ([`SessionId`], [`PlayerId`]): short random strings.
//! - **Outbound** ([`ServerMessage`]): the closed set of messages the lobby
//!   sends to players.
//! - **Inbound** ([`Envelope`], [`ClientMessage`]): what players send; the
//!   envelope is decoded first, then its tag is matched exhaustively.
//! - **Join boundary** ([`JoinRequest`], [`JoinResponse`]): the handshake
//!   spoken before a connection belongs to a lobby.
//! - **Codec** ([`Codec`], [`JsonCodec`]): frames to values and back.
//!
//! ```text
//! Transport (text frames) → Protocol (messages) → Session / Lobby
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    CategoryInfo, ClientMessage, Envelope, JoinRequest, JoinResponse,
    MessageKind, PlayerId, Question, RosterEntry, ScoreEntry, ServerMessage,
    SessionId,
};
