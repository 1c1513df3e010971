//! Core protocol types for the trivia wire format.
//!
//! Every type here travels on the wire. Outbound messages are a closed
//! enumeration; inbound frames go through a two-step decode so that a
//! broken envelope (fatal to the connection) can be told apart from an
//! envelope with an unknown tag or bad content (logged and ignored).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of one game session (one lobby), e.g. `"ABCDE"`.
///
/// Serialized as a plain string thanks to `#[serde(transparent)]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Wraps a string as a session identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one connected player, unique among active players.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Wraps a string as a player identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrows the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Payload records
// ---------------------------------------------------------------------------

/// One trivia question. Immutable once fetched; scoped to a single round.
///
/// The correct answer is broadcast along with the prompt. Clients are
/// trusted not to peek.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// The prompt text. Stored as `question` in question files and on the wire.
    #[serde(rename = "question")]
    pub prompt: String,
    /// The correct numeric answer.
    pub answer: f64,
    /// Unit label for the answer ("km", "years", ...).
    #[serde(default)]
    pub unit: String,
    /// Attribution for the fact.
    #[serde(default)]
    pub source: String,
}

/// A question category as listed to clients before they create a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One row of a [`ServerMessage::RosterUpdate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
    pub score: u32,
}

/// One row of a [`ServerMessage::ScoreReveal`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub id: PlayerId,
    pub name: String,
    /// Cumulative score after this round.
    pub score: u32,
    /// Points gained this round.
    pub delta: u32,
    /// The guess the player had submitted when the window closed.
    pub guess: f64,
}

// ---------------------------------------------------------------------------
// ServerMessage - lobby → player
// ---------------------------------------------------------------------------

/// Everything the lobby ever sends to a player.
///
/// Adjacently tagged, so a frame looks like
/// `{"type": "RosterUpdate", "body": [...]}`. The set is closed: clients
/// can match on `type` exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body")]
pub enum ServerMessage {
    /// The session this connection was admitted into.
    SessionAssigned(SessionId),
    /// Current members in join order.
    RosterUpdate(Vec<RosterEntry>),
    /// The identifier assigned to this connection.
    PlayerIdAssigned(PlayerId),
    /// `"<n>..."` during the pre-game countdown, `"<n>"` during round
    /// and reveal timers, or `"Waiting"` when a countdown aborts.
    CountdownTick(String),
    /// The question for the round that just started.
    Question(Question),
    /// Per-player results of the round that just closed, in join order.
    ScoreReveal(Vec<ScoreEntry>),
    /// The last round has been revealed.
    GameOver(String),
    /// The host left (or the lobby failed); the session is over.
    SessionEnded(String),
}

impl ServerMessage {
    /// Body of the [`GameOver`](Self::GameOver) notice.
    pub const GAME_OVER: &'static str = "Game Over";
    /// Body of the [`SessionEnded`](Self::SessionEnded) notice.
    pub const SESSION_ENDED: &'static str = "Session Ended";
    /// Body of the countdown-aborted tick.
    pub const WAITING: &'static str = "Waiting";

    /// A pre-game countdown tick: `"3..."`.
    pub fn countdown(remaining: u32) -> Self {
        Self::CountdownTick(format!("{remaining}..."))
    }

    /// A round or reveal timer tick: `"17"`.
    pub fn timer(remaining: u32) -> Self {
        Self::CountdownTick(remaining.to_string())
    }

    /// The countdown was aborted because someone is no longer ready.
    pub fn waiting() -> Self {
        Self::CountdownTick(Self::WAITING.to_owned())
    }

    pub fn game_over() -> Self {
        Self::GameOver(Self::GAME_OVER.to_owned())
    }

    pub fn session_ended() -> Self {
        Self::SessionEnded(Self::SESSION_ENDED.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Envelope / ClientMessage - player → lobby
// ---------------------------------------------------------------------------

/// The type tag of an inbound envelope.
///
/// Older clients send a numeric code, newer ones a name; both are accepted
/// at the envelope level and resolved when converting to [`ClientMessage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageKind {
    Code(u64),
    Name(String),
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// The outer shape of every inbound frame: `{"type": ..., "content": ...}`.
///
/// `content` is either an object or a string holding JSON; both decode the
/// same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl Envelope {
    /// Builds an envelope with a named tag.
    pub fn new(kind: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            kind: MessageKind::Name(kind.into()),
            content,
        }
    }
}

/// A validated message from a player.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Toggle the sender's ready flag.
    Ready { status: bool },
    /// Submit a numeric guess for the open round.
    Guess { value: f64 },
}

#[derive(Deserialize)]
struct ReadyContent {
    status: bool,
}

#[derive(Deserialize)]
struct GuessContent {
    value: f64,
}

impl ClientMessage {
    /// Wire name of the ready toggle.
    pub const READY: &'static str = "ready";
    /// Wire name of a guess submission.
    pub const GUESS: &'static str = "guess";

    /// Converts this message back into an envelope (used by clients and tests).
    pub fn into_envelope(self) -> Envelope {
        match self {
            Self::Ready { status } => {
                Envelope::new(Self::READY, serde_json::json!({ "status": status }))
            }
            Self::Guess { value } => {
                Envelope::new(Self::GUESS, serde_json::json!({ "value": value }))
            }
        }
    }
}

impl TryFrom<Envelope> for ClientMessage {
    type Error = ProtocolError;

    fn try_from(envelope: Envelope) -> Result<Self, Self::Error> {
        let kind = match &envelope.kind {
            MessageKind::Code(0) => Self::READY,
            MessageKind::Code(1) => Self::GUESS,
            MessageKind::Name(name) if name.eq_ignore_ascii_case(Self::READY) => {
                Self::READY
            }
            MessageKind::Name(name) if name.eq_ignore_ascii_case(Self::GUESS) => {
                Self::GUESS
            }
            other => return Err(ProtocolError::UnknownType(other.to_string())),
        };

        let content = unwrap_content(kind, envelope.content)?;
        if kind == Self::READY {
            let ready: ReadyContent = parse_content(kind, content)?;
            Ok(Self::Ready {
                status: ready.status,
            })
        } else {
            let guess: GuessContent = parse_content(kind, content)?;
            if !guess.value.is_finite() {
                return Err(ProtocolError::InvalidContent {
                    kind,
                    reason: "guess must be a finite number".into(),
                });
            }
            Ok(Self::Guess { value: guess.value })
        }
    }
}

/// Content given as a JSON string is parsed one level deeper.
fn unwrap_content(
    kind: &'static str,
    content: serde_json::Value,
) -> Result<serde_json::Value, ProtocolError> {
    match content {
        serde_json::Value::String(raw) => {
            serde_json::from_str(&raw).map_err(|e| ProtocolError::InvalidContent {
                kind,
                reason: e.to_string(),
            })
        }
        other => Ok(other),
    }
}

fn parse_content<T: serde::de::DeserializeOwned>(
    kind: &'static str,
    content: serde_json::Value,
) -> Result<T, ProtocolError> {
    serde_json::from_value(content).map_err(|e| ProtocolError::InvalidContent {
        kind,
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Join boundary
// ---------------------------------------------------------------------------

/// The first frames on a fresh connection, before it belongs to a lobby.
///
/// Internally tagged: `{"type": "JoinGame", "session_id": "ABCDE", "name": "Ann"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JoinRequest {
    /// Create a new lobby for `category` and join it as host.
    CreateGame { name: String, category: String },
    /// Join an existing lobby.
    JoinGame { session_id: SessionId, name: String },
    /// List the categories a game can be created with.
    ListCategories,
    /// Ask whether a session is currently open.
    GameExists { session_id: SessionId },
}

/// Replies to a [`JoinRequest`] that did not (yet) admit the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JoinResponse {
    Categories { categories: Vec<CategoryInfo> },
    GameExists { exists: bool },
    /// `code` follows HTTP conventions: 400 for malformed requests,
    /// 404 for unknown sessions or categories.
    Rejected { code: u16, message: String },
}

// =========================================================================
// Tests
// =========================================================================
