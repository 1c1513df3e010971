//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into a frame).
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The frame is not a well-formed message of the expected shape.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// The envelope decoded but its type tag is not one we accept.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// The type tag is known but the content does not fit it.
    #[error("invalid {kind} content: {reason}")]
    InvalidContent {
        /// The tag the content was parsed for.
        kind: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}
