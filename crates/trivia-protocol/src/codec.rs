//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust types and the text frames a
//! [`Connection`](https://docs.rs/trivia-transport) carries. Sessions and
//! the join handshake only go through this trait, so the wire encoding can
//! be swapped without touching them.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to text frames and decodes them back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into one text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes one text frame.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the frame is malformed or does
    /// not match `T`.
    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ```rust
/// use trivia_protocol::{Codec, JsonCodec, ServerMessage};
///
/// let codec = JsonCodec;
/// let frame = codec.encode(&ServerMessage::waiting()).unwrap();
/// assert_eq!(frame, r#"{"type":"CountdownTick","body":"Waiting"}"#);
///
/// let decoded: ServerMessage = codec.decode(&frame).unwrap();
/// assert_eq!(decoded, ServerMessage::waiting());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, frame: &str) -> Result<T, ProtocolError> {
        serde_json::from_str(frame).map_err(ProtocolError::Decode)
    }
}
