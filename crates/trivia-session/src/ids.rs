//! Random identifiers for sessions and players.
//!
//! Session IDs are short so they can be read out loud and typed on a phone
//! ("ABCDE"). Player IDs never leave the client's own messages, so they
//! trade readability for a much larger space. Neither is a secret.
//!
//! Uniqueness among *active* sessions is the directory's job: it draws again
//! on a collision. Player IDs are long enough that the lobby's duplicate
//! check is a backstop, not a routine path.

use rand::Rng;
use rand::distr::Alphanumeric;
use trivia_protocol::{PlayerId, SessionId};

/// Length of a generated session ID.
pub const SESSION_ID_LEN: usize = 5;

/// Length of a generated player ID.
pub const PLAYER_ID_LEN: usize = 10;

const SESSION_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generates a fresh session ID of uppercase ASCII letters.
pub fn generate_session_id() -> SessionId {
    let mut rng = rand::rng();
    let id: String = (0..SESSION_ID_LEN)
        .map(|_| SESSION_ALPHABET[rng.random_range(0..SESSION_ALPHABET.len())] as char)
        .collect();
    SessionId(id)
}

/// Generates a fresh alphanumeric player ID.
pub fn generate_player_id() -> PlayerId {
    let id: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(PLAYER_ID_LEN)
        .map(char::from)
        .collect();
    PlayerId(id)
}
