//! The seam between a player's receive loop and its lobby.
//!
//! The session layer does not know how a lobby is implemented. It only
//! needs somewhere to forward the three things a connection can cause:
//! a ready toggle, a guess, and its own departure. [`LobbyInbox`] is that
//! somewhere. The lobby crate implements it for its handle; tests implement
//! it with a recorder.

use trivia_protocol::PlayerId;

/// Where a [`PlayerSession`](crate::PlayerSession) sends what its player did.
///
/// Every method is a command for the lobby's serialized command stream.
/// An `Err` means the lobby is gone; the receive loop stops on it.
pub trait LobbyInbox: Send + Sync + 'static {
    /// Error returned when the lobby cannot take the command.
    type Error: std::error::Error + Send + Sync + 'static;

    /// The player toggled their ready flag.
    fn set_ready(
        &self,
        player: &PlayerId,
        ready: bool,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    /// The player submitted a guess for the open round.
    fn submit_guess(
        &self,
        player: &PlayerId,
        value: f64,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;

    /// The player's connection is gone; drop them from the lobby.
    fn remove(
        &self,
        player: &PlayerId,
    ) -> impl std::future::Future<Output = Result<(), Self::Error>> + Send;
}
