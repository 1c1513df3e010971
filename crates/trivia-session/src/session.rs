//! The player session: one client's connection, as the lobby sees it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use trivia_protocol::{ClientMessage, Codec, Envelope, JsonCodec, PlayerId, ServerMessage};
use trivia_transport::{Connection, ConnectionId};

use crate::{LobbyInbox, SessionError};

/// Why a receive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The client closed the connection cleanly (or it was closed locally).
    Closed,
    /// Receiving from the connection failed.
    Transport,
    /// A frame was not a well-formed envelope.
    Decode,
    /// The lobby stopped accepting commands.
    LobbyClosed,
}

/// One connected player.
///
/// Shared as `Arc<PlayerSession<C>>` between the lobby (which sends) and
/// the connection task (which runs [`run`](Self::run)).
pub struct PlayerSession<C: Connection> {
    id: PlayerId,
    name: String,
    conn: C,
    codec: JsonCodec,
    /// Held for the duration of each outbound write.
    write_guard: Mutex<()>,
    /// Set once the remove-and-close cleanup has been claimed.
    finished: AtomicBool,
}

impl<C: Connection> PlayerSession<C> {
    /// Wraps an established connection.
    pub fn new(id: PlayerId, name: impl Into<String>, conn: C) -> Self {
        Self {
            id,
            name: name.into(),
            conn,
            codec: JsonCodec,
            write_guard: Mutex::new(()),
            finished: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.conn.id()
    }

    /// Returns `true` once cleanup has run (or been scheduled).
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Encodes and writes one message.
    ///
    /// # Errors
    /// [`SessionError::Transport`] if the connection is closed or the write
    /// fails. Callers broadcasting to many players log this and move on.
    pub async fn send(&self, message: &ServerMessage) -> Result<(), SessionError> {
        let frame = self.codec.encode(message)?;
        let _guard = self.write_guard.lock().await;
        self.conn.send(&frame).await?;
        Ok(())
    }

    /// Closes the underlying connection.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.conn.close().await?;
        Ok(())
    }

    /// Runs the receive loop until the connection ends, then removes the
    /// player from `inbox` and closes the connection.
    ///
    /// Cleanup happens exactly once on every exit path. If the task running
    /// this future is cancelled, a drop guard schedules the same cleanup on
    /// the current runtime.
    pub async fn run<I: LobbyInbox + Clone>(self: Arc<Self>, inbox: I) -> DisconnectReason {
        let mut guard = CleanupGuard {
            session: Arc::clone(&self),
            inbox: Some(inbox.clone()),
        };
        let reason = self.receive_frames(&inbox).await;
        guard.finish(reason).await;
        reason
    }

    async fn receive_frames<I: LobbyInbox>(&self, inbox: &I) -> DisconnectReason {
        let player_id = &self.id;
        loop {
            let frame = match self.conn.recv().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!(%player_id, "connection closed");
                    return DisconnectReason::Closed;
                }
                Err(e) => {
                    tracing::debug!(%player_id, error = %e, "recv error");
                    return DisconnectReason::Transport;
                }
            };

            let envelope: Envelope = match self.codec.decode(&frame) {
                Ok(envelope) => envelope,
                Err(e) => {
                    tracing::warn!(%player_id, error = %e, "undecodable envelope, disconnecting");
                    return DisconnectReason::Decode;
                }
            };

            let message = match ClientMessage::try_from(envelope) {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!(%player_id, error = %e, "ignoring inbound message");
                    continue;
                }
            };
            tracing::debug!(%player_id, ?message, "inbound message");

            let forwarded = match message {
                ClientMessage::Ready { status } => inbox.set_ready(player_id, status).await,
                ClientMessage::Guess { value } => inbox.submit_guess(player_id, value).await,
            };
            if let Err(e) = forwarded {
                tracing::debug!(%player_id, error = %e, "lobby no longer reachable");
                return DisconnectReason::LobbyClosed;
            }
        }
    }
}

/// Runs the remove-and-close cleanup for a session exactly once.
struct CleanupGuard<C: Connection, I: LobbyInbox> {
    session: Arc<PlayerSession<C>>,
    inbox: Option<I>,
}

impl<C: Connection, I: LobbyInbox> CleanupGuard<C, I> {
    async fn finish(&mut self, reason: DisconnectReason) {
        let Some(inbox) = self.claim() else {
            return;
        };
        let player_id = self.session.id();
        if let Err(e) = inbox.remove(player_id).await {
            tracing::debug!(%player_id, error = %e, "remove after disconnect failed");
        }
        if let Err(e) = self.session.close().await {
            tracing::debug!(%player_id, error = %e, "close after disconnect failed");
        }
        tracing::info!(%player_id, ?reason, "player session ended");
    }

    /// Takes the inbox if this guard is the first to claim cleanup.
    fn claim(&mut self) -> Option<I> {
        if self.session.finished.swap(true, Ordering::AcqRel) {
            return None;
        }
        self.inbox.take()
    }
}

impl<C: Connection, I: LobbyInbox> Drop for CleanupGuard<C, I> {
    fn drop(&mut self) {
        let Some(inbox) = self.claim() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let session = Arc::clone(&self.session);
        runtime.spawn(async move {
            let player_id = session.id();
            let _ = inbox.remove(player_id).await;
            let _ = session.close().await;
            tracing::info!(%player_id, "player session ended (cancelled)");
        });
    }
}
