//! Per-connection handler: join handshake, then the player's session.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive `JoinRequest` frames until one creates or joins a lobby
//!      (`ListCategories` and `GameExists` are answered along the way)
//!   2. Assign a player ID and admit a `PlayerSession` into the lobby
//!   3. Run the session's receive loop until the connection ends

use std::sync::Arc;

use trivia_lobby::{LobbyError, LobbyHandle};
use trivia_protocol::{Codec, JoinRequest, JoinResponse};
use trivia_questions::QuestionSource;
use trivia_session::{PlayerSession, SessionError, generate_player_id};
use trivia_transport::{Connection, WebSocketConnection};

use crate::TriviaError;
use crate::server::ServerState;

/// Where a handshake landed.
struct Joined {
    handle: LobbyHandle<WebSocketConnection>,
    name: String,
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<Q: QuestionSource>(
    conn: WebSocketConnection,
    state: Arc<ServerState<Q>>,
) -> Result<(), TriviaError> {
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    // --- Step 1: Handshake ---
    let joined = match perform_handshake(&conn, &state).await {
        Ok(Some(joined)) => joined,
        Ok(None) => {
            let _ = conn.close().await;
            return Ok(());
        }
        Err(e) => {
            let _ = conn.close().await;
            return Err(e);
        }
    };

    // --- Step 2: Admit ---
    let player_id = generate_player_id();
    let session_id = joined.handle.session_id().clone();
    let session = Arc::new(PlayerSession::new(player_id.clone(), joined.name, conn));
    if let Err(e) = joined.handle.admit(Arc::clone(&session)).await {
        // The lobby closed between lookup and admit.
        tracing::debug!(%conn_id, %session_id, error = %e, "admit failed");
        let _ = session.close().await;
        return Err(SessionError::LobbyUnavailable(session_id.to_string()).into());
    }
    tracing::info!(%conn_id, %session_id, %player_id, "player joined lobby");

    // --- Step 3: Receive loop ---
    let reason = session.run(joined.handle).await;
    tracing::debug!(%conn_id, %player_id, ?reason, "player connection finished");
    Ok(())
}

/// Reads join requests until the connection is placed in a lobby.
///
/// Returns `Ok(None)` when the client went away or sent a malformed
/// request (after a 400 reply). Unknown sessions and categories get a 404
/// and the client may try again.
async fn perform_handshake<Q: QuestionSource>(
    conn: &WebSocketConnection,
    state: &ServerState<Q>,
) -> Result<Option<Joined>, TriviaError> {
    loop {
        let frame = match tokio::time::timeout(state.handshake_timeout, conn.recv()).await {
            Ok(Ok(Some(frame))) => frame,
            Ok(Ok(None)) => {
                tracing::debug!(conn_id = %conn.id(), "closed before joining");
                return Ok(None);
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => {
                tracing::info!(conn_id = %conn.id(), "handshake timed out");
                return Err(TriviaError::Handshake("timed out".into()));
            }
        };

        let request: JoinRequest = match state.codec.decode(&frame) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "malformed join request");
                reject(conn, state, 400, &format!("malformed join request: {e}")).await?;
                return Ok(None);
            }
        };

        match request {
            JoinRequest::ListCategories => {
                let categories = state.directory.lock().await.categories();
                reply(conn, state, &JoinResponse::Categories { categories }).await?;
            }

            JoinRequest::GameExists { session_id } => {
                let exists = state.directory.lock().await.exists(&session_id);
                reply(conn, state, &JoinResponse::GameExists { exists }).await?;
            }

            JoinRequest::CreateGame { name, category } => {
                if !valid_name(&name) {
                    reject(conn, state, 400, "name must not be empty").await?;
                    continue;
                }
                // Lock only to create, then drop before any network I/O.
                let created = state.directory.lock().await.create_lobby(&category);
                match created {
                    Ok(handle) => return Ok(Some(Joined { handle, name })),
                    Err(e) => reject_lobby_error(conn, state, &e).await?,
                }
            }

            JoinRequest::JoinGame { session_id, name } => {
                if !valid_name(&name) {
                    reject(conn, state, 400, "name must not be empty").await?;
                    continue;
                }
                let found = state.directory.lock().await.lookup(&session_id);
                match found {
                    Ok(handle) => return Ok(Some(Joined { handle, name })),
                    Err(e) => reject_lobby_error(conn, state, &e).await?,
                }
            }
        }
    }
}

fn valid_name(name: &str) -> bool {
    !name.trim().is_empty()
}

async fn reject_lobby_error<Q: QuestionSource>(
    conn: &WebSocketConnection,
    state: &ServerState<Q>,
    err: &LobbyError,
) -> Result<(), TriviaError> {
    tracing::debug!(conn_id = %conn.id(), error = %err, "join rejected");
    let code = match err {
        LobbyError::NotFound(_) | LobbyError::Closed(_) | LobbyError::UnknownCategory(_) => 404,
        LobbyError::AlreadyInLobby(_) => 400,
    };
    reject(conn, state, code, &err.to_string()).await
}

async fn reject<Q: QuestionSource>(
    conn: &WebSocketConnection,
    state: &ServerState<Q>,
    code: u16,
    message: &str,
) -> Result<(), TriviaError> {
    let response = JoinResponse::Rejected {
        code,
        message: message.to_string(),
    };
    reply(conn, state, &response).await
}

async fn reply<Q: QuestionSource>(
    conn: &WebSocketConnection,
    state: &ServerState<Q>,
    response: &JoinResponse,
) -> Result<(), TriviaError> {
    let frame = state.codec.encode(response)?;
    conn.send(&frame).await?;
    Ok(())
}
