//! Session directory: creates lobbies and maps session IDs to them.

use std::collections::HashMap;
use std::sync::Arc;

use trivia_protocol::{CategoryInfo, SessionId};
use trivia_questions::QuestionSource;
use trivia_session::generate_session_id;
use trivia_transport::Connection;

use crate::lobby::spawn_lobby;
use crate::{LobbyConfig, LobbyError, LobbyHandle};

/// Owns every live lobby for one server.
///
/// The server holds this behind a lock; callers look a handle up, release
/// the lock, and only then talk to the lobby.
pub struct SessionDirectory<C: Connection, Q: QuestionSource> {
    lobbies: HashMap<SessionId, LobbyHandle<C>>,
    questions: Arc<Q>,
    config: LobbyConfig,
}

impl<C: Connection, Q: QuestionSource> SessionDirectory<C, Q> {
    /// Creates an empty directory drawing questions from `questions`.
    pub fn new(questions: Arc<Q>, config: LobbyConfig) -> Self {
        Self {
            lobbies: HashMap::new(),
            questions,
            config,
        }
    }

    /// Spawns a new lobby for `category` under a fresh session ID.
    ///
    /// # Errors
    /// [`LobbyError::UnknownCategory`] if the question source does not
    /// offer `category`.
    pub fn create_lobby(&mut self, category: &str) -> Result<LobbyHandle<C>, LobbyError> {
        if !self.questions.has_category(category) {
            return Err(LobbyError::UnknownCategory(category.to_owned()));
        }
        self.prune_closed();

        let session_id = loop {
            let candidate = generate_session_id();
            if !self.lobbies.contains_key(&candidate) {
                break candidate;
            }
        };
        let handle = spawn_lobby::<C, Q>(
            session_id.clone(),
            category.to_owned(),
            self.config.clone(),
            Arc::clone(&self.questions),
        );
        self.lobbies.insert(session_id.clone(), handle.clone());
        tracing::info!(%session_id, category, "lobby created");
        Ok(handle)
    }

    /// Returns the handle for a live lobby.
    ///
    /// A lobby whose actor has stopped is dropped from the directory and
    /// reported as not found.
    pub fn lookup(&mut self, session_id: &SessionId) -> Result<LobbyHandle<C>, LobbyError> {
        match self.lobbies.get(session_id) {
            Some(handle) if !handle.is_closed() => Ok(handle.clone()),
            Some(_) => {
                self.lobbies.remove(session_id);
                tracing::debug!(%session_id, "pruned closed lobby on lookup");
                Err(LobbyError::NotFound(session_id.clone()))
            }
            None => Err(LobbyError::NotFound(session_id.clone())),
        }
    }

    /// Returns `true` if a live lobby is registered under `session_id`.
    pub fn exists(&mut self, session_id: &SessionId) -> bool {
        self.lookup(session_id).is_ok()
    }

    /// Forgets a lobby. Its actor keeps running until its last handle drops.
    pub fn remove(&mut self, session_id: &SessionId) -> Option<LobbyHandle<C>> {
        self.lobbies.remove(session_id)
    }

    /// Drops every lobby whose actor has stopped. Returns how many went.
    pub fn prune_closed(&mut self) -> usize {
        let before = self.lobbies.len();
        self.lobbies.retain(|_, handle| !handle.is_closed());
        let pruned = before - self.lobbies.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = self.lobbies.len(), "pruned closed lobbies");
        }
        pruned
    }

    /// Number of registered lobbies, including any not yet pruned.
    pub fn lobby_count(&self) -> usize {
        self.lobbies.len()
    }

    /// Categories offered by the question source.
    pub fn categories(&self) -> Vec<CategoryInfo> {
        self.questions.categories()
    }
}
