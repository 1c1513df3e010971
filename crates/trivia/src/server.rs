//! `TriviaServer` builder and server loop.
//!
//! This is the entry point for running a trivia server. It ties together
//! all the layers: transport → protocol → session → lobby.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use trivia_lobby::{LobbyConfig, SessionDirectory};
use trivia_protocol::JsonCodec;
use trivia_questions::QuestionSource;
use trivia_transport::{Transport, WebSocketConnection, WebSocketTransport};

use crate::TriviaError;
use crate::handler::handle_connection;

/// Default time a fresh connection has to send each join-handshake frame.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<Q: QuestionSource> {
    pub(crate) directory: Mutex<SessionDirectory<WebSocketConnection, Q>>,
    pub(crate) codec: JsonCodec,
    pub(crate) handshake_timeout: Duration,
}

/// Builder for configuring and starting a trivia server.
///
/// # Example
///
/// ```rust,ignore
/// use trivia::prelude::*;
///
/// let bank = QuestionBank::load("questions.json").await?;
/// let server = TriviaServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(bank)
///     .await?;
/// server.run().await
/// ```
pub struct TriviaServerBuilder {
    bind_addr: String,
    lobby_config: LobbyConfig,
    handshake_timeout: Duration,
}

impl TriviaServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            lobby_config: LobbyConfig::default(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the configuration every new lobby starts with.
    pub fn lobby_config(mut self, config: LobbyConfig) -> Self {
        self.lobby_config = config;
        self
    }

    /// Sets how long a fresh connection may stay silent during the join
    /// handshake before it is dropped.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Binds the listener and builds the server around `questions`.
    pub async fn build<Q: QuestionSource>(
        self,
        questions: Q,
    ) -> Result<TriviaServer<Q>, TriviaError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let state = Arc::new(ServerState {
            directory: Mutex::new(SessionDirectory::new(
                Arc::new(questions),
                self.lobby_config,
            )),
            codec: JsonCodec,
            handshake_timeout: self.handshake_timeout,
        });

        Ok(TriviaServer { transport, state })
    }
}

impl Default for TriviaServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound trivia server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct TriviaServer<Q: QuestionSource> {
    transport: WebSocketTransport,
    state: Arc<ServerState<Q>>,
}

impl TriviaServer<trivia_questions::QuestionBank> {
    /// Creates a new builder.
    pub fn builder() -> TriviaServerBuilder {
        TriviaServerBuilder::new()
    }
}

impl<Q: QuestionSource> TriviaServer<Q> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop.
    ///
    /// Each accepted connection gets its own task that runs the join
    /// handshake and then the player's receive loop. Runs until the process
    /// is terminated.
    pub async fn run(mut self) -> Result<(), TriviaError> {
        tracing::info!(addr = ?self.local_addr().ok(), "trivia server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
