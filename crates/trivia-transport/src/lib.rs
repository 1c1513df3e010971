//! Transport layer for trivia lobbies.
//!
//! Provides the [`Transport`] and [`Connection`] traits. A connection is an
//! already-established, message-oriented duplex channel that delivers
//! serialized text frames in order. Everything above this crate (sessions,
//! lobbies) only ever sees whole frames.
//!
//! # Implementations
//!
//! - [`WebSocketTransport`] / [`WebSocketConnection`]: `tokio-tungstenite`
//!   (feature `websocket`, on by default)
//! - [`MemoryConnection`] / [`MemoryClient`]: an in-process pair backed by
//!   Tokio channels, for tests and embedding

#![allow(async_fn_in_trait)]

mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use memory::{MemoryClient, MemoryConnection};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter for generating unique connection IDs across all transports.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-unique connection ID.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, TransportError>;
}

/// A single duplex connection carrying text frames.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// implementations keep the read half and the write half independent so
/// a pending `recv` never holds up an outbound frame.
pub trait Connection: Send + Sync + 'static {
    /// Sends one text frame to the remote peer.
    fn send(
        &self,
        frame: &str,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next text frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<String>, TransportError>>
    + Send;

    /// Closes the connection. Closing twice is not an error.
    fn close(
        &self,
    ) -> impl std::future::Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
