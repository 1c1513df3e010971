//! In-process duplex connection backed by Tokio channels.
//!
//! [`MemoryConnection::pair`] returns the server side (a [`Connection`])
//! and the client side ([`MemoryClient`]). Frames are delivered in order
//! and never hit the network.

use std::sync::Mutex as StdMutex;

use tokio::sync::{Mutex, mpsc, watch};

use crate::{Connection, ConnectionId, TransportError};

/// Server side of an in-memory connection.
pub struct MemoryConnection {
    id: ConnectionId,
    /// `None` once the server side has closed.
    outbound: StdMutex<Option<mpsc::UnboundedSender<String>>>,
    inbound: Mutex<mpsc::UnboundedReceiver<String>>,
    shutdown: watch::Sender<bool>,
}

/// Client side of an in-memory connection.
pub struct MemoryClient {
    id: ConnectionId,
    outbound: Option<mpsc::UnboundedSender<String>>,
    inbound: mpsc::UnboundedReceiver<String>,
}

impl MemoryConnection {
    /// Creates a connected server/client pair.
    pub fn pair() -> (MemoryConnection, MemoryClient) {
        let id = ConnectionId::next();
        let (to_client, from_server) = mpsc::unbounded_channel();
        let (to_server, from_client) = mpsc::unbounded_channel();

        let server = MemoryConnection {
            id,
            outbound: StdMutex::new(Some(to_client)),
            inbound: Mutex::new(from_client),
            shutdown: watch::Sender::new(false),
        };
        let client = MemoryClient {
            id,
            outbound: Some(to_server),
            inbound: from_server,
        };
        (server, client)
    }

    /// Returns `true` once the server side has been closed.
    pub fn is_closed(&self) -> bool {
        self.outbound
            .lock()
            .map(|guard| guard.is_none())
            .unwrap_or(true)
    }
}

impl Connection for MemoryConnection {
    async fn send(&self, frame: &str) -> Result<(), TransportError> {
        let guard = self.outbound.lock().map_err(|_| {
            TransportError::ConnectionClosed(self.id.to_string())
        })?;
        let sender = guard.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed(self.id.to_string())
        })?;
        sender.send(frame.to_owned()).map_err(|_| {
            TransportError::SendFailed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "client side dropped",
            ))
        })
    }

    async fn recv(&self) -> Result<Option<String>, TransportError> {
        let mut shutdown = self.shutdown.subscribe();
        let mut inbound = self.inbound.lock().await;
        tokio::select! {
            frame = inbound.recv() => Ok(frame),
            _ = shutdown.wait_for(|closed| *closed) => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        if let Ok(mut guard) = self.outbound.lock() {
            guard.take();
        }
        // Wakes a `recv` parked on this side.
        self.shutdown.send_replace(true);
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

impl MemoryClient {
    /// Returns the ID shared with the server side.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Sends a text frame to the server side.
    pub fn send(&self, frame: impl Into<String>) -> Result<(), TransportError> {
        let sender = self.outbound.as_ref().ok_or_else(|| {
            TransportError::ConnectionClosed(self.id.to_string())
        })?;
        sender.send(frame.into()).map_err(|_| {
            TransportError::ConnectionClosed(self.id.to_string())
        })
    }

    /// Waits for the next frame from the server side.
    ///
    /// Returns `None` after the server closes and all buffered frames have
    /// been read.
    pub async fn recv(&mut self) -> Option<String> {
        self.inbound.recv().await
    }

    /// Returns the next frame if one is already buffered.
    pub fn try_recv(&mut self) -> Option<String> {
        self.inbound.try_recv().ok()
    }

    /// Closes the client's write half. The server's `recv` returns
    /// `Ok(None)` once buffered frames are drained.
    pub fn close(&mut self) {
        self.outbound.take();
    }
}
