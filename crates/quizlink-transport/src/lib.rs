//! Transport abstraction layer for Quizlink.
//!
//! Provides the [`Connection`] trait: one persistent, ordered, text-based
//! duplex connection from a client to the game server. The session driver
//! is generic over it, so tests can script a connection in memory.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client via `tokio-tungstenite`
//! - `tls`: `wss://` endpoints via rustls

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::{BoxError, TransportError};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketConnection;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique tag for one connection, carried in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocates a fresh id. Ids start at 1 and are never reused.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// A single connection that sends and receives lines of text.
///
/// Messages arrive in transport order. There is no acknowledgement,
/// retry or reconnection at this layer.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends one line to the server. Fire-and-forget: success only means
    /// the line was handed to the socket.
    fn send(&self, line: &str) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Waits for the next line from the server.
    ///
    /// `Ok(None)` means the server closed the connection. Must be
    /// cancel-safe: dropping the future loses no line.
    fn recv(&self) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send;

    /// Closes the connection from this side.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn id(&self) -> ConnectionId;
}
