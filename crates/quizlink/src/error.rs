//! Unified error type for Quizlink.

use quizlink_protocol::ProtocolError;
use quizlink_session::SessionError;
use quizlink_transport::TransportError;

/// Any error a Quizlink client call can return.
///
/// `#[from]` on each wrapped variant lets `?` convert sub-crate errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizlinkError {
    /// Connecting, sending or receiving failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A line could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The session refused a command or hit a malformed payload.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The session driver has stopped; no more commands are accepted.
    #[error("session has ended")]
    SessionEnded,

    /// The session driver task panicked or was aborted.
    #[error("session driver failed: {0}")]
    DriverFailed(String),
}
