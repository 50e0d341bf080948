//! Error types for the session layer.

use quizlink_protocol::{PlayerId, ProtocolError};

/// Errors raised by a session state machine.
///
/// `Protocol` comes from an inbound message and is fatal to the session.
/// Every other variant rejects a user command and leaves the session
/// untouched.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An inbound payload did not have the shape its action requires.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The command is not valid in the current state.
    #[error("cannot {command} while {state}")]
    InvalidCommand {
        command: &'static str,
        state: String,
    },

    /// Kick targeted a player the roster does not know.
    #[error("player {0} is not in the roster")]
    UnknownPlayer(PlayerId),

    /// Answer submitted before any question arrived.
    #[error("no question to answer")]
    NoQuestion,

    /// Answer index past the last option (0-based).
    #[error("answer {index} out of range ({options} options)")]
    AnswerOutOfRange { index: usize, options: usize },

    /// The current question was already answered.
    #[error("question already answered")]
    AlreadyAnswered,
}

impl SessionError {
    /// True for errors that must end the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}
