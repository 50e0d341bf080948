//! Error types for the protocol layer.
//!
//! Each crate in Quizlink defines its own error enum. A `ProtocolError`
//! always means the problem is in turning a line of text into a message
//! (or back), never in networking or session state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing an outbound payload failed.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// An inbound line could not be turned into a message, or its payload
    /// did not have the shape the handler expected.
    ///
    /// `action` is the action token when one could be read, so logs show
    /// which message was bad.
    #[error("malformed message{}: {reason}", .action.as_deref().map(|a| format!(" ({a})")).unwrap_or_default())]
    MalformedMessage {
        action: Option<String>,
        reason: String,
    },

    /// An action token that cannot be put on the wire (empty, or containing
    /// the separator).
    #[error("invalid action token: {0:?}")]
    InvalidAction(String),
}

impl ProtocolError {
    pub(crate) fn malformed(action: Option<&str>, reason: impl ToString) -> Self {
        Self::MalformedMessage {
            action: action.map(str::to_owned),
            reason: reason.to_string(),
        }
    }
}
