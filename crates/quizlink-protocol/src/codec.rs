//! Codec trait and the line codec used on the wire.
//!
//! Every message is a single line of text: an action token, one space,
//! and a JSON payload.
//!
//! ```text
//! answer 2
//! joined-player {"id":1,"name":"Ada","score":0,"correctCount":0}
//! ```
//!
//! The protocol layer only needs *something* implementing [`Codec`]; the
//! session driver is generic over it. [`LineCodec`] is the one the game
//! server speaks.

use serde::Serialize;

use crate::{GameMessage, ProtocolError};

/// Separates the action token from the payload.
pub const SEPARATOR: char = ' ';

/// Converts between `(action, payload)` pairs and lines of text.
pub trait Codec: Send + Sync + 'static {
    /// Serializes an action and its payload into one line.
    ///
    /// # Errors
    /// `ProtocolError::InvalidAction` if the action is empty or contains
    /// the separator, `ProtocolError::Encode` if the payload cannot be
    /// serialized.
    fn encode<T: Serialize + ?Sized>(
        &self,
        action: &str,
        payload: &T,
    ) -> Result<String, ProtocolError>;

    /// Parses one inbound line.
    ///
    /// # Errors
    /// `ProtocolError::MalformedMessage` if the line has no separator or
    /// the remainder is not valid JSON.
    fn decode(&self, line: &str) -> Result<GameMessage, ProtocolError>;
}

/// The `"<action> <json>"` line format.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineCodec;

impl Codec for LineCodec {
    fn encode<T: Serialize + ?Sized>(
        &self,
        action: &str,
        payload: &T,
    ) -> Result<String, ProtocolError> {
        if action.is_empty() || action.contains(SEPARATOR) {
            return Err(ProtocolError::InvalidAction(action.to_owned()));
        }
        let body = serde_json::to_string(payload).map_err(ProtocolError::Encode)?;

        let mut line = String::with_capacity(action.len() + 1 + body.len());
        line.push_str(action);
        line.push(SEPARATOR);
        line.push_str(&body);
        Ok(line)
    }

    fn decode(&self, line: &str) -> Result<GameMessage, ProtocolError> {
        let Some((action, rest)) = line.split_once(SEPARATOR) else {
            return Err(ProtocolError::malformed(
                None,
                "missing separator between action and payload",
            ));
        };
        if action.is_empty() {
            return Err(ProtocolError::malformed(None, "empty action token"));
        }

        let payload = serde_json::from_str(rest)
            .map_err(|e| ProtocolError::malformed(Some(action), e))?;

        Ok(GameMessage {
            action: action.to_owned(),
            payload,
        })
    }
}
