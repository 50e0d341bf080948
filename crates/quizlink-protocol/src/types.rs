//! Core protocol types: identities, the decoded message, and the payload
//! shapes the sessions interpret.
//!
//! Payloads are parsed lazily. The codec only guarantees that the text
//! after the action token is JSON; a handler that cares about a message
//! asks for its payload with [`GameMessage::payload_as`], and a shape
//! mismatch surfaces there as [`ProtocolError::MalformedMessage`].

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Server-assigned player identifier, stable for the lifetime of a game.
///
/// Serialized as the bare number (`#[serde(transparent)]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The numeric game PIN shared by the host and every player of one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pin(pub u32);

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// GameMessage
// ---------------------------------------------------------------------------

/// One decoded inbound line.
#[derive(Debug, Clone, PartialEq)]
pub struct GameMessage {
    /// Opaque action tag from the vocabulary in [`crate::action`].
    pub action: String,
    /// The JSON value that followed the action token.
    pub payload: serde_json::Value,
}

impl GameMessage {
    /// Builds a message in memory. Mostly useful in tests.
    pub fn new(action: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            action: action.into(),
            payload,
        }
    }

    /// Deserializes the payload into `T`.
    ///
    /// # Errors
    /// `ProtocolError::MalformedMessage` naming this message's action when
    /// the payload does not fit `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        T::deserialize(&self.payload)
            .map_err(|e| ProtocolError::malformed(Some(&self.action), e))
    }
}

// ---------------------------------------------------------------------------
// Roster payloads
// ---------------------------------------------------------------------------

/// A player as the server describes it: in `joined-player` notifications
/// and as a leaderboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: PlayerId,
    #[serde(alias = "nick")]
    pub name: String,
    #[serde(default)]
    pub score: u64,
    #[serde(default, alias = "correct")]
    pub correct_count: u32,
}

/// Payload of `left-player` and `disconnected-player`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerName {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

/// Time budget used when a question arrives without one.
pub const DEFAULT_QUESTION_SECS: u32 = 20;

fn default_question_secs() -> u32 {
    DEFAULT_QUESTION_SECS
}

/// One answer option.
///
/// The host receives `{"title": ..., "correct": ...}` objects; players
/// receive bare strings and never learn which option is correct, so
/// `correct` is `None` on the player side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAnswer")]
pub struct AnswerOption {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAnswer {
    Plain(String),
    Marked {
        title: String,
        #[serde(default)]
        correct: Option<bool>,
    },
}

impl From<RawAnswer> for AnswerOption {
    fn from(raw: RawAnswer) -> Self {
        match raw {
            RawAnswer::Plain(title) => Self {
                title,
                correct: None,
            },
            RawAnswer::Marked { title, correct } => Self { title, correct },
        }
    }
}

/// The question currently on screen. Always replaced wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSnapshot {
    pub title: String,
    #[serde(default, alias = "image_url", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Answer time budget in seconds.
    #[serde(default = "default_question_secs")]
    pub duration: u32,
    /// Options in display order (0-based here, 1-based on the wire).
    #[serde(alias = "answer")]
    pub answers: Vec<AnswerOption>,
    /// 1-based position of this question in the quiz, 0 when unknown.
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub total: u32,
}

impl QuestionSnapshot {
    /// Image reference, treating an empty string as absent.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref().filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// Per-player result of one question, sent with `question-ended`.
///
/// Older servers send `leaderboard` as a single entry (the player's own
/// standing), newer ones as a list; both are accepted. `ahead` is the
/// optional "who is ahead of you" hint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeedbackSnapshot {
    #[serde(default)]
    pub correct: bool,
    /// Points awarded for this question only.
    #[serde(default)]
    pub points: u64,
    /// Current rank, 1 = first. Servers that do not rank players leave
    /// it out.
    #[serde(default, alias = "rank", skip_serializing_if = "Option::is_none")]
    pub placement: Option<u32>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub leaderboard: Vec<PlayerInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ahead: Option<String>,
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Payload of `game-starting` and `next-countdown`.
///
/// A title asks for the full themed countdown screen; without one the
/// countdown is just a number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownSpec {
    /// Length in whole seconds. Older servers call this `count`.
    #[serde(alias = "count")]
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl CountdownSpec {
    pub fn is_full(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.is_empty())
    }
}
