//! The action vocabulary.
//!
//! Host and player share the transport but interpret disjoint sets of
//! inbound actions. Outbound messages are modelled as the [`Outbound`]
//! enum so callers cannot misspell an action or send a payload of the
//! wrong shape.

use serde_json::json;

use crate::{Codec, Pin, PlayerId, ProtocolError};

// Inbound, host side.
pub const JOINED_PLAYER: &str = "joined-player";
pub const LEFT_PLAYER: &str = "left-player";
pub const DISCONNECTED_PLAYER: &str = "disconnected-player";
pub const START_ACKNOWLEDGE: &str = "start-acknowledge";
pub const QUESTION_LIVE: &str = "question-live";
pub const ANSWER_RECEIVED: &str = "answer-received";
pub const QUESTION_RESULTS: &str = "question-results";

// Inbound, player side.
pub const GAME_STARTING: &str = "game-starting";
pub const NEXT_COUNTDOWN: &str = "next-countdown";
pub const ANSWER_ACKNOWLEDGED: &str = "answer-acknowledged";

// Inbound, both sides.
pub const NEW_QUESTION: &str = "new-question";
pub const QUESTION_ENDED: &str = "question-ended";
pub const GAME_ENDED: &str = "game-ended";

// Outbound.
pub const IDENTIFY: &str = "identify";
pub const CLAIM_HOST: &str = "claim-host";
pub const ANSWER: &str = "answer";
pub const START_ROUND: &str = "start-round";
pub const SKIP_COUNTDOWN: &str = "skip-countdown";
pub const END_QUESTION: &str = "end-question";
pub const KICK: &str = "kick";

/// A message this client can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Player identification, sent once after the handshake delay.
    Identify(PlayerId),
    /// Host claims the game it was created for.
    ClaimHost(Pin),
    /// A chosen option. 1-based: option 0 on screen is `answer 1`.
    Answer { choice: u32 },
    StartRound,
    /// Host finished showing the question countdown.
    SkipCountdown,
    /// Host asks the server to close the current question early.
    EndQuestion,
    Kick(PlayerId),
}

impl Outbound {
    /// Builds an answer from a 0-based option index.
    pub fn answer_for_option(index: usize) -> Self {
        Self::Answer {
            choice: u32::try_from(index).map_or(u32::MAX, |i| i.saturating_add(1)),
        }
    }

    /// The wire action token.
    pub fn action(&self) -> &'static str {
        match self {
            Self::Identify(_) => IDENTIFY,
            Self::ClaimHost(_) => CLAIM_HOST,
            Self::Answer { .. } => ANSWER,
            Self::StartRound => START_ROUND,
            Self::SkipCountdown => SKIP_COUNTDOWN,
            Self::EndQuestion => END_QUESTION,
            Self::Kick(_) => KICK,
        }
    }

    /// Encodes this message as one line with the given codec.
    pub fn encode<C: Codec>(&self, codec: &C) -> Result<String, ProtocolError> {
        match self {
            Self::Identify(id) | Self::Kick(id) => codec.encode(self.action(), id),
            Self::ClaimHost(pin) => codec.encode(self.action(), pin),
            Self::Answer { choice } => codec.encode(self.action(), choice),
            Self::StartRound | Self::SkipCountdown | Self::EndQuestion => {
                codec.encode(self.action(), &json!({}))
            }
        }
    }
}
