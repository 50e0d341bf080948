//! Wire protocol for Quizlink.
//!
//! This crate defines what host and player clients exchange with the game
//! server:
//!
//! - **Types** ([`GameMessage`], [`QuestionSnapshot`], [`FeedbackSnapshot`],
//!   [`CountdownSpec`], etc.): decoded messages and payload shapes.
//! - **Actions** ([`action`], [`Outbound`]): the fixed vocabulary.
//! - **Codec** ([`Codec`] trait, [`LineCodec`]): `"<action> <json>"` lines.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (text) → Protocol (GameMessage) → Session (state machine)
//! ```

pub mod action;
mod codec;
mod error;
mod types;

pub use action::Outbound;
pub use codec::{Codec, LineCodec, SEPARATOR};
pub use error::ProtocolError;
pub use types::{
    AnswerOption, CountdownSpec, DEFAULT_QUESTION_SECS, FeedbackSnapshot, GameMessage, Pin,
    PlayerId, PlayerInfo, PlayerName, QuestionSnapshot,
};
