//! # Quizlink
//!
//! Client session core for live, multi-party quiz games.
//!
//! One host drives a shared presentation while players answer from their
//! own devices, all over a persistent connection to a game server. Each
//! party runs a session state machine that interprets the server's message
//! stream and keeps local state (roster, question, scores, timers) in step.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizlink::prelude::*;
//!
//! # async fn demo() -> Result<(), QuizlinkError> {
//! let client = QuizClient::builder().server("localhost:8080").build();
//! let player = client.connect_player(Pin(4821), PlayerId(7)).await?;
//!
//! let mut view = player.subscribe();
//! view.wait_for(|v| v.state == PlayerState::Question).await.ok();
//! player.answer(1).await?; // sends `answer 2`
//!
//! let outcome = player.wait().await;
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod driver;
mod error;

pub use client::{QuizClient, QuizClientBuilder};
pub use config::ClientConfig;
pub use driver::{SessionHandle, SessionOutcome, spawn_session};
pub use error::QuizlinkError;

/// Everything needed to open and drive sessions.
pub mod prelude {
    pub use crate::{
        ClientConfig, QuizClient, QuizClientBuilder, QuizlinkError, SessionHandle, SessionOutcome,
    };
    pub use quizlink_protocol::{Pin, PlayerId};
    pub use quizlink_session::{
        CommandOutcome, HostSession, HostState, HostView, LeaveReason, PlayerSession,
        PlayerState, PlayerView, SessionConfig,
    };
    pub use quizlink_tick::CountdownConfig;
}
