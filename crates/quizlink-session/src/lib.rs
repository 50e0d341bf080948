//! Client session state machines for Quizlink.
//!
//! A session is a finite-state machine that consumes decoded server
//! messages, countdown events and user commands, and answers with
//! [`Effect`]s for its driver to apply. Two roles implement [`Role`]:
//!
//! - [`HostSession`]: the presenter: roster, question flow, results
//! - [`PlayerSession`]: a contestant: countdown, answering, feedback
//!
//! Nothing here performs I/O or reads the clock.

mod config;
mod effect;
mod error;
mod host;
mod player;
mod role;
mod roster;

pub use config::SessionConfig;
pub use effect::{ConnectionEvent, CountdownSlot, CountdownView, Effect, Expiry, LeaveReason};
pub use error::SessionError;
pub use host::{HostCommand, HostSession, HostState, HostView};
pub use player::{PlayerCommand, PlayerSession, PlayerState, PlayerView};
pub use role::{CommandOutcome, Role};
pub use roster::{JoinOutcome, PlayerRecord, Roster};
