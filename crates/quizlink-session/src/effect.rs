//! What a session asks its driver to do.
//!
//! Session handlers never touch the network or the clock. They mutate
//! their own data and return a list of [`Effect`]s; the driver applies
//! them in order. This keeps every state machine a plain synchronous
//! value that tests can poke directly.

use std::time::Duration;

use quizlink_protocol::Outbound;
use serde::Serialize;

/// A side effect requested by a session handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Encode and send one message to the server.
    Send(Outbound),

    /// Start (or restart) the countdown in `slot`.
    ///
    /// The driver reports each tick back through the role's
    /// `on_countdown_tick` and the final expiry through
    /// `on_countdown_expired`, handing `on_expire` back unchanged.
    StartCountdown {
        slot: CountdownSlot,
        duration: u32,
        on_expire: Expiry,
    },

    /// Cancel the countdown in `slot`, if any. Its expiry never fires.
    CancelCountdown(CountdownSlot),

    /// Call the role's `on_handshake_elapsed` once `delay` has passed.
    HandshakeAfter(Duration),

    /// End the session.
    Leave(LeaveReason),
}

/// Which countdown a timer belongs to. A session runs at most one
/// countdown per slot; starting a new one replaces the old.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountdownSlot {
    /// The on-screen game countdown: question intro, answer time, or the
    /// player's "get ready" count.
    Round,
    /// Housekeeping timer that clears a transient UI notice.
    Notice,
}

/// What should happen when a countdown reaches zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    /// Host: the question intro is over, tell the server.
    SkipCountdown,
    /// Host: answer time is up, ask the server to close the question.
    EndQuestion,
    /// Player: the "get ready" count is over, show the question screen.
    OpenQuestion,
    /// Host: drop the "not enough players" flag.
    ClearStartError,
}

/// A change in the underlying connection, as seen by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Opened,
    Closed,
    Errored(String),
}

/// Why a session ended on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LeaveReason {
    /// The connection closed before the game ended.
    ConnectionClosed,
    /// The connection failed before the game ended.
    ConnectionErrored(String),
}

/// The countdown a session currently displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountdownView {
    /// Whole seconds left.
    pub remaining: u32,
    /// Set for the full themed countdown screen.
    pub title: Option<String>,
}

impl CountdownView {
    pub fn new(remaining: u32, title: Option<String>) -> Self {
        Self { remaining, title }
    }
}
