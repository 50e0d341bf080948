//! The `Role` trait: the seam between a session state machine and the
//! driver that runs it.

use quizlink_protocol::GameMessage;

use crate::{ConnectionEvent, CountdownSlot, Effect, Expiry, SessionError};

/// Result of a user command that was valid in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The command took effect.
    Accepted,
    /// The command was understood but declined; the session shows why
    /// (for example the "not enough players" flag).
    Rejected,
}

/// A client-side session state machine: host or player.
///
/// The driver owns the connection and the countdown service. It feeds
/// every event in through these methods and applies the returned
/// [`Effect`]s in order. All methods run to completion before the next
/// event is delivered.
pub trait Role: Send + 'static {
    /// User commands this role accepts.
    type Command: Send + std::fmt::Debug + 'static;

    /// Immutable view published to observers after every change.
    type Snapshot: Clone + PartialEq + Send + Sync + std::fmt::Debug + 'static;

    /// Short label used in log lines ("host", "player").
    const NAME: &'static str;

    /// Reacts to the connection opening, closing, or failing.
    fn on_connection(&mut self, event: ConnectionEvent) -> Vec<Effect>;

    /// Routes one inbound message through the handler of the current
    /// state.
    ///
    /// # Errors
    /// A payload that does not fit its action. The session should be
    /// considered broken.
    fn handle_message(&mut self, msg: &GameMessage) -> Result<Vec<Effect>, SessionError>;

    /// Applies a user command.
    ///
    /// # Errors
    /// The command is not valid right now. The session is unchanged.
    fn handle_command(
        &mut self,
        command: Self::Command,
    ) -> Result<(CommandOutcome, Vec<Effect>), SessionError>;

    /// One second of a running countdown went by.
    fn on_countdown_tick(&mut self, slot: CountdownSlot, remaining: u32);

    /// A countdown reached zero.
    fn on_countdown_expired(&mut self, slot: CountdownSlot, expiry: Expiry) -> Vec<Effect>;

    /// The delay requested with [`Effect::HandshakeAfter`] elapsed.
    fn on_handshake_elapsed(&mut self) -> Vec<Effect> {
        Vec::new()
    }

    /// Returns `true` once the game is over. A terminal session ignores
    /// every further event.
    fn is_terminal(&self) -> bool;

    fn snapshot(&self) -> Self::Snapshot;
}
