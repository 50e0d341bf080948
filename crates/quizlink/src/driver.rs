//! Session driver: one Tokio task per session.
//!
//! The driver owns the connection, the role state machine and its
//! countdown service. Inbound lines, countdown events, user commands and
//! the player's handshake delay are branches of a single `select!` loop,
//! so every mutation of session data is serialized without locks.
//!
//! ```text
//!   SessionHandle ──command──→ ┌──────────────┐ ──send──→ Connection
//!        ↑                     │ SessionDriver │
//!        └──watch snapshot──── └──────────────┘ ←──recv── Connection
//! ```

use std::ops::ControlFlow;

use quizlink_protocol::{Codec, PlayerId};
use quizlink_session::{
    CommandOutcome, ConnectionEvent, CountdownSlot, Effect, Expiry, HostCommand, HostSession,
    LeaveReason, PlayerCommand, PlayerSession, Role, SessionError,
};
use quizlink_tick::{CountdownConfig, CountdownEvent, CountdownService};
use quizlink_transport::Connection;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::QuizlinkError;

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The game reached its terminal state.
    Finished,
    /// The connection was lost before the game ended. The caller should
    /// navigate away and join afresh.
    Left(LeaveReason),
    /// Shut down locally before the game ended.
    Closed,
    /// A fatal fault, such as a malformed inbound payload.
    Failed(QuizlinkError),
}

impl SessionOutcome {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

type CommandReply = oneshot::Sender<Result<CommandOutcome, SessionError>>;

/// Commands sent from a [`SessionHandle`] to its driver task.
pub(crate) enum DriverCommand<R: Role> {
    Apply {
        command: R::Command,
        reply: CommandReply,
    },
    Shutdown,
}

/// Handle to a running session.
///
/// Commands go through an mpsc channel and are answered on a oneshot
/// channel. Snapshots are published on a `watch` channel after every
/// change. Dropping the handle shuts the session down.
pub struct SessionHandle<R: Role> {
    commands: mpsc::Sender<DriverCommand<R>>,
    snapshots: watch::Receiver<R::Snapshot>,
    task: JoinHandle<SessionOutcome>,
}

impl<R: Role> SessionHandle<R> {
    /// Sends a user command and waits for the session's answer.
    pub async fn command(&self, command: R::Command) -> Result<CommandOutcome, QuizlinkError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(DriverCommand::Apply {
                command,
                reply: reply_tx,
            })
            .await
            .map_err(|_| QuizlinkError::SessionEnded)?;
        let outcome = reply_rx.await.map_err(|_| QuizlinkError::SessionEnded)??;
        Ok(outcome)
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> R::Snapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that is notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<R::Snapshot> {
        self.snapshots.clone()
    }

    /// Asks the driver to close the connection and stop.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(DriverCommand::Shutdown).await;
    }

    /// Waits for the session to end on its own.
    pub async fn wait(self) -> SessionOutcome {
        // Keep the command channel open: a closed channel means shutdown.
        let Self { commands, task, .. } = self;
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => SessionOutcome::Failed(QuizlinkError::DriverFailed(e.to_string())),
        };
        drop(commands);
        outcome
    }
}

impl SessionHandle<HostSession> {
    /// Requests the game start. `Rejected` below the player minimum.
    pub async fn start_game(&self) -> Result<CommandOutcome, QuizlinkError> {
        self.command(HostCommand::StartGame).await
    }

    pub async fn kick(&self, player: PlayerId) -> Result<CommandOutcome, QuizlinkError> {
        self.command(HostCommand::Kick(player)).await
    }

    /// Closes the open question early. `Rejected` if already requested.
    pub async fn end_question(&self) -> Result<CommandOutcome, QuizlinkError> {
        self.command(HostCommand::EndQuestion).await
    }
}

impl SessionHandle<PlayerSession> {
    /// Answers the current question with the option at `index` (0-based).
    pub async fn answer(&self, index: usize) -> Result<CommandOutcome, QuizlinkError> {
        self.command(PlayerCommand::Answer(index)).await
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Spawns the driver task for `role` over an already open `conn`.
pub fn spawn_session<C, R, K>(
    conn: C,
    role: R,
    codec: K,
    countdown: CountdownConfig,
    command_buffer: usize,
) -> SessionHandle<R>
where
    C: Connection,
    R: Role,
    K: Codec,
{
    let (command_tx, command_rx) = mpsc::channel(command_buffer.max(1));
    let (snapshot_tx, snapshot_rx) = watch::channel(role.snapshot());

    let driver = SessionDriver {
        conn,
        codec,
        role,
        countdowns: CountdownService::new(countdown),
        commands: command_rx,
        snapshots: snapshot_tx,
        handshake: None,
    };
    let task = tokio::spawn(driver.run());

    SessionHandle {
        commands: command_tx,
        snapshots: snapshot_rx,
        task,
    }
}

struct SessionDriver<C, R: Role, K> {
    conn: C,
    codec: K,
    role: R,
    countdowns: CountdownService<CountdownSlot, Expiry>,
    commands: mpsc::Receiver<DriverCommand<R>>,
    snapshots: watch::Sender<R::Snapshot>,
    /// When the role's handshake delay runs out, if one is pending.
    handshake: Option<Instant>,
}

/// Resolves at `deadline`, or never when there is none.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<C, R, K> SessionDriver<C, R, K>
where
    C: Connection,
    R: Role,
    K: Codec,
{
    async fn run(mut self) -> SessionOutcome {
        let conn_id = self.conn.id();
        tracing::info!(role = R::NAME, %conn_id, "session started");

        let effects = self.role.on_connection(ConnectionEvent::Opened);
        let mut flow = self.apply(effects).await;
        self.publish();

        while flow.is_continue() {
            let handshake = self.handshake;
            flow = tokio::select! {
                line = self.conn.recv() => match line {
                    Ok(Some(line)) => self.on_line(&line).await,
                    Ok(None) => self.on_connection_end(ConnectionEvent::Closed).await,
                    Err(e) => {
                        self.on_connection_end(ConnectionEvent::Errored(e.to_string())).await
                    }
                },
                event = self.countdowns.wait_for_event() => self.on_countdown(event).await,
                command = self.commands.recv() => match command {
                    Some(DriverCommand::Apply { command, reply }) => {
                        self.on_command(command, reply).await
                    }
                    Some(DriverCommand::Shutdown) | None => ControlFlow::Break(self.closed()),
                },
                () = sleep_until(handshake) => {
                    self.handshake = None;
                    let effects = self.role.on_handshake_elapsed();
                    self.apply(effects).await
                }
            };
            self.publish();
        }

        let outcome = match flow {
            ControlFlow::Break(outcome) => outcome,
            ControlFlow::Continue(()) => self.closed(),
        };
        self.finish(&outcome).await;
        outcome
    }

    async fn on_line(&mut self, line: &str) -> ControlFlow<SessionOutcome> {
        tracing::trace!(role = R::NAME, line, "received");
        let msg = match self.codec.decode(line) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!(role = R::NAME, error = %e, "undecodable line");
                return ControlFlow::Break(SessionOutcome::Failed(e.into()));
            }
        };
        match self.role.handle_message(&msg) {
            Ok(effects) => self.apply(effects).await,
            Err(e) if e.is_fatal() => {
                tracing::error!(role = R::NAME, action = %msg.action, error = %e, "malformed message");
                ControlFlow::Break(SessionOutcome::Failed(e.into()))
            }
            Err(e) => {
                tracing::warn!(role = R::NAME, action = %msg.action, error = %e, "message rejected");
                ControlFlow::Continue(())
            }
        }
    }

    async fn on_connection_end(&mut self, event: ConnectionEvent) -> ControlFlow<SessionOutcome> {
        let effects = self.role.on_connection(event);
        self.apply(effects).await?;
        // The role suppressed the loss: the game was already over.
        ControlFlow::Break(SessionOutcome::Finished)
    }

    async fn on_countdown(
        &mut self,
        event: CountdownEvent<CountdownSlot, Expiry>,
    ) -> ControlFlow<SessionOutcome> {
        match event {
            CountdownEvent::Tick { owner, remaining } => {
                self.role.on_countdown_tick(owner, remaining);
                ControlFlow::Continue(())
            }
            CountdownEvent::Expired { owner, on_expire } => {
                let effects = self.role.on_countdown_expired(owner, on_expire);
                self.apply(effects).await
            }
        }
    }

    async fn on_command(
        &mut self,
        command: R::Command,
        reply: CommandReply,
    ) -> ControlFlow<SessionOutcome> {
        tracing::debug!(role = R::NAME, ?command, "command");
        match self.role.handle_command(command) {
            Ok((outcome, effects)) => {
                let flow = self.apply(effects).await;
                // The caller sees the new snapshot as soon as it has its reply.
                self.publish();
                let _ = reply.send(Ok(outcome));
                flow
            }
            Err(e) => {
                tracing::debug!(role = R::NAME, error = %e, "command refused");
                let _ = reply.send(Err(e));
                ControlFlow::Continue(())
            }
        }
    }

    /// Applies effects in order, stopping at the first one that ends the
    /// session.
    async fn apply(&mut self, effects: Vec<Effect>) -> ControlFlow<SessionOutcome> {
        for effect in effects {
            match effect {
                Effect::Send(outbound) => {
                    let line = match outbound.encode(&self.codec) {
                        Ok(line) => line,
                        Err(e) => {
                            tracing::error!(role = R::NAME, error = %e, "failed to encode");
                            return ControlFlow::Break(SessionOutcome::Failed(e.into()));
                        }
                    };
                    tracing::trace!(role = R::NAME, %line, "sending");
                    if let Err(e) = self.conn.send(&line).await {
                        // The receive side reports the failure.
                        tracing::warn!(role = R::NAME, error = %e, "send failed");
                    }
                }
                Effect::StartCountdown {
                    slot,
                    duration,
                    on_expire,
                } => {
                    if let Some(replaced) = self.countdowns.start(slot, duration, on_expire) {
                        tracing::debug!(role = R::NAME, ?slot, ?replaced, "countdown replaced");
                    }
                }
                Effect::CancelCountdown(slot) => {
                    self.countdowns.cancel(&slot);
                }
                Effect::HandshakeAfter(delay) => {
                    self.handshake = Some(Instant::now() + delay);
                }
                Effect::Leave(reason) => {
                    return ControlFlow::Break(SessionOutcome::Left(reason));
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn closed(&self) -> SessionOutcome {
        if self.role.is_terminal() {
            SessionOutcome::Finished
        } else {
            SessionOutcome::Closed
        }
    }

    fn publish(&self) {
        let next = self.role.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    async fn finish(&mut self, outcome: &SessionOutcome) {
        self.countdowns.cancel_all();
        self.handshake = None;
        if let Err(e) = self.conn.close().await {
            tracing::debug!(role = R::NAME, error = %e, "close after session end");
        }
        self.publish();

        let metrics = self.countdowns.metrics();
        match outcome {
            SessionOutcome::Failed(e) => {
                tracing::error!(role = R::NAME, error = %e, "session failed");
            }
            outcome => tracing::info!(
                role = R::NAME,
                ?outcome,
                countdowns = metrics.started,
                "session ended"
            ),
        }
    }
}
