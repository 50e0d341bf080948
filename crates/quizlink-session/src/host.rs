//! The host session: runs one game from the presenter's screen.
//!
//! ```text
//! JoinWaiting ──start──→ StartCountdown ──start-acknowledge──→ QuestionCountdown
//!                                                                  │ new-question
//!                                                                  ↓
//!   GameOver ←──game-ended── QuestionFeedback ←──question-ended── QuestionOpen
//!                                  │                                  ↑
//!                                  └──────────new-question────────────┘
//! ```
//!
//! Roster notifications are accepted in every state except `GameOver`.

use std::fmt;

use quizlink_protocol::action::{
    ANSWER_RECEIVED, DISCONNECTED_PLAYER, GAME_ENDED, JOINED_PLAYER, LEFT_PLAYER, NEW_QUESTION,
    QUESTION_ENDED, QUESTION_LIVE, QUESTION_RESULTS, START_ACKNOWLEDGE,
};
use quizlink_protocol::{
    GameMessage, Outbound, Pin, PlayerId, PlayerInfo, PlayerName, QuestionSnapshot,
};
use serde::Serialize;

use crate::roster::{JoinOutcome, Roster};
use crate::{
    CommandOutcome, ConnectionEvent, CountdownSlot, CountdownView, Effect, Expiry, LeaveReason,
    Role, SessionConfig, SessionError,
};

// ---------------------------------------------------------------------------
// HostState
// ---------------------------------------------------------------------------

/// Where the host is in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HostState {
    /// Lobby: players join, the host decides when to start.
    JoinWaiting,
    /// Start requested, waiting for the server to acknowledge.
    StartCountdown,
    /// Between rounds, waiting for the next question.
    QuestionCountdown,
    /// A question is on screen (intro countdown, then answer time).
    QuestionOpen,
    /// Question closed, results on screen.
    QuestionFeedback,
    GameOver,
}

type Handler =
    fn(&mut HostSession, &GameMessage, &mut Vec<Effect>) -> Result<HostState, SessionError>;

impl HostState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GameOver)
    }

    fn handler(self) -> Handler {
        match self {
            Self::JoinWaiting => HostSession::join_waiting,
            Self::StartCountdown => HostSession::start_countdown,
            Self::QuestionCountdown => HostSession::question_countdown,
            Self::QuestionOpen => HostSession::question_open,
            Self::QuestionFeedback => HostSession::question_feedback,
            Self::GameOver => HostSession::game_over,
        }
    }
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::JoinWaiting => "join-waiting",
            Self::StartCountdown => "start-countdown",
            Self::QuestionCountdown => "question-countdown",
            Self::QuestionOpen => "question-open",
            Self::QuestionFeedback => "question-feedback",
            Self::GameOver => "game-over",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Commands and snapshot
// ---------------------------------------------------------------------------

/// What the presenter can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// Start the game. Rejected (not an error) below the player minimum.
    StartGame,
    /// Remove a player. The roster entry is flagged pending until the
    /// server reports the player gone.
    Kick(PlayerId),
    /// Close the open question without waiting for the timer.
    EndQuestion,
}

/// Everything a host screen renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostView {
    pub pin: Pin,
    pub state: HostState,
    pub connected: bool,
    pub roster: Roster,
    pub question: Option<QuestionSnapshot>,
    pub answers_received: u32,
    pub countdown: Option<CountdownView>,
    pub start_rejected: bool,
    pub leaderboard: Vec<PlayerInfo>,
}

// ---------------------------------------------------------------------------
// HostSession
// ---------------------------------------------------------------------------

/// Host-side state machine for one game.
#[derive(Debug)]
pub struct HostSession {
    pin: Pin,
    config: SessionConfig,
    state: HostState,
    connected: bool,
    roster: Roster,
    question: Option<QuestionSnapshot>,
    answers_received: u32,
    countdown: Option<CountdownView>,
    start_rejected: bool,
    /// `end-question` already sent for the open question.
    end_requested: bool,
    leaderboard: Vec<PlayerInfo>,
}

impl HostSession {
    pub fn new(pin: Pin, config: SessionConfig) -> Self {
        Self {
            pin,
            config,
            state: HostState::JoinWaiting,
            connected: false,
            roster: Roster::new(),
            question: None,
            answers_received: 0,
            countdown: None,
            start_rejected: false,
            end_requested: false,
            leaderboard: Vec::new(),
        }
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn question(&self) -> Option<&QuestionSnapshot> {
        self.question.as_ref()
    }

    pub fn answers_received(&self) -> u32 {
        self.answers_received
    }

    pub fn countdown(&self) -> Option<&CountdownView> {
        self.countdown.as_ref()
    }

    pub fn start_rejected(&self) -> bool {
        self.start_rejected
    }

    pub fn leaderboard(&self) -> &[PlayerInfo] {
        &self.leaderboard
    }

    fn transition(&mut self, next: HostState) {
        if next != self.state {
            tracing::info!(pin = %self.pin, from = %self.state, to = %next, "host state changed");
            self.state = next;
        }
    }

    fn unexpected(&self, msg: &GameMessage) {
        tracing::warn!(
            pin = %self.pin,
            state = %self.state,
            action = %msg.action,
            "unexpected action, ignoring"
        );
    }

    /// Applies a roster notification. Returns `false` when `msg` is not
    /// one.
    fn apply_roster(&mut self, msg: &GameMessage) -> Result<bool, SessionError> {
        match msg.action.as_str() {
            JOINED_PLAYER => {
                let info: PlayerInfo = msg.payload_as()?;
                let id = info.id;
                match self.roster.join(info) {
                    JoinOutcome::Added => {
                        tracing::debug!(pin = %self.pin, player = %id, "player joined");
                    }
                    JoinOutcome::Reconnected => {
                        tracing::debug!(pin = %self.pin, player = %id, "player reconnected");
                    }
                    JoinOutcome::Duplicate => {
                        tracing::debug!(pin = %self.pin, player = %id, "duplicate join ignored");
                    }
                }
            }
            LEFT_PLAYER => {
                let PlayerName { name } = msg.payload_as::<PlayerName>()?;
                if self.roster.remove_by_name(&name).is_none() {
                    tracing::debug!(pin = %self.pin, name = %name, "left-player for unknown name");
                }
            }
            DISCONNECTED_PLAYER => {
                let PlayerName { name } = msg.payload_as::<PlayerName>()?;
                if !self.roster.mark_disconnected(&name) {
                    tracing::debug!(pin = %self.pin, name = %name, "disconnect for unknown name");
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Shows a fresh question behind the intro countdown.
    fn present_question(
        &mut self,
        msg: &GameMessage,
        out: &mut Vec<Effect>,
    ) -> Result<(), SessionError> {
        let question: QuestionSnapshot = msg.payload_as()?;
        let duration = self.config.question_countdown_secs;

        self.countdown = Some(CountdownView::new(duration, Some(question.title.clone())));
        self.question = Some(question);
        self.answers_received = 0;
        self.end_requested = false;
        out.push(Effect::StartCountdown {
            slot: CountdownSlot::Round,
            duration,
            on_expire: Expiry::SkipCountdown,
        });
        Ok(())
    }

    fn request_end_question(&mut self, out: &mut Vec<Effect>) -> bool {
        if self.end_requested {
            return false;
        }
        self.end_requested = true;
        out.push(Effect::Send(Outbound::EndQuestion));
        true
    }

    // -- per-state handlers --------------------------------------------------

    fn join_waiting(
        &mut self,
        msg: &GameMessage,
        _out: &mut Vec<Effect>,
    ) -> Result<HostState, SessionError> {
        if !self.apply_roster(msg)? {
            self.unexpected(msg);
        }
        Ok(HostState::JoinWaiting)
    }

    fn start_countdown(
        &mut self,
        msg: &GameMessage,
        _out: &mut Vec<Effect>,
    ) -> Result<HostState, SessionError> {
        if self.apply_roster(msg)? {
            return Ok(HostState::StartCountdown);
        }
        if msg.action == START_ACKNOWLEDGE {
            return Ok(HostState::QuestionCountdown);
        }
        self.unexpected(msg);
        Ok(HostState::StartCountdown)
    }

    fn question_countdown(
        &mut self,
        msg: &GameMessage,
        out: &mut Vec<Effect>,
    ) -> Result<HostState, SessionError> {
        if self.apply_roster(msg)? {
            return Ok(self.state);
        }
        if msg.action == NEW_QUESTION {
            self.present_question(msg, out)?;
            return Ok(HostState::QuestionOpen);
        }
        self.unexpected(msg);
        Ok(self.state)
    }

    fn question_open(
        &mut self,
        msg: &GameMessage,
        out: &mut Vec<Effect>,
    ) -> Result<HostState, SessionError> {
        if self.apply_roster(msg)? {
            return Ok(HostState::QuestionOpen);
        }
        match msg.action.as_str() {
            QUESTION_LIVE => {
                let duration = self
                    .question
                    .as_ref()
                    .map_or(quizlink_protocol::DEFAULT_QUESTION_SECS, |q| q.duration);
                self.countdown = Some(CountdownView::new(duration, None));
                out.push(Effect::StartCountdown {
                    slot: CountdownSlot::Round,
                    duration,
                    on_expire: Expiry::EndQuestion,
                });
            }
            ANSWER_RECEIVED => {
                self.answers_received = self.answers_received.saturating_add(1);
            }
            QUESTION_ENDED => {
                // The server closed the question; its word is final.
                self.countdown = None;
                out.push(Effect::CancelCountdown(CountdownSlot::Round));
                return Ok(HostState::QuestionFeedback);
            }
            _ => self.unexpected(msg),
        }
        Ok(HostState::QuestionOpen)
    }

    fn question_feedback(
        &mut self,
        msg: &GameMessage,
        out: &mut Vec<Effect>,
    ) -> Result<HostState, SessionError> {
        if self.apply_roster(msg)? {
            return Ok(HostState::QuestionFeedback);
        }
        match msg.action.as_str() {
            // The next round goes through the countdown handler.
            NEW_QUESTION => return Self::question_countdown(self, msg, out),
            QUESTION_RESULTS => {
                let standings: Vec<PlayerInfo> = msg.payload_as()?;
                for entry in &standings {
                    if let Some(record) = self.roster.get_mut(entry.id) {
                        record.score = entry.score;
                        record.correct_count = entry.correct_count;
                    }
                }
                self.leaderboard = standings;
            }
            GAME_ENDED => {
                self.countdown = None;
                out.push(Effect::CancelCountdown(CountdownSlot::Round));
                out.push(Effect::CancelCountdown(CountdownSlot::Notice));
                return Ok(HostState::GameOver);
            }
            _ => self.unexpected(msg),
        }
        Ok(HostState::QuestionFeedback)
    }

    fn game_over(
        &mut self,
        msg: &GameMessage,
        _out: &mut Vec<Effect>,
    ) -> Result<HostState, SessionError> {
        tracing::debug!(pin = %self.pin, action = %msg.action, "game over, ignoring");
        Ok(HostState::GameOver)
    }

    // -- commands ------------------------------------------------------------

    fn invalid(&self, command: &'static str) -> SessionError {
        SessionError::InvalidCommand {
            command,
            state: self.state.to_string(),
        }
    }

    fn start_game(&mut self, out: &mut Vec<Effect>) -> Result<CommandOutcome, SessionError> {
        if self.state != HostState::JoinWaiting {
            return Err(self.invalid("start the game"));
        }
        if self.roster.len() < self.config.min_players {
            tracing::info!(
                pin = %self.pin,
                players = self.roster.len(),
                min = self.config.min_players,
                "not enough players to start"
            );
            self.start_rejected = true;
            out.push(Effect::StartCountdown {
                slot: CountdownSlot::Notice,
                duration: self.config.start_error_clear_secs,
                on_expire: Expiry::ClearStartError,
            });
            return Ok(CommandOutcome::Rejected);
        }

        if self.start_rejected {
            self.start_rejected = false;
            out.push(Effect::CancelCountdown(CountdownSlot::Notice));
        }
        out.push(Effect::Send(Outbound::StartRound));
        self.transition(HostState::StartCountdown);
        Ok(CommandOutcome::Accepted)
    }

    fn kick(&mut self, id: PlayerId, out: &mut Vec<Effect>) -> Result<CommandOutcome, SessionError> {
        if self.state.is_terminal() {
            return Err(self.invalid("kick"));
        }
        let record = self
            .roster
            .get_mut(id)
            .ok_or(SessionError::UnknownPlayer(id))?;
        record.pending = true;
        out.push(Effect::Send(Outbound::Kick(id)));
        Ok(CommandOutcome::Accepted)
    }

    fn end_question(&mut self, out: &mut Vec<Effect>) -> Result<CommandOutcome, SessionError> {
        if self.state != HostState::QuestionOpen {
            return Err(self.invalid("end the question"));
        }
        if self.request_end_question(out) {
            Ok(CommandOutcome::Accepted)
        } else {
            Ok(CommandOutcome::Rejected)
        }
    }
}

impl Role for HostSession {
    type Command = HostCommand;
    type Snapshot = HostView;

    const NAME: &'static str = "host";

    fn on_connection(&mut self, event: ConnectionEvent) -> Vec<Effect> {
        match event {
            ConnectionEvent::Opened => {
                self.connected = true;
                tracing::info!(pin = %self.pin, "host connected, claiming game");
                vec![Effect::Send(Outbound::ClaimHost(self.pin))]
            }
            ConnectionEvent::Closed | ConnectionEvent::Errored(_) if self.state.is_terminal() => {
                tracing::debug!(pin = %self.pin, "connection ended after game over");
                Vec::new()
            }
            ConnectionEvent::Closed => {
                self.connected = false;
                tracing::warn!(pin = %self.pin, state = %self.state, "connection closed mid-game");
                vec![Effect::Leave(LeaveReason::ConnectionClosed)]
            }
            ConnectionEvent::Errored(error) => {
                self.connected = false;
                tracing::warn!(pin = %self.pin, state = %self.state, %error, "connection failed");
                vec![Effect::Leave(LeaveReason::ConnectionErrored(error))]
            }
        }
    }

    fn handle_message(&mut self, msg: &GameMessage) -> Result<Vec<Effect>, SessionError> {
        let mut out = Vec::new();
        let next = (self.state.handler())(self, msg, &mut out)?;
        self.transition(next);
        Ok(out)
    }

    fn handle_command(
        &mut self,
        command: HostCommand,
    ) -> Result<(CommandOutcome, Vec<Effect>), SessionError> {
        let mut out = Vec::new();
        let outcome = match command {
            HostCommand::StartGame => self.start_game(&mut out)?,
            HostCommand::Kick(id) => self.kick(id, &mut out)?,
            HostCommand::EndQuestion => self.end_question(&mut out)?,
        };
        Ok((outcome, out))
    }

    fn on_countdown_tick(&mut self, slot: CountdownSlot, remaining: u32) {
        if slot == CountdownSlot::Round {
            if let Some(countdown) = self.countdown.as_mut() {
                countdown.remaining = remaining;
            }
        }
    }

    fn on_countdown_expired(&mut self, slot: CountdownSlot, expiry: Expiry) -> Vec<Effect> {
        let mut out = Vec::new();
        if self.state.is_terminal() {
            return out;
        }
        match (slot, expiry) {
            (CountdownSlot::Round, Expiry::SkipCountdown) => {
                self.countdown = None;
                if self.state == HostState::QuestionOpen {
                    out.push(Effect::Send(Outbound::SkipCountdown));
                }
            }
            (CountdownSlot::Round, Expiry::EndQuestion) => {
                if let Some(countdown) = self.countdown.as_mut() {
                    countdown.remaining = 0;
                }
                if self.state == HostState::QuestionOpen {
                    self.request_end_question(&mut out);
                }
            }
            (CountdownSlot::Notice, Expiry::ClearStartError) => {
                self.start_rejected = false;
            }
            (slot, expiry) => {
                tracing::debug!(pin = %self.pin, ?slot, ?expiry, "stray countdown expiry");
            }
        }
        out
    }

    fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn snapshot(&self) -> HostView {
        HostView {
            pin: self.pin,
            state: self.state,
            connected: self.connected,
            roster: self.roster.clone(),
            question: self.question.clone(),
            answers_received: self.answers_received,
            countdown: self.countdown.clone(),
            start_rejected: self.start_rejected,
            leaderboard: self.leaderboard.clone(),
        }
    }
}
