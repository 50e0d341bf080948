//! The player session: one contestant's phone.
//!
//! ```text
//! Loading ──identify──→ Waiting ──countdown──→ Countdown ──new-question / expiry──→ Question
//!                                                  ↑                                  │ ack
//!                                                  │                                  ↓
//!                        Finished ←──game-ended── Feedback ←───question-ended─────── Answer
//! ```
//!
//! `question-ended` also closes `Question` directly when the player never
//! answered. Accumulated points are the sum of every feedback received.

use std::fmt;

use quizlink_protocol::action::{
    ANSWER_ACKNOWLEDGED, GAME_ENDED, GAME_STARTING, NEW_QUESTION, NEXT_COUNTDOWN, QUESTION_ENDED,
};
use quizlink_protocol::{
    CountdownSpec, FeedbackSnapshot, GameMessage, Outbound, Pin, PlayerId, QuestionSnapshot,
};
use serde::Serialize;

use crate::{
    CommandOutcome, ConnectionEvent, CountdownSlot, CountdownView, Effect, Expiry, LeaveReason,
    Role, SessionConfig, SessionError,
};

/// Where the player is in the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlayerState {
    /// Connection open, identification not sent yet.
    Loading,
    Waiting,
    /// "Get ready" countdown before a question.
    Countdown,
    /// Options on screen, no answer yet.
    Question,
    /// Answer acknowledged, waiting for the result.
    Answer,
    /// Result of the last question on screen.
    Feedback,
    Finished,
}

type Handler =
    fn(&mut PlayerSession, &GameMessage, &mut Vec<Effect>) -> Result<PlayerState, SessionError>;

impl PlayerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }

    fn handler(self) -> Handler {
        match self {
            Self::Loading | Self::Waiting => PlayerSession::waiting,
            Self::Countdown => PlayerSession::counting_down,
            Self::Question => PlayerSession::question_open,
            Self::Answer => PlayerSession::answer_sent,
            Self::Feedback => PlayerSession::feedback_shown,
            Self::Finished => PlayerSession::finished,
        }
    }
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Loading => "loading",
            Self::Waiting => "waiting",
            Self::Countdown => "countdown",
            Self::Question => "question",
            Self::Answer => "answer",
            Self::Feedback => "feedback",
            Self::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// What the contestant can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    /// Pick an option by its 0-based position on screen.
    Answer(usize),
}

/// Everything a player screen renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerView {
    pub pin: Pin,
    pub uid: PlayerId,
    pub state: PlayerState,
    pub connected: bool,
    pub points: u64,
    /// Latest placement the server reported; 0 until the first one.
    pub rank: u32,
    pub countdown: Option<CountdownView>,
    pub question: Option<QuestionSnapshot>,
    /// Option picked for the current question (0-based).
    pub answered: Option<usize>,
    pub feedback: Option<FeedbackSnapshot>,
    /// An answer was acknowledged and its result has not arrived yet.
    pub feedback_pending: bool,
}

/// Player-side state machine for one game.
#[derive(Debug)]
pub struct PlayerSession {
    pin: Pin,
    uid: PlayerId,
    config: SessionConfig,
    state: PlayerState,
    connected: bool,
    points: u64,
    rank: u32,
    countdown: Option<CountdownView>,
    question: Option<QuestionSnapshot>,
    answered: Option<usize>,
    feedback: Option<FeedbackSnapshot>,
    feedback_pending: bool,
}

impl PlayerSession {
    pub fn new(pin: Pin, uid: PlayerId, config: SessionConfig) -> Self {
        Self {
            pin,
            uid,
            config,
            state: PlayerState::Loading,
            connected: false,
            points: 0,
            rank: 0,
            countdown: None,
            question: None,
            answered: None,
            feedback: None,
            feedback_pending: false,
        }
    }

    pub fn uid(&self) -> PlayerId {
        self.uid
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn points(&self) -> u64 {
        self.points
    }

    pub fn rank(&self) -> u32 {
        self.rank
    }

    pub fn question(&self) -> Option<&QuestionSnapshot> {
        self.question.as_ref()
    }

    pub fn feedback(&self) -> Option<&FeedbackSnapshot> {
        self.feedback.as_ref()
    }

    pub fn countdown(&self) -> Option<&CountdownView> {
        self.countdown.as_ref()
    }

    fn transition(&mut self, next: PlayerState) {
        if next != self.state {
            tracing::info!(
                pin = %self.pin,
                uid = %self.uid,
                from = %self.state,
                to = %next,
                "player state changed"
            );
            self.state = next;
        }
    }

    fn unexpected(&self, msg: &GameMessage) {
        tracing::warn!(
            pin = %self.pin,
            uid = %self.uid,
            state = %self.state,
            action = %msg.action,
            "unexpected action, ignoring"
        );
    }

    fn is_countdown(msg: &GameMessage) -> bool {
        matches!(msg.action.as_str(), GAME_STARTING | NEXT_COUNTDOWN)
    }

    /// Starts the "get ready" count. The previous round's question and
    /// result leave the screen.
    fn begin_countdown(
        &mut self,
        msg: &GameMessage,
        out: &mut Vec<Effect>,
    ) -> Result<PlayerState, SessionError> {
        let spec: CountdownSpec = msg.payload_as()?;
        let title = spec.is_full().then(|| spec.title.clone()).flatten();

        self.countdown = Some(CountdownView::new(spec.duration, title));
        self.question = None;
        self.answered = None;
        self.feedback = None;
        out.push(Effect::StartCountdown {
            slot: CountdownSlot::Round,
            duration: spec.duration,
            on_expire: Expiry::OpenQuestion,
        });
        Ok(PlayerState::Countdown)
    }

    fn store_question(&mut self, msg: &GameMessage) -> Result<PlayerState, SessionError> {
        let question: QuestionSnapshot = msg.payload_as()?;
        tracing::debug!(
            pin = %self.pin,
            title = %question.title,
            options = question.answers.len(),
            "question received"
        );
        self.question = Some(question);
        self.answered = None;
        self.feedback_pending = false;
        Ok(PlayerState::Question)
    }

    fn settle_feedback(&mut self, msg: &GameMessage) -> Result<PlayerState, SessionError> {
        let feedback: FeedbackSnapshot = msg.payload_as()?;
        self.points = self.points.saturating_add(feedback.points);
        if let Some(placement) = feedback.placement {
            self.rank = placement;
        }
        self.feedback_pending = false;
        tracing::debug!(
            pin = %self.pin,
            uid = %self.uid,
            correct = feedback.correct,
            points = self.points,
            rank = self.rank,
            "feedback received"
        );
        self.feedback = Some(feedback);
        Ok(PlayerState::Feedback)
    }

    // -- per-state handlers --------------------------------------------------

    fn waiting(
        &mut self,
        msg: &GameMessage,
        out: &mut Vec<Effect>,
    ) -> Result<PlayerState, SessionError> {
        if Self::is_countdown(msg) {
            return self.begin_countdown(msg, out);
        }
        if msg.action == NEW_QUESTION {
            return self.store_question(msg);
        }
        self.unexpected(msg);
        Ok(self.state)
    }

    fn counting_down(
        &mut self,
        msg: &GameMessage,
        out: &mut Vec<Effect>,
    ) -> Result<PlayerState, SessionError> {
        if Self::is_countdown(msg) {
            return self.begin_countdown(msg, out);
        }
        if msg.action == NEW_QUESTION {
            let next = self.store_question(msg)?;
            self.countdown = None;
            out.push(Effect::CancelCountdown(CountdownSlot::Round));
            return Ok(next);
        }
        self.unexpected(msg);
        Ok(PlayerState::Countdown)
    }

    fn question_open(
        &mut self,
        msg: &GameMessage,
        _out: &mut Vec<Effect>,
    ) -> Result<PlayerState, SessionError> {
        match msg.action.as_str() {
            NEW_QUESTION => self.store_question(msg),
            ANSWER_ACKNOWLEDGED => {
                self.feedback_pending = true;
                Ok(PlayerState::Answer)
            }
            QUESTION_ENDED => self.settle_feedback(msg),
            _ => {
                self.unexpected(msg);
                Ok(PlayerState::Question)
            }
        }
    }

    fn answer_sent(
        &mut self,
        msg: &GameMessage,
        _out: &mut Vec<Effect>,
    ) -> Result<PlayerState, SessionError> {
        match msg.action.as_str() {
            ANSWER_ACKNOWLEDGED => {
                tracing::debug!(pin = %self.pin, "repeated acknowledgement");
                Ok(PlayerState::Answer)
            }
            QUESTION_ENDED => self.settle_feedback(msg),
            _ => {
                self.unexpected(msg);
                Ok(PlayerState::Answer)
            }
        }
    }

    fn feedback_shown(
        &mut self,
        msg: &GameMessage,
        out: &mut Vec<Effect>,
    ) -> Result<PlayerState, SessionError> {
        if Self::is_countdown(msg) {
            return self.begin_countdown(msg, out);
        }
        if msg.action == GAME_ENDED {
            self.countdown = None;
            out.push(Effect::CancelCountdown(CountdownSlot::Round));
            return Ok(PlayerState::Finished);
        }
        self.unexpected(msg);
        Ok(PlayerState::Feedback)
    }

    fn finished(
        &mut self,
        msg: &GameMessage,
        _out: &mut Vec<Effect>,
    ) -> Result<PlayerState, SessionError> {
        tracing::debug!(pin = %self.pin, action = %msg.action, "game finished, ignoring");
        Ok(PlayerState::Finished)
    }

    // -- commands ------------------------------------------------------------

    fn answer(&mut self, index: usize, out: &mut Vec<Effect>) -> Result<CommandOutcome, SessionError> {
        if self.state != PlayerState::Question {
            return Err(SessionError::InvalidCommand {
                command: "answer",
                state: self.state.to_string(),
            });
        }
        let options = self
            .question
            .as_ref()
            .ok_or(SessionError::NoQuestion)?
            .answers
            .len();
        if index >= options {
            return Err(SessionError::AnswerOutOfRange { index, options });
        }
        if self.answered.is_some() {
            return Err(SessionError::AlreadyAnswered);
        }

        self.answered = Some(index);
        out.push(Effect::Send(Outbound::answer_for_option(index)));
        Ok(CommandOutcome::Accepted)
    }
}

impl Role for PlayerSession {
    type Command = PlayerCommand;
    type Snapshot = PlayerView;

    const NAME: &'static str = "player";

    fn on_connection(&mut self, event: ConnectionEvent) -> Vec<Effect> {
        match event {
            ConnectionEvent::Opened => {
                tracing::debug!(pin = %self.pin, uid = %self.uid, "connection open, identifying shortly");
                vec![Effect::HandshakeAfter(self.config.identify_delay)]
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

    fn on_handshake_elapsed(&mut self) -> Vec<Effect> {
        if self.connected {
            return Vec::new();
        }
        self.connected = true;
        tracing::info!(pin = %self.pin, uid = %self.uid, "identifying");
        if self.state == PlayerState::Loading {
            self.transition(PlayerState::Waiting);
        }
        vec![Effect::Send(Outbound::Identify(self.uid))]
    }

    fn handle_message(&mut self, msg: &GameMessage) -> Result<Vec<Effect>, SessionError> {
        let mut out = Vec::new();
        let next = (self.state.handler())(self, msg, &mut out)?;
        self.transition(next);
        Ok(out)
    }

    fn handle_command(
        &mut self,
        command: PlayerCommand,
    ) -> Result<(CommandOutcome, Vec<Effect>), SessionError> {
        let mut out = Vec::new();
        let outcome = match command {
            PlayerCommand::Answer(index) => self.answer(index, &mut out)?,
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
        match (slot, expiry) {
            (CountdownSlot::Round, Expiry::OpenQuestion) => {
                self.countdown = None;
                if self.state == PlayerState::Countdown {
                    self.transition(PlayerState::Question);
                }
            }
            (slot, expiry) => {
                tracing::debug!(pin = %self.pin, ?slot, ?expiry, "stray countdown expiry");
            }
        }
        Vec::new()
    }

    fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    fn snapshot(&self) -> PlayerView {
        PlayerView {
            pin: self.pin,
            uid: self.uid,
            state: self.state,
            connected: self.connected,
            points: self.points,
            rank: self.rank,
            countdown: self.countdown.clone(),
            question: self.question.clone(),
            answered: self.answered,
            feedback: self.feedback.clone(),
            feedback_pending: self.feedback_pending,
        }
    }
}
