//! Integration tests for the host state machine, driven event by event.

use quizlink_protocol::action::{
    ANSWER_RECEIVED, DISCONNECTED_PLAYER, GAME_ENDED, JOINED_PLAYER, LEFT_PLAYER, NEW_QUESTION,
    QUESTION_ENDED, QUESTION_LIVE, QUESTION_RESULTS, START_ACKNOWLEDGE,
};
use quizlink_protocol::{GameMessage, Outbound, Pin, PlayerId};
use quizlink_session::{
    CommandOutcome, ConnectionEvent, CountdownSlot, Effect, Expiry, HostCommand, HostSession,
    HostState, LeaveReason, Role, SessionConfig, SessionError,
};
use serde_json::{Value, json};

// =========================================================================
// Helpers
// =========================================================================

fn host() -> HostSession {
    HostSession::new(Pin(1234), SessionConfig::default())
}

fn msg(action: &str, payload: Value) -> GameMessage {
    GameMessage::new(action, payload)
}

fn deliver(host: &mut HostSession, action: &str, payload: Value) -> Vec<Effect> {
    host.handle_message(&msg(action, payload))
        .expect("message should be accepted")
}

fn join(host: &mut HostSession, id: u64, name: &str) {
    deliver(host, JOINED_PLAYER, json!({"id": id, "name": name}));
}

fn lobby_of_three() -> HostSession {
    let mut host = host();
    join(&mut host, 1, "Ada");
    join(&mut host, 2, "Bob");
    join(&mut host, 3, "Cy");
    host
}

fn question(title: &str, duration: u32) -> Value {
    json!({
        "title": title,
        "duration": duration,
        "answers": [
            {"title": "A", "correct": true},
            {"title": "B", "correct": false},
        ],
    })
}

/// Brings a host with three players to `QuestionOpen` on "Q1", answer
/// timer running.
fn live_question() -> HostSession {
    let mut host = lobby_of_three();
    host.handle_command(HostCommand::StartGame).unwrap();
    deliver(&mut host, START_ACKNOWLEDGE, json!({}));
    deliver(&mut host, NEW_QUESTION, question("Q1", 10));
    host.on_countdown_expired(CountdownSlot::Round, Expiry::SkipCountdown);
    deliver(&mut host, QUESTION_LIVE, json!({}));
    host
}

// =========================================================================
// Lobby
// =========================================================================

#[test]
fn test_players_join_in_order_and_game_starts() {
    let mut host = lobby_of_three();
    assert_eq!(host.state(), HostState::JoinWaiting);
    assert_eq!(host.roster().names(), vec!["Ada", "Bob", "Cy"]);

    let (outcome, effects) = host.handle_command(HostCommand::StartGame).unwrap();
    assert_eq!(outcome, CommandOutcome::Accepted);
    assert_eq!(effects, vec![Effect::Send(Outbound::StartRound)]);
    assert_eq!(host.state(), HostState::StartCountdown);
}

#[test]
fn test_disconnect_before_acknowledge_keeps_roster_size() {
    let mut host = lobby_of_three();
    host.handle_command(HostCommand::StartGame).unwrap();
    assert_eq!(host.state(), HostState::StartCountdown);

    deliver(&mut host, DISCONNECTED_PLAYER, json!({"name": "Bob"}));
    assert_eq!(host.roster().len(), 3);
    assert!(!host.roster().get(PlayerId(2)).unwrap().connected);
    assert_eq!(host.state(), HostState::StartCountdown);

    deliver(&mut host, START_ACKNOWLEDGE, json!({}));
    assert_eq!(host.state(), HostState::QuestionCountdown);
}

#[test]
fn test_start_below_minimum_is_rejected_with_transient_flag() {
    let mut host = host();
    join(&mut host, 1, "Ada");
    join(&mut host, 2, "Bob");

    let (outcome, effects) = host.handle_command(HostCommand::StartGame).unwrap();
    assert_eq!(outcome, CommandOutcome::Rejected);
    assert_eq!(
        effects,
        vec![Effect::StartCountdown {
            slot: CountdownSlot::Notice,
            duration: 3,
            on_expire: Expiry::ClearStartError,
        }]
    );
    assert!(!effects.iter().any(|e| matches!(e, Effect::Send(_))));
    assert_eq!(host.state(), HostState::JoinWaiting);
    assert!(host.start_rejected());

    let effects = host.on_countdown_expired(CountdownSlot::Notice, Expiry::ClearStartError);
    assert!(effects.is_empty());
    assert!(!host.start_rejected());
}

#[test]
fn test_successful_start_clears_a_pending_rejection() {
    let mut host = host();
    join(&mut host, 1, "Ada");
    join(&mut host, 2, "Bob");
    host.handle_command(HostCommand::StartGame).unwrap();

    join(&mut host, 3, "Cy");
    let (outcome, effects) = host.handle_command(HostCommand::StartGame).unwrap();
    assert_eq!(outcome, CommandOutcome::Accepted);
    assert_eq!(
        effects,
        vec![
            Effect::CancelCountdown(CountdownSlot::Notice),
            Effect::Send(Outbound::StartRound),
        ]
    );
    assert!(!host.start_rejected());
}

#[test]
fn test_custom_minimum_players() {
    let config = SessionConfig {
        min_players: 1,
        ..SessionConfig::default()
    };
    let mut host = HostSession::new(Pin(1), config);
    join(&mut host, 1, "Ada");

    let (outcome, _) = host.handle_command(HostCommand::StartGame).unwrap();
    assert_eq!(outcome, CommandOutcome::Accepted);
}

#[test]
fn test_start_outside_lobby_is_an_error() {
    let mut host = lobby_of_three();
    host.handle_command(HostCommand::StartGame).unwrap();

    let err = host.handle_command(HostCommand::StartGame).unwrap_err();
    assert!(matches!(err, SessionError::InvalidCommand { .. }));
    assert!(!err.is_fatal());
    assert_eq!(host.state(), HostState::StartCountdown);
}

// =========================================================================
// Question flow
// =========================================================================

#[test]
fn test_full_round_trip() {
    let mut host = lobby_of_three();
    host.handle_command(HostCommand::StartGame).unwrap();

    // start-round acknowledged
    assert!(deliver(&mut host, START_ACKNOWLEDGE, json!({})).is_empty());
    assert_eq!(host.state(), HostState::QuestionCountdown);

    // new question: themed intro countdown
    let effects = deliver(&mut host, NEW_QUESTION, question("Q1", 10));
    assert_eq!(host.state(), HostState::QuestionOpen);
    assert_eq!(
        effects,
        vec![Effect::StartCountdown {
            slot: CountdownSlot::Round,
            duration: 5,
            on_expire: Expiry::SkipCountdown,
        }]
    );
    let countdown = host.countdown().unwrap();
    assert_eq!(countdown.remaining, 5);
    assert_eq!(countdown.title.as_deref(), Some("Q1"));
    assert_eq!(host.question().unwrap().answers[0].correct, Some(true));

    host.on_countdown_tick(CountdownSlot::Round, 4);
    assert_eq!(host.countdown().unwrap().remaining, 4);

    // intro over
    let effects = host.on_countdown_expired(CountdownSlot::Round, Expiry::SkipCountdown);
    assert_eq!(effects, vec![Effect::Send(Outbound::SkipCountdown)]);
    assert!(host.countdown().is_none());

    // answer time uses the question's own budget
    let effects = deliver(&mut host, QUESTION_LIVE, json!({}));
    assert_eq!(
        effects,
        vec![Effect::StartCountdown {
            slot: CountdownSlot::Round,
            duration: 10,
            on_expire: Expiry::EndQuestion,
        }]
    );

    for _ in 0..3 {
        deliver(&mut host, ANSWER_RECEIVED, json!({}));
    }
    assert_eq!(host.answers_received(), 3);

    let effects = deliver(&mut host, QUESTION_ENDED, json!({}));
    assert_eq!(effects, vec![Effect::CancelCountdown(CountdownSlot::Round)]);
    assert_eq!(host.state(), HostState::QuestionFeedback);

    // next question resets the answer counter
    deliver(&mut host, NEW_QUESTION, question("Q2", 20));
    assert_eq!(host.state(), HostState::QuestionOpen);
    assert_eq!(host.answers_received(), 0);
    assert_eq!(host.question().unwrap().title, "Q2");

    deliver(&mut host, QUESTION_ENDED, json!({}));
    let effects = deliver(&mut host, GAME_ENDED, json!({}));
    assert_eq!(host.state(), HostState::GameOver);
    assert!(host.is_terminal());
    assert_eq!(
        effects,
        vec![
            Effect::CancelCountdown(CountdownSlot::Round),
            Effect::CancelCountdown(CountdownSlot::Notice),
        ]
    );
}

#[test]
fn test_question_results_fill_leaderboard_and_scores() {
    let mut host = live_question();
    deliver(&mut host, QUESTION_ENDED, json!({}));

    deliver(
        &mut host,
        QUESTION_RESULTS,
        json!([
            {"id": 2, "name": "Bob", "score": 900, "correctCount": 1},
            {"id": 1, "name": "Ada", "score": 0},
        ]),
    );

    let leaders: Vec<&str> = host.leaderboard().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(leaders, vec!["Bob", "Ada"]);
    let bob = host.roster().get(PlayerId(2)).unwrap();
    assert_eq!(bob.score, 900);
    assert_eq!(bob.correct_count, 1);
}

#[test]
fn test_timer_expiry_requests_end_question_once() {
    let mut host = live_question();

    let effects = host.on_countdown_expired(CountdownSlot::Round, Expiry::EndQuestion);
    assert_eq!(effects, vec![Effect::Send(Outbound::EndQuestion)]);
    assert_eq!(host.state(), HostState::QuestionOpen, "server decides when it ends");

    let (outcome, effects) = host.handle_command(HostCommand::EndQuestion).unwrap();
    assert_eq!(outcome, CommandOutcome::Rejected);
    assert!(effects.is_empty());
}

#[test]
fn test_manual_end_question_suppresses_timer_request() {
    let mut host = live_question();

    let (outcome, effects) = host.handle_command(HostCommand::EndQuestion).unwrap();
    assert_eq!(outcome, CommandOutcome::Accepted);
    assert_eq!(effects, vec![Effect::Send(Outbound::EndQuestion)]);

    let effects = host.on_countdown_expired(CountdownSlot::Round, Expiry::EndQuestion);
    assert!(effects.is_empty());
}

#[test]
fn test_late_expiry_after_question_ended_is_ignored() {
    let mut host = live_question();
    deliver(&mut host, QUESTION_ENDED, json!({}));

    let effects = host.on_countdown_expired(CountdownSlot::Round, Expiry::EndQuestion);
    assert!(effects.is_empty());
    assert_eq!(host.state(), HostState::QuestionFeedback);
}

#[test]
fn test_end_question_outside_open_question_is_an_error() {
    let mut host = lobby_of_three();
    let err = host.handle_command(HostCommand::EndQuestion).unwrap_err();
    assert!(matches!(err, SessionError::InvalidCommand { .. }));
}

// =========================================================================
// Roster during the game
// =========================================================================

#[test]
fn test_roster_updates_accepted_mid_game() {
    let mut host = live_question();

    join(&mut host, 4, "Dee");
    assert_eq!(host.roster().len(), 4);

    deliver(&mut host, DISCONNECTED_PLAYER, json!({"name": "Bob"}));
    assert!(!host.roster().get(PlayerId(2)).unwrap().connected);

    deliver(&mut host, LEFT_PLAYER, json!({"name": "Ada"}));
    assert_eq!(host.roster().names(), vec!["Bob", "Cy", "Dee"]);
    assert_eq!(host.state(), HostState::QuestionOpen);
}

#[test]
fn test_left_player_for_unknown_name_changes_nothing() {
    let mut host = lobby_of_three();
    let before = host.snapshot();
    deliver(&mut host, LEFT_PLAYER, json!({"name": "Zed"}));
    assert_eq!(host.snapshot(), before);
}

#[test]
fn test_kick_marks_player_pending() {
    let mut host = lobby_of_three();

    let (outcome, effects) = host.handle_command(HostCommand::Kick(PlayerId(2))).unwrap();
    assert_eq!(outcome, CommandOutcome::Accepted);
    assert_eq!(effects, vec![Effect::Send(Outbound::Kick(PlayerId(2)))]);
    assert!(host.roster().get(PlayerId(2)).unwrap().pending);

    deliver(&mut host, LEFT_PLAYER, json!({"name": "Bob"}));
    assert!(host.roster().get(PlayerId(2)).is_none());
}

#[test]
fn test_kicked_player_reconnecting_stays_pending() {
    let mut host = lobby_of_three();
    host.handle_command(HostCommand::Kick(PlayerId(2))).unwrap();

    deliver(&mut host, DISCONNECTED_PLAYER, json!({"name": "Bob"}));
    join(&mut host, 2, "Bob");

    let bob = host.roster().get(PlayerId(2)).unwrap();
    assert!(bob.connected);
    assert!(bob.pending, "only left-player clears a kick");

    deliver(&mut host, LEFT_PLAYER, json!({"name": "Bob"}));
    assert!(host.roster().get(PlayerId(2)).is_none());
}

#[test]
fn test_duplicate_and_reconnecting_joins_never_duplicate_ids() {
    let mut host = lobby_of_three();

    join(&mut host, 1, "Ada");
    assert_eq!(host.roster().len(), 3);

    deliver(&mut host, DISCONNECTED_PLAYER, json!({"name": "Cy"}));
    assert!(!host.roster().get(PlayerId(3)).unwrap().connected);

    deliver(
        &mut host,
        JOINED_PLAYER,
        json!({"id": 3, "name": "Cy", "score": 400, "correctCount": 1}),
    );
    assert_eq!(host.roster().len(), 3);
    assert_eq!(host.roster().names(), vec!["Ada", "Bob", "Cy"]);
    let cy = host.roster().get(PlayerId(3)).unwrap();
    assert!(cy.connected);
    assert_eq!(cy.score, 400);
}

#[test]
fn test_kick_unknown_player_is_an_error() {
    let mut host = lobby_of_three();
    let err = host.handle_command(HostCommand::Kick(PlayerId(99))).unwrap_err();
    assert!(matches!(err, SessionError::UnknownPlayer(PlayerId(99))));
}

// =========================================================================
// Unexpected input
// =========================================================================

#[test]
fn test_unexpected_action_leaves_session_unchanged() {
    let mut host = lobby_of_three();
    let before = host.snapshot();
    assert!(deliver(&mut host, QUESTION_LIVE, json!({})).is_empty());
    assert!(deliver(&mut host, "no-such-action", json!({"x": 1})).is_empty());
    assert_eq!(host.snapshot(), before);

    let mut host = live_question();
    let before = host.snapshot();
    assert!(deliver(&mut host, START_ACKNOWLEDGE, json!({})).is_empty());
    assert_eq!(host.snapshot(), before);
}

#[test]
fn test_game_over_ignores_everything() {
    let mut host = live_question();
    deliver(&mut host, QUESTION_ENDED, json!({}));
    deliver(&mut host, GAME_ENDED, json!({}));
    let before = host.snapshot();

    join(&mut host, 9, "Late");
    deliver(&mut host, NEW_QUESTION, question("Q9", 10));
    assert!(
        host.on_countdown_expired(CountdownSlot::Round, Expiry::EndQuestion)
            .is_empty()
    );
    assert_eq!(host.snapshot(), before);
}

#[test]
fn test_malformed_payload_is_fatal() {
    let mut host = lobby_of_three();
    let before = host.snapshot();

    let err = host
        .handle_message(&msg(JOINED_PLAYER, json!({"name": 3})))
        .unwrap_err();
    assert!(matches!(err, SessionError::Protocol(_)));
    assert!(err.is_fatal());
    assert_eq!(host.snapshot(), before);
}

// =========================================================================
// Connection
// =========================================================================

#[test]
fn test_connection_closed_mid_game_leaves() {
    let mut host = lobby_of_three();
    host.on_connection(ConnectionEvent::Opened);

    let effects = host.on_connection(ConnectionEvent::Closed);
    assert_eq!(effects, vec![Effect::Leave(LeaveReason::ConnectionClosed)]);
    assert!(!host.snapshot().connected);
}

#[test]
fn test_connection_error_carries_reason() {
    let mut host = host();
    let effects = host.on_connection(ConnectionEvent::Errored("reset".into()));
    assert_eq!(
        effects,
        vec![Effect::Leave(LeaveReason::ConnectionErrored("reset".into()))]
    );
}

#[test]
fn test_connection_closed_after_game_over_is_silent() {
    let mut host = live_question();
    deliver(&mut host, QUESTION_ENDED, json!({}));
    deliver(&mut host, GAME_ENDED, json!({}));

    assert!(host.on_connection(ConnectionEvent::Closed).is_empty());
}
