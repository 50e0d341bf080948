//! Session configuration.

use std::time::Duration;

/// Timings and limits shared by host and player sessions.
///
/// The defaults match what the game server expects; override single
/// fields with struct update syntax:
///
/// ```
/// use quizlink_session::SessionConfig;
///
/// let config = SessionConfig { min_players: 2, ..SessionConfig::default() };
/// assert_eq!(config.question_countdown_secs, 5);
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Roster size the host needs before a game may start.
    pub min_players: usize,

    /// Length of the themed countdown the host shows before each question.
    pub question_countdown_secs: u32,

    /// How long the "not enough players" flag stays raised.
    pub start_error_clear_secs: u32,

    /// Delay between the player connection opening and the `identify`
    /// message.
    pub identify_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_players: 3,
            question_countdown_secs: 5,
            start_error_clear_secs: 3,
            identify_delay: Duration::from_millis(700),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.min_players, 3);
        assert_eq!(config.question_countdown_secs, 5);
        assert_eq!(config.start_error_clear_secs, 3);
        assert_eq!(config.identify_delay, Duration::from_millis(700));
    }
}
