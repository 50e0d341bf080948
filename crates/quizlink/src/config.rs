//! Client configuration: where the game server lives and how sessions run.

use quizlink_protocol::Pin;
use quizlink_session::SessionConfig;
use quizlink_tick::CountdownConfig;

/// Settings shared by every session a [`QuizClient`](crate::QuizClient)
/// opens.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Game server authority, `host[:port]`.
    ///
    /// Default: `"localhost:8080"`.
    pub server: String,

    /// Use `wss://` instead of `ws://`. Needs the `tls` feature.
    pub secure: bool,

    /// Capacity of each session's command channel.
    ///
    /// Default: 32.
    pub command_buffer: usize,

    pub session: SessionConfig,

    pub countdown: CountdownConfig,
}

impl ClientConfig {
    fn scheme(&self) -> &'static str {
        if self.secure { "wss" } else { "ws" }
    }

    /// Endpoint a host connects to for the game `pin`.
    pub fn host_url(&self, pin: Pin) -> String {
        format!("{}://{}/api/host/{pin}", self.scheme(), self.server)
    }

    /// Endpoint a player connects to for the game `pin`.
    pub fn play_url(&self, pin: Pin) -> String {
        format!("{}://{}/api/play/{pin}", self.scheme(), self.server)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: "localhost:8080".to_string(),
            secure: false,
            command_buffer: 32,
            session: SessionConfig::default(),
            countdown: CountdownConfig::default(),
        }
    }
}
