//! `QuizClient` builder and session constructors.
//!
//! Ties the layers together: transport → codec → session → driver.

use quizlink_protocol::{LineCodec, Pin, PlayerId};
use quizlink_session::{HostSession, PlayerSession, SessionConfig};
use quizlink_tick::CountdownConfig;
use quizlink_transport::{Connection, WebSocketConnection};

use crate::driver::{SessionHandle, spawn_session};
use crate::{ClientConfig, QuizlinkError};

/// Builder for a [`QuizClient`].
///
/// # Example
///
/// ```rust,no_run
/// use quizlink::prelude::*;
///
/// # async fn demo() -> Result<(), QuizlinkError> {
/// let client = QuizClient::builder().server("quiz.example:8080").build();
/// let host = client.connect_host(Pin(4821)).await?;
/// host.start_game().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct QuizClientBuilder {
    config: ClientConfig,
}

impl QuizClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the game server authority (`host[:port]`).
    pub fn server(mut self, server: &str) -> Self {
        self.config.server = server.to_string();
        self
    }

    /// Connect over `wss://`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.config.secure = secure;
        self
    }

    pub fn command_buffer(mut self, size: usize) -> Self {
        self.config.command_buffer = size;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn countdown_config(mut self, config: CountdownConfig) -> Self {
        self.config.countdown = config;
        self
    }

    pub fn build(self) -> QuizClient {
        QuizClient {
            config: self.config,
        }
    }
}

/// Opens host and player sessions against one game server.
#[derive(Debug, Clone)]
pub struct QuizClient {
    config: ClientConfig,
}

impl QuizClient {
    /// Creates a new builder.
    pub fn builder() -> QuizClientBuilder {
        QuizClientBuilder::new()
    }

    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connects to the host endpoint of `pin` and starts a host session.
    pub async fn connect_host(&self, pin: Pin) -> Result<SessionHandle<HostSession>, QuizlinkError> {
        let url = self.config.host_url(pin);
        tracing::info!(%pin, %url, "connecting as host");
        let conn = WebSocketConnection::connect(&url).await?;
        Ok(self.host_over(conn, pin))
    }

    /// Connects to the player endpoint of `pin` and starts a player
    /// session identifying as `uid`.
    pub async fn connect_player(
        &self,
        pin: Pin,
        uid: PlayerId,
    ) -> Result<SessionHandle<PlayerSession>, QuizlinkError> {
        let url = self.config.play_url(pin);
        tracing::info!(%pin, %uid, %url, "connecting as player");
        let conn = WebSocketConnection::connect(&url).await?;
        Ok(self.player_over(conn, pin, uid))
    }

    /// Runs a host session over an already open connection.
    pub fn host_over<C: Connection>(&self, conn: C, pin: Pin) -> SessionHandle<HostSession> {
        let role = HostSession::new(pin, self.config.session.clone());
        self.spawn(conn, role)
    }

    /// Runs a player session over an already open connection.
    pub fn player_over<C: Connection>(
        &self,
        conn: C,
        pin: Pin,
        uid: PlayerId,
    ) -> SessionHandle<PlayerSession> {
        let role = PlayerSession::new(pin, uid, self.config.session.clone());
        self.spawn(conn, role)
    }

    fn spawn<C: Connection, R: quizlink_session::Role>(&self, conn: C, role: R) -> SessionHandle<R> {
        spawn_session(
            conn,
            role,
            LineCodec,
            self.config.countdown.clone(),
            self.config.command_buffer,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let client = QuizClient::builder()
            .server("10.0.0.5:9000")
            .secure(true)
            .command_buffer(4)
            .session_config(SessionConfig {
                min_players: 2,
                ..SessionConfig::default()
            })
            .build();

        let config = client.config();
        assert_eq!(config.server, "10.0.0.5:9000");
        assert!(config.secure);
        assert_eq!(config.command_buffer, 4);
        assert_eq!(config.session.min_players, 2);
        assert_eq!(config.host_url(Pin(1)), "wss://10.0.0.5:9000/api/host/1");
    }
}
