//! The host's view of who is in the game.

use quizlink_protocol::{PlayerId, PlayerInfo};
use serde::Serialize;

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub name: String,
    pub score: u64,
    pub correct_count: u32,
    pub connected: bool,
    /// Set while a host action (such as a kick) awaits the server's
    /// confirmation.
    pub pending: bool,
}

impl From<PlayerInfo> for PlayerRecord {
    fn from(info: PlayerInfo) -> Self {
        Self {
            id: info.id,
            name: info.name,
            score: info.score,
            correct_count: info.correct_count,
            connected: true,
            pending: false,
        }
    }
}

/// Result of [`Roster::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new player was appended.
    Added,
    /// A known, disconnected player came back and was refreshed in place.
    Reconnected,
    /// The player is already present and connected. Nothing changed.
    Duplicate,
}

/// Players in join order. No two entries share an id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Roster {
    players: Vec<PlayerRecord>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player announced by `joined-player`.
    ///
    /// A reconnecting player keeps their position in the join order and
    /// their `pending` flag.
    pub fn join(&mut self, info: PlayerInfo) -> JoinOutcome {
        match self.players.iter_mut().find(|p| p.id == info.id) {
            Some(existing) if existing.connected => JoinOutcome::Duplicate,
            Some(existing) => {
                // A kick still in flight survives the reconnect.
                let pending = existing.pending;
                *existing = PlayerRecord::from(info);
                existing.pending = pending;
                JoinOutcome::Reconnected
            }
            None => {
                self.players.push(PlayerRecord::from(info));
                JoinOutcome::Added
            }
        }
    }

    /// Removes the first player named `name`.
    pub fn remove_by_name(&mut self, name: &str) -> Option<PlayerRecord> {
        let index = self.players.iter().position(|p| p.name == name)?;
        Some(self.players.remove(index))
    }

    /// Flags the first player named `name` as disconnected. Returns
    /// `false` when no such player exists.
    pub fn mark_disconnected(&mut self, name: &str) -> bool {
        match self.players.iter_mut().find(|p| p.name == name) {
            Some(player) => {
                player.connected = false;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: PlayerId) -> Option<&PlayerRecord> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut PlayerRecord> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.players.iter().filter(|p| p.connected).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlayerRecord> {
        self.players.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.players.iter().map(|p| p.name.as_str()).collect()
    }
}
