//! Persistence seam
//!
//! The registry consumes a document store through the [`Store`] trait:
//! room records, game records, and lifetime player stats. [`MemoryStore`]
//! is the bundled implementation; a database-backed store plugs in the
//! same way.

use crate::error::Result;
use crate::types::{GameRecord, RoomSession};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::RwLock;

/// Lifetime counters credited by finalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub points: i64,
    pub wins: u64,
}

pub trait Store: Send + Sync + 'static {
    fn load_room(&self, code: &str) -> impl Future<Output = Result<Option<RoomSession>>> + Send;

    fn save_room(&self, room: &RoomSession) -> impl Future<Output = Result<()>> + Send;

    fn load_game(&self, code: &str) -> impl Future<Output = Result<Option<GameRecord>>> + Send;

    fn save_game(&self, game: &GameRecord) -> impl Future<Output = Result<()>> + Send;

    fn delete_game(&self, code: &str) -> impl Future<Output = Result<()>> + Send;

    /// Add round points to a player's lifetime total, plus one win if they
    /// topped the round.
    fn credit_player(
        &self,
        player: &str,
        points: i64,
        win: bool,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// In-memory store, keyed by room code and player id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: RwLock<HashMap<String, RoomSession>>,
    games: RwLock<HashMap<String, GameRecord>>,
    stats: RwLock<HashMap<String, PlayerStats>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifetime stats for a player, if any were ever credited.
    pub async fn stats(&self, player: &str) -> Option<PlayerStats> {
        self.stats.read().await.get(player).copied()
    }
}

impl Store for MemoryStore {
    async fn load_room(&self, code: &str) -> Result<Option<RoomSession>> {
        Ok(self.rooms.read().await.get(code).cloned())
    }

    async fn save_room(&self, room: &RoomSession) -> Result<()> {
        self.rooms
            .write()
            .await
            .insert(room.code.clone(), room.clone());
        Ok(())
    }

    async fn load_game(&self, code: &str) -> Result<Option<GameRecord>> {
        Ok(self.games.read().await.get(code).cloned())
    }

    async fn save_game(&self, game: &GameRecord) -> Result<()> {
        self.games
            .write()
            .await
            .insert(game.room.clone(), game.clone());
        Ok(())
    }

    async fn delete_game(&self, code: &str) -> Result<()> {
        self.games.write().await.remove(code);
        Ok(())
    }

    async fn credit_player(&self, player: &str, points: i64, win: bool) -> Result<()> {
        let mut stats = self.stats.write().await;
        let entry = stats.entry(player.to_string()).or_default();
        entry.points += points;
        if win {
            entry.wins += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Identity;

    #[tokio::test]
    async fn rooms_round_trip() {
        let store = MemoryStore::new();
        let host = Identity {
            id: "h".into(),
            username: "host".into(),
        };
        let room = RoomSession::new("AB23CD", &host);

        assert!(store.load_room("AB23CD").await.unwrap().is_none());
        store.save_room(&room).await.unwrap();
        assert_eq!(store.load_room("AB23CD").await.unwrap(), Some(room));
    }

    #[tokio::test]
    async fn game_records_can_be_deleted() {
        let store = MemoryStore::new();
        store.save_game(&GameRecord::new("AB23CD")).await.unwrap();
        assert!(store.load_game("AB23CD").await.unwrap().is_some());
        store.delete_game("AB23CD").await.unwrap();
        assert!(store.load_game("AB23CD").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn credits_accumulate() {
        let store = MemoryStore::new();
        store.credit_player("p1", 3, true).await.unwrap();
        store.credit_player("p1", 2, false).await.unwrap();
        assert_eq!(
            store.stats("p1").await,
            Some(PlayerStats { points: 5, wins: 1 })
        );
        assert_eq!(store.stats("p2").await, None);
    }
}
