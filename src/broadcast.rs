//! Broadcast gateway
//!
//! One broadcast channel per room code. Delivery is fire-and-forget:
//! best effort to currently subscribed receivers, no acknowledgment and
//! no backpressure. A lagging or disconnected client simply misses
//! deltas until it rejoins and receives a fresh snapshot.

use crate::types::Notice;
use std::collections::HashMap;
use tokio::sync::{RwLock, broadcast};
use tracing::debug;

#[derive(Debug)]
pub struct BroadcastGateway {
    channels: RwLock<HashMap<String, broadcast::Sender<Notice>>>,
    capacity: usize,
}

impl BroadcastGateway {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Subscribe to a room's notices, creating its channel on first use.
    pub async fn subscribe(&self, code: &str) -> broadcast::Receiver<Notice> {
        let mut channels = self.channels.write().await;
        channels
            .entry(code.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Emit a notice to every connection subscribed to the room.
    pub async fn emit(&self, code: &str, notice: Notice) {
        let channels = self.channels.read().await;
        match channels.get(code) {
            Some(tx) => {
                // A send error just means nobody is listening right now.
                let _ = tx.send(notice);
            }
            None => debug!(code, "notice dropped, room has no channel"),
        }
    }

    pub async fn subscriber_count(&self, code: &str) -> usize {
        self.channels
            .read()
            .await
            .get(code)
            .map_or(0, |tx| tx.receiver_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Phase;

    #[tokio::test]
    async fn notices_reach_all_room_subscribers() {
        let gateway = BroadcastGateway::new(8);
        let mut a = gateway.subscribe("R1").await;
        let mut b = gateway.subscribe("R1").await;
        let mut other = gateway.subscribe("R2").await;

        gateway
            .emit(
                "R1",
                Notice::PhaseChange {
                    phase: Phase::Play,
                    phase_end: None,
                },
            )
            .await;

        assert!(matches!(
            a.recv().await.unwrap(),
            Notice::PhaseChange { phase: Phase::Play, .. }
        ));
        assert!(matches!(
            b.recv().await.unwrap(),
            Notice::PhaseChange { phase: Phase::Play, .. }
        ));
        // Rooms are independent.
        assert!(other.try_recv().is_err());
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_a_no_op() {
        let gateway = BroadcastGateway::new(8);
        gateway.emit("GHOST", Notice::Reset { phase: Phase::Lobby }).await;
        assert_eq!(gateway.subscriber_count("GHOST").await, 0);
    }
}
