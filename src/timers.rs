//! Per-room deadline timers
//!
//! One cancellable scheduled task per room code. Scheduling is always
//! cancel-then-schedule, so at most one deadline callback can ever fire
//! per room per entry phase.

use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::debug;

#[derive(Debug, Default)]
pub struct TimerManager {
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `expiry` to run after `delay`, replacing any timer already
    /// registered for this room.
    pub async fn schedule<F>(&self, code: &str, delay: Duration, expiry: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut timers = self.timers.lock().await;
        if let Some(old) = timers.remove(code) {
            old.abort();
        }
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            expiry.await;
        });
        timers.insert(code.to_string(), handle);
        debug!(code, ?delay, "timer scheduled");
    }

    /// Cancel the room's timer if one is registered. Idempotent.
    pub async fn cancel(&self, code: &str) -> bool {
        match self.timers.lock().await.remove(code) {
            Some(handle) => {
                handle.abort();
                debug!(code, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether a live (not yet fired or aborted) timer exists for the room.
    pub async fn is_scheduled(&self, code: &str) -> bool {
        self.timers
            .lock()
            .await
            .get(code)
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let timers = TimerManager::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        timers
            .schedule("R1", Duration::from_secs(5), async move {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(timers.is_scheduled("R1").await);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timers.is_scheduled("R1").await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let timers = TimerManager::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        timers
            .schedule("R1", Duration::from_secs(5), async move {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert!(timers.cancel("R1").await);
        assert!(!timers.cancel("R1").await);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reschedule_replaces_the_old_deadline() {
        let timers = TimerManager::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        timers
            .schedule("R1", Duration::from_secs(2), async move {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let f = fired.clone();
        timers
            .schedule("R1", Duration::from_secs(10), async move {
                f.fetch_add(10, Ordering::SeqCst);
            })
            .await;

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn rooms_are_independent() {
        let timers = TimerManager::new();
        let fired = Arc::new(AtomicUsize::new(0));

        let f = fired.clone();
        timers
            .schedule("R1", Duration::from_secs(3), async move {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let f = fired.clone();
        timers
            .schedule("R2", Duration::from_secs(3), async move {
                f.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        timers.cancel("R1").await;
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
