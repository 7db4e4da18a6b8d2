//! Per-user single-flight gate
//!
//! Concurrent sync triggers for one user (webhook, manual, scheduled) must
//! coalesce instead of racing on `synced_at` and duplicating external events.
//! Each user gets a keyed async mutex; holding the guard serializes
//! push/pull/cleanup for that user while leaving other users untouched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async mutex over user ids
#[derive(Default)]
pub struct SyncGate {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SyncGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the user's lock, waiting behind any in-flight sync operation
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // A held or awaited lock has guard/waiter clones, so only idle
            // entries reach strong_count 1; sweeping them here keeps the map
            // bounded by concurrent users rather than every user ever seen.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(user_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked_users(&self) -> usize {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }
}
