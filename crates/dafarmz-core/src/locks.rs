//! Per-owner serialization of read-modify-write commands.
//!
//! Two commands for the same owner (say, a double-clicked harvest) would
//! otherwise both load the same plot, both harvest it, and both write it
//! back. Holding an [`OwnerLocks`] guard for the whole command makes the
//! second one see the first one's result. Commands for different owners
//! never wait on each other.
//!
//! This only coordinates tasks inside one process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use dafarmz_types::OwnerId;

/// Number of idle entries tolerated before the map is pruned.
const PRUNE_THRESHOLD: usize = 1024;

/// A lazily grown set of async mutexes, one per owner.
#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: Mutex<HashMap<OwnerId, Arc<AsyncMutex<()>>>>,
}

impl OwnerLocks {
    /// An empty lock set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `owner`'s documents.
    ///
    /// The returned guard releases the lock when dropped.
    pub async fn lock(&self, owner: OwnerId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() >= PRUNE_THRESHOLD {
                // Only this map holds idle entries.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(owner).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of owners currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_owner_waits() {
        let locks = Arc::new(OwnerLocks::new());
        let guard = locks.lock(OwnerId(1)).await;

        let contender = Arc::clone(&locks);
        let mut waiting = tokio::spawn(async move {
            let _guard = contender.lock(OwnerId(1)).await;
        });

        let blocked = tokio::time::timeout(Duration::from_millis(50), &mut waiting).await;
        assert!(blocked.is_err(), "second lock must wait for the first");

        drop(guard);
        let finished = tokio::time::timeout(Duration::from_secs(1), waiting).await;
        assert!(finished.is_ok());
    }

    #[tokio::test]
    async fn different_owners_do_not_block() {
        let locks = OwnerLocks::new();
        let _a = locks.lock(OwnerId(1)).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock(OwnerId(2))).await;
        assert!(b.is_ok());
        assert_eq!(locks.tracked(), 2);
    }
}
