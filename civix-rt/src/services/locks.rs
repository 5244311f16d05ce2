//! Per-report mutual exclusion
//!
//! Every read-modify-write of a report (content edit, status transition,
//! delete, address resolution) runs while holding that report's lock, so
//! writes to one report are serialized while different reports proceed in
//! parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Registry size above which idle entries are pruned on acquire
const PRUNE_THRESHOLD: usize = 1024;

/// Lock registry keyed by report id
#[derive(Default)]
pub struct RecordLocks {
    locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `id`; released when the guard drops
    pub async fn acquire(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > PRUNE_THRESHOLD {
                prune_idle(&mut locks);
            }
            Arc::clone(locks.entry(id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop registry entries nobody holds or waits on
    pub fn prune(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        prune_idle(&mut locks);
    }

    /// Number of registry entries
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Only the registry references an idle lock, so a strong count of one means
// no guard and no waiter exists.
fn prune_idle(locks: &mut HashMap<Uuid, Arc<AsyncMutex<()>>>) {
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_id_is_exclusive() {
        let locks = Arc::new(RecordLocks::new());
        let id = Uuid::new_v4();

        let guard = locks.acquire(id).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender should acquire after release")
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let locks = RecordLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire(Uuid::new_v4())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_prune_keeps_held_locks() {
        let locks = RecordLocks::new();
        let held = Uuid::new_v4();

        let _guard = locks.acquire(held).await;
        drop(locks.acquire(Uuid::new_v4()).await);
        assert_eq!(locks.len(), 2);

        locks.prune();
        assert_eq!(locks.len(), 1);
    }
}
