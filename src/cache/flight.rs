use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::timeout;

/// Identifies one independently-refreshed collection. Reviews are keyed per
/// restaurant: refreshing one restaurant's reviews never blocks another's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshKey {
    Restaurants,
    Reviews(i64),
}

/// Per-key async mutexes coordinating refresh operations.
///
/// Callers that find a refresh in flight park on the key's mutex instead of
/// starting a second fetch; once the holder commits, waiters wake, re-check
/// freshness, and normally perform no network call at all.
#[derive(Default)]
pub struct RefreshLocks {
    inner: Mutex<HashMap<RefreshKey, Arc<Mutex<()>>>>,
}

impl RefreshLocks {
    async fn lock_for(&self, key: RefreshKey) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock().await;
        // Sweep entries nobody holds or waits on (the map owns the only Arc);
        // they are recreated on demand, so the map stays bounded by the set
        // of keys currently in use rather than every key ever seen.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key).or_default().clone()
    }

    #[cfg(test)]
    async fn tracked_keys(&self) -> usize {
        self.inner.lock().await.len()
    }

    /// Acquire the refresh lock for `key`, waiting as long as it takes.
    /// The holder's work is itself bounded by the HTTP request timeout.
    pub async fn acquire(&self, key: RefreshKey) -> OwnedMutexGuard<()> {
        self.lock_for(key).await.lock_owned().await
    }

    /// Acquire the refresh lock for `key`, giving up after `wait`.
    /// Returns None on timeout so the caller can fall back to local data.
    pub async fn acquire_timeout(
        &self,
        key: RefreshKey,
        wait: Duration,
    ) -> Option<OwnedMutexGuard<()>> {
        let lock = self.lock_for(key).await;
        timeout(wait, lock.lock_owned()).await.ok()
    }
}
