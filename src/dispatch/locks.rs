use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::{OrganizationId, UrlId};

/// Unit of rebuild work. At most one rebuild per key runs at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RebuildKey {
    Url(UrlId),
    Organization(OrganizationId),
}

impl std::fmt::Display for RebuildKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(id) => write!(f, "url:{}", id),
            Self::Organization(id) => write!(f, "organization:{}", id),
        }
    }
}

/// Per-key async mutexes. Callers for the same key queue up; other keys proceed.
#[derive(Clone, Default)]
pub struct RebuildLocks {
    locks: Arc<DashMap<RebuildKey, Arc<Mutex<()>>>>,
}

impl RebuildLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: RebuildKey) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(key).or_default().clone();
        lock.lock_owned().await
    }

    pub fn is_locked(&self, key: RebuildKey) -> bool {
        self.locks
            .get(&key)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Forget keys nobody holds or waits for.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = RebuildLocks::new();
        let guard = locks.acquire(RebuildKey::Url(1)).await;
        assert!(locks.is_locked(RebuildKey::Url(1)));
        assert!(!locks.is_locked(RebuildKey::Url(2)));
        assert!(!locks.is_locked(RebuildKey::Organization(1)));
        drop(guard);
        assert!(!locks.is_locked(RebuildKey::Url(1)));
    }

    #[tokio::test]
    async fn test_waiter_proceeds_after_release() {
        let locks = RebuildLocks::new();
        let guard = locks.acquire(RebuildKey::Organization(7)).await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.acquire(RebuildKey::Organization(7)).await;
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_prune_drops_idle_keys() {
        let locks = RebuildLocks::new();
        let held = locks.acquire(RebuildKey::Url(1)).await;
        drop(locks.acquire(RebuildKey::Url(2)).await);
        locks.prune();
        assert_eq!(locks.len(), 1);
        drop(held);
        locks.prune();
        assert!(locks.is_empty());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(RebuildKey::Url(3).to_string(), "url:3");
        assert_eq!(RebuildKey::Organization(4).to_string(), "organization:4");
    }
}
