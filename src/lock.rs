//! Lease-based advisory lock over a conditional-write store.
//!
//! State machine per resource id: Unlocked → Locked(owner, expiry) →
//! Unlocked. Expiry is lazy: nothing sweeps stale records, they are
//! simply acquirable again once their timestamp has passed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::error::LockError;
use crate::store::traits::LockStore;

#[derive(Clone)]
pub struct LeaseLock {
    store: Arc<dyn LockStore>,
    ttl: Duration,
}

impl LeaseLock {
    pub fn new(store: Arc<dyn LockStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Fresh owner id for one acquire/release cycle.
    pub fn new_owner_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Attempt to take the lease. `false` means another live owner
    /// holds it — an expected contention outcome, not an error.
    pub async fn acquire(&self, resource: &str, owner: &str) -> Result<bool, LockError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::milliseconds(self.ttl.as_millis() as i64);
        self.store.try_acquire(resource, owner, now, expires_at).await
    }

    /// Give the lease back. `false` means ownership no longer matched:
    /// the lease expired and was stolen, or was never held.
    pub async fn release(&self, resource: &str, owner: &str) -> Result<bool, LockError> {
        self.store.release(resource, owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryLockStore;

    fn lock(ttl: Duration) -> (Arc<MemoryLockStore>, LeaseLock) {
        let store = Arc::new(MemoryLockStore::default());
        let lease = LeaseLock::new(store.clone(), ttl);
        (store, lease)
    }

    #[tokio::test]
    async fn second_owner_is_rejected_without_blocking() {
        let (_, lease) = lock(Duration::from_secs(30));
        assert!(lease.acquire("allowlist", "owner-1").await.unwrap());
        assert!(!lease.acquire("allowlist", "owner-2").await.unwrap());
    }

    #[tokio::test]
    async fn expired_lease_is_reclaimable() {
        let (_, lease) = lock(Duration::ZERO);
        assert!(lease.acquire("allowlist", "owner-1").await.unwrap());

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(lease.acquire("allowlist", "owner-2").await.unwrap());
    }

    #[tokio::test]
    async fn release_requires_ownership() {
        let (store, lease) = lock(Duration::from_secs(30));
        assert!(lease.acquire("allowlist", "owner-1").await.unwrap());

        assert!(!lease.release("allowlist", "owner-2").await.unwrap());
        assert_eq!(store.holder("allowlist").as_deref(), Some("owner-1"));

        assert!(lease.release("allowlist", "owner-1").await.unwrap());
        assert_eq!(store.holder("allowlist"), None);
    }

    #[tokio::test]
    async fn release_after_reacquire_cycle() {
        let (_, lease) = lock(Duration::from_secs(30));
        assert!(lease.acquire("allowlist", "owner-1").await.unwrap());
        assert!(lease.release("allowlist", "owner-1").await.unwrap());
        assert!(lease.acquire("allowlist", "owner-2").await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_acquires_admit_exactly_one_owner() {
        let (_, lease) = lock(Duration::from_secs(30));

        let mut handles = Vec::new();
        for i in 0..8 {
            let lease = lease.clone();
            handles.push(tokio::spawn(async move {
                lease.acquire("allowlist", &format!("owner-{i}")).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
