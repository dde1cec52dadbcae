//! In-memory collaborators for tests and local runs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::dispatch::OutcomeMessage;
use crate::error::{AllowListError, LockError, PublishError, StorageError};
use crate::store::traits::{
    AllowListStore, LockStore, ObjectStore, QueuePublisher, ScanPage,
};

// ── Object store ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn insert(&self, container: &str, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert((container.to_string(), key.to_string()), bytes.to_vec());
    }

    pub fn contains(&self, container: &str, key: &str) -> bool {
        self.objects
            .lock()
            .unwrap()
            .contains_key(&(container.to_string(), key.to_string()))
    }

    pub fn get_sync(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, container: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, k)| k.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.get_sync(container, key)
            .ok_or_else(|| StorageError::NotFound {
                container: container.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(&self, container: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.insert(container, key, bytes);
        Ok(())
    }

    async fn copy(&self, container: &str, from: &str, to: &str) -> Result<(), StorageError> {
        let bytes = self.get(container, from).await?;
        self.insert(container, to, &bytes);
        Ok(())
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
        self.objects
            .lock()
            .unwrap()
            .remove(&(container.to_string(), key.to_string()))
            .map(|_| ())
            .ok_or_else(|| StorageError::Delete {
                container: container.to_string(),
                key: key.to_string(),
                reason: "object does not exist".to_string(),
            })
    }
}

// ── Queue ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryQueue {
    published: Mutex<Vec<OutcomeMessage>>,
    fail_publishes: AtomicBool,
}

impl MemoryQueue {
    /// Make every subsequent publish fail with a transport error.
    pub fn fail_publishes(&self) {
        self.fail_publishes.store(true, Ordering::Relaxed);
    }

    pub fn published(&self) -> Vec<OutcomeMessage> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueuePublisher for MemoryQueue {
    async fn publish(&self, message: &OutcomeMessage) -> Result<(), PublishError> {
        if self.fail_publishes.load(Ordering::Relaxed) {
            return Err(PublishError::Transport {
                queue: "memory".to_string(),
                reason: "publish failure injected".to_string(),
            });
        }
        self.published.lock().unwrap().push(message.clone());
        Ok(())
    }
}

// ── Allow-list table ────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryAllowListStore {
    addresses: Mutex<Vec<String>>,
    fail_scans: AtomicBool,
}

impl MemoryAllowListStore {
    pub fn with_addresses(addresses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            addresses: Mutex::new(addresses.into_iter().map(Into::into).collect()),
            fail_scans: AtomicBool::new(false),
        }
    }

    /// Make every subsequent scan fail, for fail-open tests.
    pub fn fail_scans(&self) {
        self.fail_scans.store(true, Ordering::Relaxed);
    }
}

#[async_trait]
impl AllowListStore for MemoryAllowListStore {
    async fn scan_page(
        &self,
        cursor: Option<i64>,
        limit: usize,
    ) -> Result<ScanPage, AllowListError> {
        if self.fail_scans.load(Ordering::Relaxed) {
            return Err(AllowListError::Scan("scan failure injected".to_string()));
        }

        let addresses = self.addresses.lock().unwrap();
        let start = cursor.map_or(0, |c| c as usize);
        let page: Vec<String> = addresses.iter().skip(start).take(limit).cloned().collect();
        let next = start + page.len();
        let next_cursor = if next < addresses.len() {
            Some(next as i64)
        } else {
            None
        };
        Ok(ScanPage {
            addresses: page,
            next_cursor,
        })
    }
}

// ── Lock store ──────────────────────────────────────────────────────

/// Lock records under one mutex; the whole acquire check-and-set runs
/// inside a single critical section, mirroring the durable store's
/// atomic conditional write.
#[derive(Default)]
pub struct MemoryLockStore {
    leases: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl MemoryLockStore {
    /// Seed a lease, for contention tests.
    pub fn seed(&self, resource: &str, owner: &str, expires_at: DateTime<Utc>) {
        self.leases
            .lock()
            .unwrap()
            .insert(resource.to_string(), (owner.to_string(), expires_at));
    }

    pub fn holder(&self, resource: &str) -> Option<String> {
        self.leases
            .lock()
            .unwrap()
            .get(resource)
            .map(|(owner, _)| owner.clone())
    }
}

#[async_trait]
impl LockStore for MemoryLockStore {
    async fn try_acquire(
        &self,
        resource: &str,
        owner: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, LockError> {
        let mut leases = self.leases.lock().unwrap();
        let held = matches!(leases.get(resource), Some((_, standing_expiry)) if *standing_expiry > now);
        if held {
            return Ok(false);
        }
        leases.insert(resource.to_string(), (owner.to_string(), expires_at));
        Ok(true)
    }

    async fn release(&self, resource: &str, owner: &str) -> Result<bool, LockError> {
        let mut leases = self.leases.lock().unwrap();
        let owned = matches!(leases.get(resource), Some((holder, _)) if holder == owner);
        if owned {
            leases.remove(resource);
            return Ok(true);
        }
        Ok(false)
    }
}
