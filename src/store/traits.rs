//! Collaborator seams — pure I/O, no triage logic.
//!
//! The pipeline owns the decision path; everything that talks to a
//! backing service sits behind one of these traits so tests (and local
//! runs) can swap in the in-memory backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::dispatch::OutcomeMessage;
use crate::error::{AllowListError, LockError, PublishError, StorageError};

/// Object storage: raw email bytes in, archive relocation out.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object's bytes. Absent objects are `StorageError::NotFound`.
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Write an object, replacing any previous content.
    async fn put(&self, container: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Copy an object within the same container.
    async fn copy(&self, container: &str, from: &str, to: &str) -> Result<(), StorageError>;

    /// Delete an object.
    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError>;
}

/// Downstream queue for emails judged relevant.
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    async fn publish(&self, message: &OutcomeMessage) -> Result<(), PublishError>;
}

/// One page of an allow-list table scan.
#[derive(Debug, Clone)]
pub struct ScanPage {
    pub addresses: Vec<String>,
    /// Continuation token; `None` once the scan is exhausted.
    pub next_cursor: Option<i64>,
}

/// Durable table of allowed sender addresses.
#[async_trait]
pub trait AllowListStore: Send + Sync {
    async fn scan_page(
        &self,
        cursor: Option<i64>,
        limit: usize,
    ) -> Result<ScanPage, AllowListError>;
}

/// Conditional-write backing for the advisory lock.
///
/// Exclusion lives entirely in the durable store: holders may be
/// separate processes, so no in-process mutex can substitute.
#[async_trait]
pub trait LockStore: Send + Sync {
    /// Single atomic conditional write: create the lock record if none
    /// exists for `resource`, or take over a record whose expiry is at
    /// or before `now`. Returns `false` while a live owner holds it.
    /// Never implemented as read-then-write.
    async fn try_acquire(
        &self,
        resource: &str,
        owner: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, LockError>;

    /// Conditional delete on owner match. Returns `false` when the
    /// record is held by someone else (or no longer exists).
    async fn release(&self, resource: &str, owner: &str) -> Result<bool, LockError>;
}
