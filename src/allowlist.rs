//! Allow-list provider — who counts as a booking sender.
//!
//! Two sources, layered: a paginated scan of the durable table, and a
//! cached artifact in object storage whose refresh and read are
//! serialized by the advisory lock so concurrent invocations do not
//! rebuild it over each other.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{AllowListError, Error, LockError, StorageError};
use crate::lock::LeaseLock;
use crate::notification::RawEmailLocation;
use crate::store::traits::{AllowListStore, ObjectStore};

/// The set of sender addresses considered relevant. Rebuilt per
/// invocation (or per lock window); never persisted back to the table.
pub type AllowList = HashSet<String>;

// ── Table scan ──────────────────────────────────────────────────────

pub struct AllowListProvider {
    table: Arc<dyn AllowListStore>,
    page_size: usize,
}

impl AllowListProvider {
    pub fn new(table: Arc<dyn AllowListStore>, page_size: usize) -> Self {
        Self { table, page_size }
    }

    /// Full table scan, failing open: a provider outage yields an empty
    /// set (archive everything) rather than aborting the invocation.
    pub async fn load(&self) -> AllowList {
        match self.scan_all().await {
            Ok(list) => {
                debug!(count = list.len(), "Allow-list loaded from table");
                list
            }
            Err(e) => {
                error!(error = %e, "Allow-list scan failed; continuing with empty set");
                AllowList::new()
            }
        }
    }

    /// Scan every page, following continuation cursors until exhausted.
    pub(crate) async fn scan_all(&self) -> Result<AllowList, AllowListError> {
        let mut list = AllowList::new();
        let mut cursor = None;
        loop {
            let page = self.table.scan_page(cursor, self.page_size).await?;
            list.extend(page.addresses);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(list)
    }
}

// ── Locked artifact read/refresh ────────────────────────────────────

/// Settings for the locked read path.
#[derive(Debug, Clone)]
pub struct LockedReadConfig {
    /// Resource id the advisory lock guards.
    pub resource: String,
    /// Location of the cached allow-list artifact.
    pub artifact: RawEmailLocation,
    /// Acquire attempts before giving up.
    pub max_retries: u32,
    /// Fixed delay between acquire attempts.
    pub retry_delay: Duration,
}

pub struct LockedAllowList {
    provider: AllowListProvider,
    objects: Arc<dyn ObjectStore>,
    lock: LeaseLock,
    config: LockedReadConfig,
}

impl LockedAllowList {
    pub fn new(
        provider: AllowListProvider,
        objects: Arc<dyn ObjectStore>,
        lock: LeaseLock,
        config: LockedReadConfig,
    ) -> Self {
        Self {
            provider,
            objects,
            lock,
            config,
        }
    }

    /// The allow-list for this invocation.
    ///
    /// Reads the cached artifact under the lock; when the artifact has
    /// not been materialized yet, rebuilds it from the table (also
    /// under the lock). Fails open to an empty set on lock timeout or
    /// refresh failure, consistent with [`AllowListProvider::load`].
    pub async fn current(&self) -> AllowList {
        match self.read_with_lock().await {
            Ok(list) if !list.is_empty() => return list,
            Ok(_) => debug!("Allow-list artifact empty or absent; refreshing"),
            Err(e) => {
                error!(error = %e, "Locked allow-list read failed; continuing with empty set");
                return AllowList::new();
            }
        }

        match self.refresh_with_lock().await {
            Ok(list) => list,
            Err(e) => {
                error!(error = %e, "Allow-list refresh failed; continuing with empty set");
                AllowList::new()
            }
        }
    }

    /// Read the cached artifact under the advisory lock.
    ///
    /// An absent artifact is not an error; it yields an empty set. The
    /// lock is released whether the read succeeded, failed, or found
    /// nothing.
    pub async fn read_with_lock(&self) -> Result<AllowList, Error> {
        let owner = LeaseLock::new_owner_id();
        self.acquire_or_timeout(&owner).await?;

        let result = self.read_artifact().await;
        self.release_quietly(&owner).await;
        result
    }

    /// Rebuild the artifact from the table under the advisory lock.
    ///
    /// A scan failure propagates instead of failing open here: caching
    /// an empty artifact would poison every concurrent reader.
    pub async fn refresh_with_lock(&self) -> Result<AllowList, Error> {
        let owner = LeaseLock::new_owner_id();
        self.acquire_or_timeout(&owner).await?;

        let result = self.rebuild_artifact().await;
        self.release_quietly(&owner).await;
        result
    }

    /// Retry loop with fixed delay. Contention is expected and logged
    /// at debug; exhausting the retries is the terminal
    /// `LockError::Timeout`, distinct from any read failure.
    async fn acquire_or_timeout(&self, owner: &str) -> Result<(), Error> {
        for attempt in 1..=self.config.max_retries {
            if self.lock.acquire(&self.config.resource, owner).await? {
                debug!(resource = %self.config.resource, attempt, "Lock acquired");
                return Ok(());
            }
            debug!(resource = %self.config.resource, attempt, "Lock contended; retrying");
            if attempt < self.config.max_retries {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        Err(Error::Lock(LockError::Timeout {
            resource: self.config.resource.clone(),
            attempts: self.config.max_retries,
        }))
    }

    async fn release_quietly(&self, owner: &str) {
        match self.lock.release(&self.config.resource, owner).await {
            Ok(true) => {}
            Ok(false) => warn!(
                resource = %self.config.resource,
                "Lock no longer owned at release; lease expired and was taken over"
            ),
            Err(e) => warn!(error = %e, "Lock release failed; lease will expire on its own"),
        }
    }

    async fn read_artifact(&self) -> Result<AllowList, Error> {
        let artifact = &self.config.artifact;
        let raw = match self.objects.get(&artifact.container, &artifact.key).await {
            Ok(raw) => raw,
            Err(StorageError::NotFound { .. }) => {
                debug!(key = %artifact.key, "Allow-list artifact absent");
                return Ok(AllowList::new());
            }
            Err(e) => return Err(e.into()),
        };

        let addresses: Vec<String> = serde_json::from_slice(&raw)
            .map_err(|e| AllowListError::Artifact(e.to_string()))?;
        Ok(addresses.into_iter().collect())
    }

    async fn rebuild_artifact(&self) -> Result<AllowList, Error> {
        let list = self.provider.scan_all().await?;

        let artifact = &self.config.artifact;
        let json = serde_json::to_vec(&list)
            .map_err(|e| AllowListError::Artifact(e.to_string()))?;
        self.objects
            .put(&artifact.container, &artifact.key, &json)
            .await?;

        info!(count = list.len(), key = %artifact.key, "Allow-list artifact refreshed");
        Ok(list)
    }
}
