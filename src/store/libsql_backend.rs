//! libSQL backend — the durable key-value tables.
//!
//! Backs both the allow-list scan and the advisory lock's conditional
//! writes. Supports local file and in-memory databases; the connection
//! is `Send + Sync` and reused for all operations.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::info;

use crate::error::{AllowListError, DatabaseError, LockError};
use crate::store::traits::{AllowListStore, LockStore, ScanPage};

/// Table holding lock records, one row per resource id.
const LEASE_TABLE: &str = "leases";

/// libSQL-backed durable store.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
    table_name: String,
}

impl LibSqlStore {
    /// Open (or create) a local database file and initialize the schema.
    ///
    /// `table_name` is the allow-list table; callers get it from
    /// configuration, with a fixed default when unset.
    pub async fn open(path: &Path, table_name: &str) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Open(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to open database: {e}")))?;

        let store = Self::from_database(db, table_name)?;
        store.init_schema().await?;
        info!(path = %path.display(), table = table_name, "Durable store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory(table_name: &str) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| DatabaseError::Open(format!("Failed to create in-memory database: {e}")))?;

        let store = Self::from_database(db, table_name)?;
        store.init_schema().await?;
        Ok(store)
    }

    fn from_database(db: Database, table_name: &str) -> Result<Self, DatabaseError> {
        // Table names cannot be bound as parameters; restrict to
        // identifier characters before splicing into SQL.
        if table_name.is_empty()
            || !table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(DatabaseError::Open(format!(
                "Invalid table name: {table_name}"
            )));
        }

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Open(format!("Failed to create connection: {e}")))?;

        Ok(Self {
            db: Arc::new(db),
            conn,
            table_name: table_name.to_string(),
        })
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        let allow_list = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE
            )",
            self.table_name
        );
        let leases = format!(
            "CREATE TABLE IF NOT EXISTS {LEASE_TABLE} (
                resource TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                expires_at_ms INTEGER NOT NULL
            )"
        );

        for sql in [allow_list, leases] {
            self.conn
                .execute(&sql, ())
                .await
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
        }
        Ok(())
    }

    /// Insert an address into the allow-list table. Duplicates are
    /// ignored (uniqueness is enforced by the schema).
    pub async fn insert_address(&self, email: &str) -> Result<(), DatabaseError> {
        self.conn
            .execute(
                &format!(
                    "INSERT OR IGNORE INTO {} (email) VALUES (?1)",
                    self.table_name
                ),
                params![email],
            )
            .await
            .map_err(|e| DatabaseError::Query(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl AllowListStore for LibSqlStore {
    async fn scan_page(
        &self,
        cursor: Option<i64>,
        limit: usize,
    ) -> Result<ScanPage, AllowListError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT id, email FROM {} WHERE id > ?1 ORDER BY id LIMIT ?2",
                    self.table_name
                ),
                params![cursor.unwrap_or(0), limit as i64],
            )
            .await
            .map_err(|e| AllowListError::Scan(e.to_string()))?;

        let mut addresses = Vec::new();
        let mut last_id = None;
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AllowListError::Scan(e.to_string()))?
        {
            let id: i64 = row.get(0).map_err(|e| AllowListError::Scan(e.to_string()))?;
            let email: String = row.get(1).map_err(|e| AllowListError::Scan(e.to_string()))?;
            last_id = Some(id);
            addresses.push(email);
        }

        let next_cursor = if addresses.len() == limit {
            last_id
        } else {
            None
        };
        Ok(ScanPage {
            addresses,
            next_cursor,
        })
    }
}

#[async_trait]
impl LockStore for LibSqlStore {
    async fn try_acquire(
        &self,
        resource: &str,
        owner: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, LockError> {
        // One upsert: inserts when no record exists, steals the row when
        // the standing lease has expired, and affects zero rows while a
        // live owner holds it.
        let affected = self
            .conn
            .execute(
                &format!(
                    "INSERT INTO {LEASE_TABLE} (resource, owner, expires_at_ms)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(resource) DO UPDATE
                     SET owner = excluded.owner, expires_at_ms = excluded.expires_at_ms
                     WHERE {LEASE_TABLE}.expires_at_ms <= ?4"
                ),
                params![
                    resource,
                    owner,
                    expires_at.timestamp_millis(),
                    now.timestamp_millis()
                ],
            )
            .await
            .map_err(|e| LockError::Store(e.to_string()))?;
        Ok(affected > 0)
    }

    async fn release(&self, resource: &str, owner: &str) -> Result<bool, LockError> {
        let affected = self
            .conn
            .execute(
                &format!("DELETE FROM {LEASE_TABLE} WHERE resource = ?1 AND owner = ?2"),
                params![resource, owner],
            )
            .await
            .map_err(|e| LockError::Store(e.to_string()))?;
        Ok(affected > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> LibSqlStore {
        LibSqlStore::new_memory("valid_emails").await.unwrap()
    }

    #[tokio::test]
    async fn scan_paginates_until_exhausted() {
        let store = store().await;
        for addr in ["a@x.com", "b@x.com", "c@x.com", "d@x.com", "e@x.com"] {
            store.insert_address(addr).await.unwrap();
        }

        let mut collected = Vec::new();
        let mut cursor = None;
        let mut pages = 0;
        loop {
            let page = store.scan_page(cursor, 2).await.unwrap();
            collected.extend(page.addresses);
            pages += 1;
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(collected.len(), 5);
        assert!(pages >= 3);
    }

    #[tokio::test]
    async fn duplicate_addresses_collapse() {
        let store = store().await;
        store.insert_address("a@x.com").await.unwrap();
        store.insert_address("a@x.com").await.unwrap();
        let page = store.scan_page(None, 10).await.unwrap();
        assert_eq!(page.addresses, vec!["a@x.com"]);
    }

    #[tokio::test]
    async fn rejects_non_identifier_table_name() {
        let result = LibSqlStore::new_memory("valid; DROP TABLE x").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn acquire_is_exclusive_while_lease_lives() {
        let store = store().await;
        let now = Utc::now();
        let expires = now + Duration::seconds(30);

        assert!(store.try_acquire("allowlist", "owner-1", now, expires).await.unwrap());
        assert!(!store.try_acquire("allowlist", "owner-2", now, expires).await.unwrap());
    }

    #[tokio::test]
    async fn expired_lease_is_acquirable_without_release() {
        let store = store().await;
        let past = Utc::now() - Duration::seconds(60);
        assert!(
            store
                .try_acquire("allowlist", "owner-1", past, past + Duration::seconds(1))
                .await
                .unwrap()
        );

        let now = Utc::now();
        assert!(
            store
                .try_acquire("allowlist", "owner-2", now, now + Duration::seconds(30))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn release_by_non_owner_keeps_the_lease() {
        let store = store().await;
        let now = Utc::now();
        let expires = now + Duration::seconds(30);
        assert!(store.try_acquire("allowlist", "owner-1", now, expires).await.unwrap());

        assert!(!store.release("allowlist", "owner-2").await.unwrap());
        // Still held by owner-1.
        assert!(!store.try_acquire("allowlist", "owner-3", now, expires).await.unwrap());

        assert!(store.release("allowlist", "owner-1").await.unwrap());
        assert!(store.try_acquire("allowlist", "owner-3", now, expires).await.unwrap());
    }

    #[tokio::test]
    async fn locks_on_distinct_resources_are_independent() {
        let store = store().await;
        let now = Utc::now();
        let expires = now + Duration::seconds(30);
        assert!(store.try_acquire("res-a", "owner-1", now, expires).await.unwrap());
        assert!(store.try_acquire("res-b", "owner-2", now, expires).await.unwrap());
    }
}
