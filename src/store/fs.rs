//! Filesystem object store — containers are directories under a root,
//! keys are relative paths within them.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::store::traits::ObjectStore;

pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, container: &str, key: &str) -> PathBuf {
        self.root.join(container).join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(container, key);
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound {
                    container: container.to_string(),
                    key: key.to_string(),
                }
            } else {
                StorageError::Read {
                    container: container.to_string(),
                    key: key.to_string(),
                    reason: e.to_string(),
                }
            }
        })
    }

    async fn put(&self, container: &str, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.object_path(container, key);
        let write_err = |e: std::io::Error| StorageError::Write {
            container: container.to_string(),
            key: key.to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::write(&path, bytes).await.map_err(write_err)
    }

    async fn copy(&self, container: &str, from: &str, to: &str) -> Result<(), StorageError> {
        let source = self.object_path(container, from);
        let target = self.object_path(container, to);

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Write {
                    container: container.to_string(),
                    key: to.to_string(),
                    reason: e.to_string(),
                })?;
        }

        tokio::fs::copy(&source, &target).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound {
                    container: container.to_string(),
                    key: from.to_string(),
                }
            } else {
                StorageError::Write {
                    container: container.to_string(),
                    key: to.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;
        Ok(())
    }

    async fn delete(&self, container: &str, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(container, key);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| StorageError::Delete {
                container: container.to_string(),
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        store.put("inbound", "emails/x.eml", b"raw email").await.unwrap();
        let bytes = store.get("inbound", "emails/x.eml").await.unwrap();
        assert_eq!(bytes, b"raw email");
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let err = store.get("inbound", "emails/missing.eml").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn copy_then_delete_relocates() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        store.put("inbound", "emails/x.eml", b"raw").await.unwrap();
        store
            .copy("inbound", "emails/x.eml", "no_relevante/x.eml")
            .await
            .unwrap();
        store.delete("inbound", "emails/x.eml").await.unwrap();

        assert!(store.get("inbound", "emails/x.eml").await.is_err());
        assert_eq!(
            store.get("inbound", "no_relevante/x.eml").await.unwrap(),
            b"raw"
        );
    }

    #[tokio::test]
    async fn copy_missing_source_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        let err = store
            .copy("inbound", "emails/none.eml", "no_relevante/none.eml")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}
