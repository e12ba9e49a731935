use std::path::PathBuf;

use async_trait::async_trait;

use super::{ObjectStore, StorageError};

/// Disk-backed object store. Objects live under `root` and are served
/// statically under `<public_base>/<key>`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base: String,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf, public_base: impl ToString) -> LocalObjectStore {
        LocalObjectStore {
            root,
            public_base: public_base.to_string().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, bytes: &[u8], _mime_type: &str) -> Result<String, StorageError> {
        let path = self.root.join(key);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StorageError::Put {
                    key: key.to_string(),
                    source,
                })?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StorageError::Put {
                key: key.to_string(),
                source,
            })?;

        Ok(format!("{}/{}", self.public_base, key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.root.join(key)).await {
            Ok(()) => Ok(()),
            // deleting an already-absent object is a no-op
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Delete {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rocket::async_test]
    async fn put_writes_and_delete_is_idempotent() {
        let root = std::env::temp_dir().join(format!("classroom-store-{}", uuid::Uuid::new_v4()));
        let store = LocalObjectStore::new(root.clone(), "http://localhost:8000/uploads/");

        let url = store
            .put("assignments/test.txt", b"hello", "text/plain")
            .await
            .expect("put should succeed");

        assert_eq!(url, "http://localhost:8000/uploads/assignments/test.txt");
        assert!(root.join("assignments/test.txt").exists());

        store
            .delete("assignments/test.txt")
            .await
            .expect("delete should succeed");
        assert!(!root.join("assignments/test.txt").exists());

        // second delete of the same key is fine
        store
            .delete("assignments/test.txt")
            .await
            .expect("repeat delete should be a no-op");

        let _ = tokio::fs::remove_dir_all(root).await;
    }
}
