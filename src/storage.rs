//! Durable key-value storage backed by a fjall keyspace.
//!
//! Values are postcard-encoded. Every call hops onto the blocking pool so
//! callers on the async runtime never wait on disk I/O.

use anyhow::{Context, Result};
use fjall::Keyspace;
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use tokio::task;

pub struct Store {
    // Keeps the database handle alive for as long as the keyspace is used.
    _db: fjall::Database,
    items: Keyspace,
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

impl Store {
    /// Opens (or creates) the database at `path` and the named keyspace in it.
    pub fn open(path: impl AsRef<Path>, keyspace: &str) -> Result<Self> {
        let path = path.as_ref();
        let db = fjall::Database::builder(path)
            .open()
            .with_context(|| format!("Failed to open store at {}", path.display()))?;
        let items = db.keyspace(keyspace, fjall::KeyspaceCreateOptions::default)?;
        Ok(Store { _db: db, items })
    }

    /// Stores a serializable value under `key`, replacing any previous one.
    #[tracing::instrument(name = "put_store", level = "debug", skip(self, value))]
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = postcard::to_stdvec(value)?;
        self.put_raw(key, bytes).await
    }

    /// Retrieves the value stored under `key`, if any.
    #[tracing::instrument(name = "query_store", level = "debug", skip(self))]
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(bytes) => {
                let value = postcard::from_bytes(&bytes)
                    .with_context(|| format!("Corrupt value under key {key}"))?;
                Ok(Some(value))
            }
            None => {
                tracing::debug!("Key not found");
                Ok(None)
            }
        }
    }

    /// Removes a key. Missing keys are not an error.
    pub async fn remove(&self, key: &str) -> Result<()> {
        let key = key.as_bytes().to_vec();
        let store = self.items.clone();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }

    async fn put_raw(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let store = self.items.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.insert(key, bytes)).await??;
        Ok(())
    }

    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.items.clone();
        let key_bytes = key.as_bytes().to_vec();
        task::spawn_blocking(move || get_from_store(store, key_bytes)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), "test").unwrap();

        store.put("answer", &42u32).await.unwrap();
        assert_eq!(store.get::<u32>("answer").await.unwrap(), Some(42));

        store.remove("answer").await.unwrap();
        assert_eq!(store.get::<u32>("answer").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = TempDir::new().unwrap();
        let store = Store::open(dir.path(), "test").unwrap();
        assert!(store.get::<String>("nope").await.unwrap().is_none());
        store.remove("nope").await.unwrap();
    }
}
