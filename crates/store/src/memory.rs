//! Non-durable reference driver.

use std::collections::HashMap;
use std::ops::ControlFlow;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use tokio::io::AsyncReadExt;

use crate::error::{Result, StoreError};
use crate::info::Info;
use crate::store::{BoxReader, KeyValStore, MetaStore, Visitor};

struct Entry {
    data: Bytes,
    info: Info,
}

/// String-keyed mapping to byte buffers, no persistence.
///
/// Entries carry a synthesized [`Info`] (size and timestamps, no hash)
/// so the driver exposes the same metadata capability as the
/// filesystem driver and the two stay interchangeable in tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<Vec<u8>, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValStore for MemoryStore {
    async fn set(&self, key: &[u8], mut reader: BoxReader<'_>) -> Result<()> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        self.set_bytes(key, &buf).await
    }

    async fn set_bytes(&self, key: &[u8], bytes: &[u8]) -> Result<()> {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let ctime = entries
            .get(key)
            .map(|entry| entry.info.ctime())
            .unwrap_or(now);
        entries.insert(
            key.to_vec(),
            Entry {
                data: Bytes::copy_from_slice(bytes),
                info: Info::new(bytes.len() as u64, None, ctime, now),
            },
        );
        Ok(())
    }

    async fn has(&self, key: &[u8]) -> bool {
        self.entries.read().contains_key(key)
    }

    async fn remove(&self, key: &[u8]) -> bool {
        self.entries.write().remove(key).is_some()
    }

    async fn get(&self, key: &[u8]) -> Result<BoxReader<'static>> {
        let bytes = self.get_bytes(key).await?;
        Ok(Box::pin(std::io::Cursor::new(bytes)))
    }

    async fn get_bytes(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.entries
            .read()
            .get(key)
            .map(|entry| entry.data.to_vec())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl MetaStore for MemoryStore {
    async fn stat(&self, key: &[u8]) -> Result<Info> {
        self.entries
            .read()
            .get(key)
            .map(|entry| entry.info.clone())
            .ok_or(StoreError::NotFound)
    }

    /// Glob-style matching against keys, iteration order unspecified.
    async fn list(&self, prefix: &[u8], visitor: Visitor<'_>) -> Result<()> {
        let pattern = String::from_utf8_lossy(prefix);
        let matcher = globset::Glob::new(&pattern)
            .map_err(|err| StoreError::Config(format!("invalid glob '{pattern}': {err}")))?
            .compile_matcher();

        let entries = self.entries.read();
        for (key, entry) in entries.iter() {
            if !matcher.is_match(&*String::from_utf8_lossy(key)) {
                continue;
            }
            if let ControlFlow::Break(()) = visitor(key, &entry.info) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let store = MemoryStore::new();
        store.set_bytes(b"greeting", b"Hello, World").await.unwrap();
        assert_eq!(store.get_bytes(b"greeting").await.unwrap(), b"Hello, World");
    }

    #[tokio::test]
    async fn test_has_lifecycle() {
        let store = MemoryStore::new();
        assert!(!store.has(b"key").await);

        store.set_bytes(b"key", b"value").await.unwrap();
        assert!(store.has(b"key").await);

        assert!(store.remove(b"key").await);
        assert!(!store.has(b"key").await);
    }

    #[tokio::test]
    async fn test_remove_absent_is_false() {
        let store = MemoryStore::new();
        assert!(!store.remove(b"never-set").await);
    }

    #[tokio::test]
    async fn test_stat_tracks_size() {
        let store = MemoryStore::new();
        store.set_bytes(b"key", b"12345").await.unwrap();

        let info = store.stat(b"key").await.unwrap();
        assert_eq!(info.size(), 5);
        assert!(info.hash().is_none());
        assert!(!info.is_dir());
    }

    #[tokio::test]
    async fn test_list_glob() {
        let store = MemoryStore::new();
        store.set_bytes(b"images/a.png", b"a").await.unwrap();
        store.set_bytes(b"images/b.png", b"b").await.unwrap();
        store.set_bytes(b"notes/todo.txt", b"c").await.unwrap();

        let mut seen = Vec::new();
        store
            .list(b"images/*", &mut |key, _info| {
                seen.push(key.to_vec());
                ControlFlow::Continue(())
            })
            .await
            .unwrap();

        seen.sort();
        assert_eq!(seen, vec![b"images/a.png".to_vec(), b"images/b.png".to_vec()]);
    }

    #[tokio::test]
    async fn test_list_stop_early_is_not_an_error() {
        let store = MemoryStore::new();
        store.set_bytes(b"a", b"1").await.unwrap();
        store.set_bytes(b"b", b"2").await.unwrap();
        store.set_bytes(b"c", b"3").await.unwrap();

        let mut count = 0;
        store
            .list(b"*", &mut |_key, _info| {
                count += 1;
                ControlFlow::Break(())
            })
            .await
            .unwrap();

        assert_eq!(count, 1);
    }
}
