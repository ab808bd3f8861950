//! Durable metadata sidecar for the filesystem driver.
//!
//! The index is one MessagePack-encoded map of key bytes to [`Info`],
//! stored under the reserved name `__meta` at the store root. It is
//! loaded once when the store opens and rewritten in full on every
//! mutating update; it is not an append log.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};

use crate::error::{Result, StoreError};
use crate::info::Info;

/// Reserved sidecar name; keys resolving here are rejected.
pub const META_FILE: &str = "__meta";

/// Key-to-path hashing mode, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashMode {
    /// Key bytes are interpreted as a relative path under the root.
    #[default]
    None,
    Sha256,
    Sha512,
}

impl HashMode {
    /// Hex digest of the key, or `None` when keys map to paths as-is.
    pub fn digest(&self, key: &[u8]) -> Option<String> {
        match self {
            HashMode::None => None,
            HashMode::Sha256 => Some(hex::encode(Sha256::digest(key))),
            HashMode::Sha512 => Some(hex::encode(Sha512::digest(key))),
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetaIndex {
    path: PathBuf,
    entries: BTreeMap<Vec<u8>, Info>,
}

impl MetaIndex {
    /// Load the sidecar from `root`, starting empty when none exists.
    pub async fn load(root: &Path) -> Result<Self> {
        let path = root.join(META_FILE);
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => rmp_serde::from_slice(&bytes)
                .map_err(|err| StoreError::Config(format!("corrupt metadata sidecar: {err}")))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { path, entries })
    }

    pub fn get(&self, key: &[u8]) -> Option<&Info> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: Vec<u8>, info: Info) {
        self.entries.insert(key, info);
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Info> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &Info)> {
        self.entries.iter()
    }

    /// Rewrite the sidecar in full. The new image lands under a
    /// temporary name and is renamed into place, so a crash mid-flush
    /// leaves the previous image intact.
    pub async fn flush(&self) -> Result<()> {
        let bytes = rmp_serde::to_vec(&self.entries)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

        let tmp = self
            .path
            .with_file_name(format!(".{}.{}.tmp", META_FILE, uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, &bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_hash_mode_digests() {
        assert!(HashMode::None.digest(b"key").is_none());

        let sha256 = HashMode::Sha256.digest(b"key").unwrap();
        assert_eq!(sha256.len(), 64);
        let sha512 = HashMode::Sha512.digest(b"key").unwrap();
        assert_eq!(sha512.len(), 128);

        // Same key bytes always produce the same location.
        assert_eq!(sha256, HashMode::Sha256.digest(b"key").unwrap());
    }

    #[test]
    fn test_hash_mode_decode() {
        let mode: HashMode = serde_json::from_str(r#""sha256""#).unwrap();
        assert_eq!(mode, HashMode::Sha256);
        assert!(serde_json::from_str::<HashMode>(r#""md5""#).is_err());
    }

    #[tokio::test]
    async fn test_index_roundtrip() {
        let dir = tempfile::tempdir().unwrap();

        let mut index = MetaIndex::load(dir.path()).await.unwrap();
        let now = Utc::now();
        index.insert(b"key".to_vec(), Info::new(3, Some(vec![0xab]), now, now));
        index.flush().await.unwrap();

        let reloaded = MetaIndex::load(dir.path()).await.unwrap();
        let info = reloaded.get(b"key").unwrap();
        assert_eq!(info.size(), 3);
        assert_eq!(info.hash(), Some(&[0xab][..]));
    }

    #[tokio::test]
    async fn test_missing_sidecar_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = MetaIndex::load(dir.path()).await.unwrap();
        assert!(index.get(b"anything").is_none());
    }
}
