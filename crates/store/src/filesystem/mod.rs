//! Filesystem driver: keys map to paths under a root directory, with a
//! durable metadata sidecar recording size, hash and timestamps.

mod meta;

pub use meta::{HashMode, META_FILE};

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ops::ControlFlow;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::info::Info;
use crate::store::{BoxReader, KeyValStore, MetaStore, Visitor};

use meta::MetaIndex;

const COPY_BUF_SIZE: usize = 64 * 1024;

/// Typed driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemOptions {
    /// Store root; created when missing. Environment expansion is the
    /// caller's job, the driver consumes the path as-is.
    pub path: String,
    #[serde(default)]
    pub hash_keys: HashMode,
}

/// Production driver.
///
/// Blob writes land in a temp file and are published by atomic rename,
/// so a concurrent reader never observes a half-written blob. The
/// in-memory index and the on-disk sidecar are mutated under one
/// store-wide lock; they agree whenever a mutating call has returned.
///
/// A root directory is owned by exactly one store instance; two
/// instances sharing a root is unsupported.
#[derive(Debug)]
pub struct FilesystemStore {
    root: PathBuf,
    hash_keys: HashMode,
    index: Mutex<MetaIndex>,
}

impl FilesystemStore {
    /// Validate the configuration, create the root and load the
    /// sidecar. All configuration failures surface here, never from a
    /// later I/O call.
    pub async fn open(options: FilesystemOptions) -> Result<Self> {
        if options.path.is_empty() || options.path == "." || options.path == "/" {
            return Err(StoreError::Config("path cannot be empty".into()));
        }

        let mut root = PathBuf::from(&options.path);
        if !root.is_absolute() {
            let cwd = std::env::current_dir()?;
            root = cwd.join(root);
        }

        if let Ok(existing) = fs::metadata(&root).await {
            if !existing.is_dir() {
                return Err(StoreError::Config(format!(
                    "path '{}' already exists, and is not a directory",
                    root.display()
                )));
            }
        }
        fs::create_dir_all(&root).await?;

        let index = MetaIndex::load(&root).await?;
        Ok(Self {
            root,
            hash_keys: options.hash_keys,
            index: Mutex::new(index),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve key bytes to the blob path.
    ///
    /// Hashed modes produce a flat namespace of hex digests. In `none`
    /// mode the key is a relative path under the root; keys that are
    /// absolute, escape the root, or collide with the reserved sidecar
    /// name are rejected.
    fn key_path(&self, key: &[u8]) -> Result<PathBuf> {
        if let Some(digest) = self.hash_keys.digest(key) {
            return Ok(self.root.join(digest));
        }

        let text = std::str::from_utf8(key)
            .map_err(|_| StoreError::InvalidKey("key is not valid utf-8".into()))?;
        if text.is_empty() {
            return Err(StoreError::InvalidKey("key is empty".into()));
        }

        let relative = Path::new(text);
        if relative.is_absolute() {
            return Err(StoreError::InvalidKey(format!("'{text}' is absolute")));
        }
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    if part == META_FILE {
                        return Err(StoreError::InvalidKey(format!(
                            "'{META_FILE}' is reserved"
                        )));
                    }
                }
                _ => {
                    return Err(StoreError::InvalidKey(format!(
                        "'{text}' contains a traversal component"
                    )))
                }
            }
        }

        Ok(self.root.join(relative))
    }

    async fn ensure_parent(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if parent != self.root => parent,
            _ => return Ok(()),
        };
        if fs::metadata(parent).await.is_err() {
            debug!(path = %parent.display(), "create directory");
            // Racing creators are fine, creation is idempotent.
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Copy `reader` into a fresh temp file next to `path`, returning
    /// the temp path, final size and content digest.
    async fn stage(
        &self,
        path: &Path,
        reader: &mut BoxReader<'_>,
    ) -> Result<(PathBuf, u64, Vec<u8>)> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("blob");
        let tmp = path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()));

        let mut file = fs::File::create(&tmp).await?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; COPY_BUF_SIZE];
        let mut size = 0u64;

        let copied: io::Result<()> = async {
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
                file.write_all(&buf[..n]).await?;
                size += n as u64;
            }
            file.flush().await
        }
        .await;

        if let Err(err) = copied {
            drop(file);
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        Ok((tmp, size, hasher.finalize().to_vec()))
    }
}

#[async_trait]
impl KeyValStore for FilesystemStore {
    async fn set(&self, key: &[u8], mut reader: BoxReader<'_>) -> Result<()> {
        let path = self.key_path(key)?;
        self.ensure_parent(&path).await?;

        // The stream is consumed outside the lock; only publish and
        // metadata commit are serialized. A failed copy leaves any
        // prior blob and Info untouched.
        let (tmp, size, hash) = self.stage(&path, &mut reader).await?;

        let mut index = self.index.lock().await;
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(err.into());
        }

        let now = Utc::now();
        let ctime = index.get(key).map(Info::ctime).unwrap_or(now);
        index.insert(key.to_vec(), Info::new(size, Some(hash), ctime, now));
        index.flush().await
    }

    async fn has(&self, key: &[u8]) -> bool {
        match self.key_path(key) {
            Ok(path) => fs::metadata(path).await.is_ok(),
            Err(_) => false,
        }
    }

    async fn remove(&self, key: &[u8]) -> bool {
        let path = match self.key_path(key) {
            Ok(path) => path,
            Err(_) => return false,
        };

        let mut index = self.index.lock().await;
        if fs::remove_file(&path).await.is_err() {
            return false;
        }
        if index.remove(key).is_some() {
            if let Err(err) = index.flush().await {
                warn!(error = %err, "failed to flush sidecar after remove");
            }
        }
        true
    }

    async fn get(&self, key: &[u8]) -> Result<BoxReader<'static>> {
        let path = self.key_path(key)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl MetaStore for FilesystemStore {
    async fn stat(&self, key: &[u8]) -> Result<Info> {
        let path = self.key_path(key)?;
        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound)
            }
            Err(err) => return Err(err.into()),
        };

        if metadata.is_dir() {
            let mtime = fs_time(metadata.modified());
            let ctime = fs_time(metadata.created());
            return Ok(Info::directory(ctime, mtime));
        }

        let index = self.index.lock().await;
        // The blob is on disk but was never recorded; surfacing this
        // distinctly beats inventing an empty record.
        index
            .get(key)
            .cloned()
            .ok_or(StoreError::MetadataMissing)
    }

    /// Walk index entries whose key bytes start with `prefix`.
    async fn list(&self, prefix: &[u8], visitor: Visitor<'_>) -> Result<()> {
        let index = self.index.lock().await;
        for (key, info) in index.iter() {
            if !key.starts_with(prefix) {
                continue;
            }
            if let ControlFlow::Break(()) = visitor(key, info) {
                break;
            }
        }
        Ok(())
    }
}

fn fs_time(time: io::Result<std::time::SystemTime>) -> DateTime<Utc> {
    time.map(DateTime::from).unwrap_or_else(|_| Utc::now())
}
