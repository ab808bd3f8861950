use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Result;
use crate::info::Info;

/// Readable handle for a stored blob. The caller owns it and releases
/// it by dropping.
pub type BoxReader<'a> = Pin<Box<dyn AsyncRead + Send + 'a>>;

/// Callback invoked once per key during [`MetaStore::list`].
///
/// Returning `ControlFlow::Break(())` ends the enumeration early
/// without it being treated as a failure.
pub type Visitor<'a> = &'a mut (dyn FnMut(&[u8], &Info) -> ControlFlow<()> + Send);

/// The uniform operation set every driver implements.
#[async_trait]
pub trait KeyValStore: Send + Sync {
    /// Fully consume `reader`, replacing any prior value at `key`.
    ///
    /// Atomic with respect to readers of the same key: the write lands
    /// in a fresh slot and is published only on complete success.
    async fn set(&self, key: &[u8], reader: BoxReader<'_>) -> Result<()>;

    async fn set_bytes(&self, key: &[u8], bytes: &[u8]) -> Result<()> {
        self.set(key, Box::pin(std::io::Cursor::new(bytes.to_vec())))
            .await
    }

    /// Existence probe; never errors.
    async fn has(&self, key: &[u8]) -> bool;

    /// True iff an entry existed and was removed.
    async fn remove(&self, key: &[u8]) -> bool;

    /// Readable handle for the blob at `key`, or `NotFound`.
    async fn get(&self, key: &[u8]) -> Result<BoxReader<'static>>;

    async fn get_bytes(&self, key: &[u8]) -> Result<Vec<u8>> {
        let mut reader = self.get(key).await?;
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await?;
        Ok(out)
    }
}

/// Optional capability: metadata access and enumeration.
#[async_trait]
pub trait MetaStore: Send + Sync {
    /// Metadata for `key`, `NotFound` if absent, `MetadataMissing` if
    /// the blob exists but no record was ever committed.
    async fn stat(&self, key: &[u8]) -> Result<Info>;

    /// Invoke `visitor` once per key matching `prefix`.
    async fn list(&self, prefix: &[u8], visitor: Visitor<'_>) -> Result<()>;
}

/// A resolved store plus its capabilities, fixed at construction.
///
/// Callers discover the optional [`MetaStore`] capability here instead
/// of downcasting at request time.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn KeyValStore>,
    meta: Option<Arc<dyn MetaStore>>,
}

impl StoreHandle {
    pub fn new(store: Arc<dyn KeyValStore>) -> Self {
        Self { store, meta: None }
    }

    pub fn with_meta(store: Arc<dyn KeyValStore>, meta: Arc<dyn MetaStore>) -> Self {
        Self {
            store,
            meta: Some(meta),
        }
    }

    /// Handle for a driver implementing both traits.
    pub fn from_full<S>(store: Arc<S>) -> Self
    where
        S: KeyValStore + MetaStore + 'static,
    {
        Self::with_meta(store.clone(), store)
    }

    pub fn store(&self) -> &Arc<dyn KeyValStore> {
        &self.store
    }

    pub fn meta(&self) -> Option<&Arc<dyn MetaStore>> {
        self.meta.as_ref()
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("meta", &self.meta.is_some())
            .finish()
    }
}
