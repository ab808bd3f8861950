use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata record for a stored key.
///
/// One `Info` exists per key in the filesystem driver once a set has
/// completed; the memory driver synthesizes them on the fly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    size: u64,
    hash: Option<Vec<u8>>,
    ctime: DateTime<Utc>,
    mtime: DateTime<Utc>,
    is_dir: bool,
}

impl Info {
    pub fn new(size: u64, hash: Option<Vec<u8>>, ctime: DateTime<Utc>, mtime: DateTime<Utc>) -> Self {
        Self {
            size,
            hash,
            ctime,
            mtime,
            is_dir: false,
        }
    }

    /// Synthesized record for a directory; directories carry no hash.
    pub fn directory(ctime: DateTime<Utc>, mtime: DateTime<Utc>) -> Self {
        Self {
            size: 0,
            hash: None,
            ctime,
            mtime,
            is_dir: true,
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn hash(&self) -> Option<&[u8]> {
        self.hash.as_deref()
    }

    pub fn ctime(&self) -> DateTime<Utc> {
        self.ctime
    }

    pub fn mtime(&self) -> DateTime<Utc> {
        self.mtime
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }
}
