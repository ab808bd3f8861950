use std::io;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Error taxonomy shared by every driver.
///
/// Configuration problems are fatal at construction time only; a
/// resolved store never reports them from an I/O method.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("store: '{0}' not found")]
    UnknownDriver(String),

    #[error("invalid store configuration: {0}")]
    Config(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("metadata missing for existing entry")]
    MetadataMissing,

    #[error("options decode error: {0}")]
    Options(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl StoreError {
    /// True when the underlying cause is "the key has no entry".
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}
