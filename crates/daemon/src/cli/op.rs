use async_trait::async_trait;

use store::{Registry, StoreError, StoreHandle};

use crate::config::{Config, ConfigError};

/// Context shared by every CLI operation.
pub struct OpContext {
    pub config: Config,
    pub registry: Registry,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl OpContext {
    /// Resolve the configured store through the registry.
    pub async fn resolve_store(&self) -> Result<StoreHandle, ResolveError> {
        let options = self.config.driver_options()?;
        let handle = self
            .registry
            .resolve(&self.config.store.driver, options)
            .await?;
        Ok(handle)
    }
}

/// A CLI operation with typed output and error.
#[async_trait]
pub trait Op {
    type Error: std::error::Error + Send + Sync + 'static;
    type Output: std::fmt::Display;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}
