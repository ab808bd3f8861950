use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::filesystem::{FilesystemOptions, FilesystemStore};
use crate::memory::MemoryStore;
use crate::store::StoreHandle;

/// Driver configuration before it is decoded into the driver's typed
/// options. All forms normalize to a JSON value.
#[derive(Debug, Clone)]
pub enum DriverOptions {
    /// No options given; drivers that require configuration reject it.
    None,
    /// Already-parsed generic mapping.
    Value(Value),
    /// Raw encoded bytes.
    Raw(Vec<u8>),
    /// Encoded text.
    Text(String),
}

impl DriverOptions {
    fn into_value(self) -> Result<Value> {
        match self {
            DriverOptions::None => Ok(Value::Null),
            DriverOptions::Value(v) => Ok(v),
            DriverOptions::Raw(bytes) => Ok(serde_json::from_slice(&bytes)?),
            DriverOptions::Text(text) => Ok(serde_json::from_str(&text)?),
        }
    }

    /// Decode into the driver's typed configuration.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.into_value()?)?)
    }
}

impl From<Value> for DriverOptions {
    fn from(value: Value) -> Self {
        DriverOptions::Value(value)
    }
}

impl From<&str> for DriverOptions {
    fn from(text: &str) -> Self {
        DriverOptions::Text(text.to_string())
    }
}

impl From<Vec<u8>> for DriverOptions {
    fn from(bytes: Vec<u8>) -> Self {
        DriverOptions::Raw(bytes)
    }
}

/// Constructor installed under a driver name.
pub type DriverFactory =
    Arc<dyn Fn(DriverOptions) -> BoxFuture<'static, Result<StoreHandle>> + Send + Sync>;

/// Maps driver names to constructors.
///
/// An explicit value built once at process start and passed by
/// reference; there is no process-wide registry. Registration is not
/// synchronized, so install drivers before handing the registry out.
#[derive(Default)]
pub struct Registry {
    drivers: HashMap<String, DriverFactory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in `memory` and `filesystem` drivers.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();

        registry.register("memory", |_options| {
            Box::pin(async { Ok(StoreHandle::from_full(Arc::new(MemoryStore::new()))) })
        });

        registry.register("filesystem", |options| {
            Box::pin(async move {
                let options: FilesystemOptions = options.decode()?;
                let store = FilesystemStore::open(options).await?;
                Ok(StoreHandle::from_full(Arc::new(store)))
            })
        });

        registry
    }

    /// Install `factory` under `name`. The last registration for a
    /// given name wins.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(DriverOptions) -> BoxFuture<'static, Result<StoreHandle>> + Send + Sync + 'static,
    {
        self.drivers.insert(name.into(), Arc::new(factory));
    }

    /// Resolve `name` and construct a store from `options`.
    ///
    /// Construction performs all configuration validation up front;
    /// a returned handle never fails with a configuration error.
    pub async fn resolve(
        &self,
        name: &str,
        options: impl Into<DriverOptions>,
    ) -> Result<StoreHandle> {
        let factory = self
            .drivers
            .get(name)
            .ok_or_else(|| StoreError::UnknownDriver(name.to_string()))?;
        factory(options.into()).await
    }
}
