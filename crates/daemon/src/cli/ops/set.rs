use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use store::StoreError;

use crate::cli::op::{Op, OpContext, ResolveError};

#[derive(Args, Debug, Clone)]
pub struct Set {
    /// Key to write
    pub key: String,

    /// Inline value; omitted when reading from stdin or --file
    pub value: Option<String>,

    /// Stream the value from a file
    #[arg(long, short)]
    pub file: Option<PathBuf>,
}

#[derive(Debug)]
pub struct SetOutput {
    pub key: String,
    pub size: Option<u64>,
}

impl fmt::Display for SetOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.size {
            Some(size) => write!(
                f,
                "{} {} ({} bytes)",
                "Stored".green().bold(),
                self.key.bold(),
                size
            ),
            None => write!(f, "{} {}", "Stored".green().bold(), self.key.bold()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SetError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl Op for Set {
    type Error = SetError;
    type Output = SetOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let handle = ctx.resolve_store().await?;
        let key = self.key.as_bytes();

        if let Some(value) = &self.value {
            handle.store().set_bytes(key, value.as_bytes()).await?;
        } else if let Some(path) = &self.file {
            let file = tokio::fs::File::open(path).await?;
            handle.store().set(key, Box::pin(file)).await?;
        } else {
            handle.store().set(key, Box::pin(tokio::io::stdin())).await?;
        }

        // Size comes back from the metadata capability when present.
        let mut size = None;
        if let Some(meta) = handle.meta() {
            if let Ok(info) = meta.stat(key).await {
                size = Some(info.size());
            }
        }

        Ok(SetOutput {
            key: self.key.clone(),
            size,
        })
    }
}
