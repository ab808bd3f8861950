use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use store::StoreError;

use crate::cli::op::{Op, OpContext, ResolveError};

#[derive(Args, Debug, Clone)]
pub struct Get {
    /// Key to read
    pub key: String,

    /// Write the raw value to a file instead of printing it
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
pub enum GetContent {
    Text(String),
    Binary(Vec<u8>),
    File { path: PathBuf, bytes: u64 },
}

#[derive(Debug)]
pub struct GetOutput {
    pub key: String,
    pub content: GetContent,
}

impl fmt::Display for GetOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content {
            GetContent::Text(text) => {
                writeln!(f, "{} {}", "Key:".dimmed(), self.key.bold())?;
                write!(f, "{text}")
            }
            GetContent::Binary(bytes) => {
                writeln!(
                    f,
                    "{} {}  {} {} bytes",
                    "Key:".dimmed(),
                    self.key.bold(),
                    "Size:".dimmed(),
                    bytes.len()
                )?;
                let hex = bytes
                    .iter()
                    .map(|b| format!("{:02x}", b))
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(f, "{} {hex}", "Binary content (hex):".dimmed())
            }
            GetContent::File { path, bytes } => write!(
                f,
                "{} {} bytes to {}",
                "Wrote".green().bold(),
                bytes,
                path.display().to_string().bold()
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl Op for Get {
    type Error = GetError;
    type Output = GetOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let handle = ctx.resolve_store().await?;
        let key = self.key.as_bytes();

        let content = match &self.output {
            Some(path) => {
                let mut reader = handle.store().get(key).await?;
                let mut file = tokio::fs::File::create(path).await?;
                let bytes = tokio::io::copy(&mut reader, &mut file).await?;
                GetContent::File {
                    path: path.clone(),
                    bytes,
                }
            }
            None => {
                let bytes = handle.store().get_bytes(key).await?;
                match String::from_utf8(bytes) {
                    Ok(text) => GetContent::Text(text),
                    Err(err) => GetContent::Binary(err.into_bytes()),
                }
            }
        };

        Ok(GetOutput {
            key: self.key.clone(),
            content,
        })
    }
}
