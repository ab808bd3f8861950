use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use crate::cli::op::{Op, OpContext, ResolveError};

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// Key to remove
    pub key: String,
}

#[derive(Debug)]
pub struct RmOutput {
    pub key: String,
    pub removed: bool,
}

impl fmt::Display for RmOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.removed {
            write!(f, "{} {}", "Removed".green().bold(), self.key.bold())
        } else {
            write!(f, "{} {}", "Not found:".yellow().bold(), self.key.bold())
        }
    }
}

#[async_trait::async_trait]
impl Op for Rm {
    type Error = ResolveError;
    type Output = RmOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let handle = ctx.resolve_store().await?;
        let removed = handle.store().remove(self.key.as_bytes()).await;
        Ok(RmOutput {
            key: self.key.clone(),
            removed,
        })
    }
}
