pub mod op;
pub mod ops;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use store::Registry;

use crate::config::Config;
use op::{Op, OpContext};

#[derive(Parser, Debug)]
#[command(
    name = "keyval",
    about = "Pluggable blob storage with an HTTP gateway",
    version
)]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, short, global = true, env = "KEYVAL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read a value
    Get(ops::Get),
    /// Write a value
    Set(ops::Set),
    /// Remove a key
    Rm(ops::Rm),
    /// Serve the store over HTTP
    Serve(ops::Serve),
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        let ctx = OpContext {
            config,
            registry: Registry::with_builtin_drivers(),
        };

        match self.command {
            Command::Get(op) => run_op(op, &ctx).await,
            Command::Set(op) => run_op(op, &ctx).await,
            Command::Rm(op) => run_op(op, &ctx).await,
            Command::Serve(op) => run_op(op, &ctx).await,
        }
    }
}

async fn run_op<O: Op>(op: O, ctx: &OpContext) -> anyhow::Result<()> {
    let output = op.execute(ctx).await?;
    println!("{output}");
    Ok(())
}
