use std::fmt;

use clap::Args;

use crate::cli::op::{Op, OpContext, ResolveError};
use crate::http_server::{router, ServiceState};

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Listen address, overriding the config value
    #[arg(long, short = 'H')]
    pub listen: Option<String>,
}

#[derive(Debug)]
pub struct ServeOutput;

impl fmt::Display for ServeOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gateway stopped")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
impl Op for Serve {
    type Error = ServeError;
    type Output = ServeOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let handle = ctx.resolve_store().await?;
        let listen = self
            .listen
            .clone()
            .unwrap_or_else(|| ctx.config.listen.clone());

        let state = ServiceState::new(handle).with_max_age(ctx.config.max_age);
        let app = router(state);

        let listener = tokio::net::TcpListener::bind(&listen).await?;
        tracing::info!(addr = %listen, "keyval gateway listening");
        axum::serve(listener, app).await?;

        Ok(ServeOutput)
    }
}
