//! Headless search host for stdin/stdout JSON communication.
//!
//! Reads `ToolCall` messages as newline-delimited JSON from stdin, runs them
//! against the configured search engine, and writes `ToolResponse` messages
//! to stdout.
//!
//! All tracing/diagnostic output goes to stderr so that stdout remains a
//! clean JSON protocol channel.

use std::sync::Arc;

use quarry::host::stdio::run_stdio_host;
use quarry::{Collaborators, build_orchestrator, config, default_tools};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("quarry=info,quarry_search=info")
            }),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "quarry-host starting");

    let config = config::load().map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;
    let orchestrator = build_orchestrator(&config, Collaborators::default())
        .map_err(|e| anyhow::anyhow!("failed to build search engine: {e}"))?;
    let tools = Arc::new(default_tools(Arc::new(orchestrator)));

    run_stdio_host(tools).await.map_err(|e| {
        tracing::error!(error = %e, "quarry-host exited with error");
        anyhow::anyhow!("quarry-host failed: {e}")
    })?;

    tracing::info!("quarry-host shut down cleanly");
    Ok(())
}
