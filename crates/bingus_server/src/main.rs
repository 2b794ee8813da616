//! BINGUS daemon
//!
//! Loads the tool registry once at startup and serves it over HTTP.

#![warn(clippy::all)]

use anyhow::{Context, Result};
use bingus_server::api;
use bingus_tool::ToolRegistry;
use bingus_vm::CapabilityRegistry;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bingus-server")]
#[command(about = "BINGUS capability-gated tool host", long_about = None)]
struct Args {
    /// Bind address
    #[arg(short, long, default_value = "127.0.0.1:8420")]
    bind: String,

    /// Path to the tools directory
    #[arg(short, long, default_value = "tools")]
    tools: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter("bingus=debug,tower_http=debug")
        .init();

    let caps = CapabilityRegistry::new().context("resolving log root")?;
    let registry = ToolRegistry::load(&args.tools, caps)
        .with_context(|| format!("failed to load tools from {}", args.tools.display()))?;

    tracing::info!(
        "loaded {} tool(s) from {}",
        registry.len(),
        args.tools.display()
    );
    for name in registry.names() {
        tracing::info!("  -> {}", name);
    }

    let app = api::router(Arc::new(registry));
    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("binding {}", args.bind))?;
    tracing::info!("daemon listening on {}", args.bind);
    axum::serve(listener, app).await?;

    Ok(())
}
