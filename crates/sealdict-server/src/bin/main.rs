//! sealdict storage provider
//!
//! Usage:
//!   sealdict-server --store users=users.sdt --store vault=vault.sds --port 3000
//!   sealdict-server --port 3000 --admin-port 3001
//!
//! Uploads are only accepted on the admin address, which listens on
//! localhost unless `--admin-bind` says otherwise.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use sealdict_server::{
    create_admin_router, create_public_router, create_shared_state, init_prometheus_recorder,
    ServerState,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sealdict-server")]
#[command(about = "Serve sealdict stores over HTTP")]
struct Args {
    /// Store to host at startup, as NAME=PATH (repeatable)
    #[arg(long = "store", value_name = "NAME=PATH")]
    stores: Vec<String>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Port for the upload endpoint; uploads are disabled without it
    #[arg(long)]
    admin_port: Option<u16>,

    /// Address the upload endpoint binds
    #[arg(long, default_value = "127.0.0.1")]
    admin_bind: String,

    /// Requests served concurrently
    #[arg(long, default_value_t = 256)]
    concurrency: usize,

    /// Expose Prometheus metrics at /metrics
    #[arg(long)]
    metrics: bool,
}

fn parse_store_arg(arg: &str) -> Result<(String, PathBuf)> {
    match arg.split_once('=') {
        Some((name, path)) if !name.is_empty() && !path.is_empty() => {
            Ok((name.to_string(), PathBuf::from(path)))
        }
        _ => bail!("expected NAME=PATH, got {:?}", arg),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let mut state = ServerState::new();
    if args.metrics {
        state = state.with_metrics(init_prometheus_recorder()?);
    }

    for arg in &args.stores {
        let (name, path) = parse_store_arg(arg)?;
        let names = state
            .load_file(&name, &path)
            .with_context(|| format!("loading {} from {}", name, path.display()))?;
        tracing::info!(?names, "Hosting store");
    }

    if state.is_empty() && args.admin_port.is_none() {
        tracing::warn!("No stores loaded and uploads disabled");
    }

    let state = create_shared_state(state);
    let app = create_public_router(state.clone(), args.concurrency);

    if let Some(admin_port) = args.admin_port {
        let admin_addr = format!("{}:{}", args.admin_bind, admin_port);
        let admin_listener = tokio::net::TcpListener::bind(&admin_addr).await?;
        tracing::info!("Accepting uploads on {}", admin_addr);
        let admin = create_admin_router(state);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(admin_listener, admin).await {
                tracing::error!(error = %e, "Admin server stopped");
            }
        });
    }

    let addr = format!("{}:{}", args.bind, args.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
