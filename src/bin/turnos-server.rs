// ABOUTME: Server binary for the multi-tenant queueing platform
// ABOUTME: Loads configuration, starts the eviction sweep, and serves HTTP plus WebSocket
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use anyhow::Result;
use clap::Parser;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use turnos_server::{
    config::ServerConfig,
    logging,
    models::{Assistant, StaffRole},
    server::{serve, ServerResources},
};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "turnos-server")]
#[command(about = "Turnos - multi-tenant queueing and ticketing service")]
pub struct Args {
    /// Override HTTP port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(http_port) = args.http_port {
        config.http_port = http_port;
    }

    logging::init(&config)?;

    info!("Starting Turnos server");
    info!("{}", config.summary());

    let resources = ServerResources::from_config(config).await?;

    // Bootstrap credential so a fresh deployment can create its first
    // company. Real staff tokens are issued through the assistant routes.
    let admin = Assistant {
        id: Uuid::new_v4(),
        company_id: None,
        name: "bootstrap-admin".into(),
        role: StaffRole::Admin,
        skills: HashSet::new(),
    };
    let token = resources.auth.issue_token(&admin)?;
    info!("bootstrap admin token: {token}");

    spawn_eviction_sweep(resources.clone());

    serve(resources).await
}

/// Periodic sweep that cancels or force-completes tickets stuck past the
/// configured TTL and flushes sessions that will never finish scoring.
fn spawn_eviction_sweep(resources: Arc<ServerResources>) {
    let interval = resources.config.eviction_interval;
    if interval.is_zero() {
        info!("eviction sweep disabled");
        return;
    }
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick fires immediately, skip it
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let touched = resources.coordinator.evict_stale().await;
            if touched > 0 {
                warn!(touched, "eviction sweep reclaimed stale tickets");
            }
        }
    });
}
