// ABOUTME: Shared resource container, router assembly, and the serve loop
// ABOUTME: Wires config, coordinator, event channel, and auth into one axum application
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::coordinator::{CoordinatorSettings, QueueCoordinator};
use crate::events::ChannelManager;
use crate::routes;
use crate::store::{ArchiveStore, NullArchive, SqliteArchive};
use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Centralized resource container for dependency injection.
///
/// Constructed once at startup (or per test) and shared behind an `Arc`
/// by every route handler and the WebSocket layer.
pub struct ServerResources {
    pub config: Arc<ServerConfig>,
    pub coordinator: Arc<QueueCoordinator>,
    pub channels: Arc<ChannelManager>,
    pub auth: Arc<AuthManager>,
}

impl ServerResources {
    /// Build the full resource graph from configuration, connecting the
    /// archive when one is configured.
    pub async fn from_config(config: ServerConfig) -> Result<Arc<Self>> {
        let channels = Arc::new(ChannelManager::new());
        let auth = Arc::new(AuthManager::new(&config.jwt_secret));

        let archive: Arc<dyn ArchiveStore> = match &config.archive_url {
            Some(url) => {
                let archive = SqliteArchive::connect(url)
                    .await
                    .context("archive connection failed")?;
                info!(url = %url, "durable archive connected");
                Arc::new(archive)
            }
            None => {
                info!("no archive configured, terminal tickets are discarded");
                Arc::new(NullArchive)
            }
        };

        let coordinator = Arc::new(QueueCoordinator::new(
            channels.clone(),
            archive,
            CoordinatorSettings {
                max_score: config.max_score,
                stale_ticket_ttl: config.stale_ticket_ttl,
            },
        ));

        Ok(Arc::new(Self {
            config: Arc::new(config),
            coordinator,
            channels,
            auth,
        }))
    }
}

/// Assemble the application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::tickets::routes(resources.clone()))
        .merge(routes::desks::routes(resources.clone()))
        .merge(routes::companies::routes(resources.clone()))
        .merge(routes::websocket::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind and serve until the process is signalled
pub async fn serve(resources: Arc<ServerResources>) -> Result<()> {
    let addr = format!(
        "{}:{}",
        resources.config.http_host, resources.config.http_port
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, router(resources))
        .await
        .context("server error")
}
