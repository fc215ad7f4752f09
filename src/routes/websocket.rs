// ABOUTME: WebSocket route: upgrades the connection and hands it to the channel layer
// ABOUTME: Authentication happens after upgrade, in the hello handshake
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::server::ServerResources;
use crate::websocket::handle_connection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tracing::debug;

pub fn routes(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route("/ws", get(upgrade))
        .with_state(resources)
}

async fn upgrade(
    ws: WebSocketUpgrade,
    State(resources): State<Arc<ServerResources>>,
) -> impl IntoResponse {
    debug!("websocket connection request");
    ws.on_upgrade(move |socket| {
        handle_connection(socket, resources.channels.clone(), resources.auth.clone())
    })
}
