// ABOUTME: Liveness endpoint reporting service name and version
// ABOUTME: No dependencies on shared state; always answers while the process runs
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::constants::service;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};

pub fn routes() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": service::SERVICE_NAME,
        "version": service::SERVER_VERSION,
    }))
}
