// ABOUTME: Public kiosk/screen surface: draw, cancel, track, and score tickets
// ABOUTME: Anonymous callers are identified by a server-minted session id echoed on every request
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::auth::new_public_session;
use crate::errors::AppResult;
use crate::models::Ticket;
use crate::server::ServerResources;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub fn routes(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route("/api/public/session", post(create_session))
        .route("/api/public/tickets", post(create_ticket))
        .route(
            "/api/public/companies/:company_id/tickets",
            get(get_tickets),
        )
        .route("/api/public/tickets/:ticket_id/cancel", post(cancel_ticket))
        .route(
            "/api/public/tickets/:ticket_id/en-route",
            post(signal_en_route),
        )
        .route("/api/public/scores", post(submit_scores))
        .with_state(resources)
}

#[derive(Debug, Serialize)]
struct SessionResponse {
    session_id: Uuid,
}

/// Mint an anonymous public session id the kiosk stores locally
async fn create_session() -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: new_public_session(),
    })
}

#[derive(Debug, Deserialize)]
struct CreateTicketRequest {
    company_id: Uuid,
    session_id: Uuid,
    #[serde(default)]
    required_skill: Option<String>,
}

async fn create_ticket(
    State(resources): State<Arc<ServerResources>>,
    Json(req): Json<CreateTicketRequest>,
) -> AppResult<(StatusCode, Json<Ticket>)> {
    let ticket = resources
        .coordinator
        .create_ticket(req.company_id, req.session_id, req.required_skill)
        .await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// Full queue snapshot; the resynchronization path after a missed event
async fn get_tickets(
    State(resources): State<Arc<ServerResources>>,
    Path(company_id): Path<Uuid>,
) -> AppResult<Json<Vec<Ticket>>> {
    let tickets = resources.coordinator.get_tickets(company_id).await?;
    Ok(Json(tickets))
}

#[derive(Debug, Deserialize)]
struct HolderRequest {
    session_id: Uuid,
}

async fn cancel_ticket(
    State(resources): State<Arc<ServerResources>>,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<HolderRequest>,
) -> AppResult<Json<Ticket>> {
    let ticket = resources
        .coordinator
        .cancel_ticket(ticket_id, Some(req.session_id))
        .await?;
    Ok(Json(ticket))
}

async fn signal_en_route(
    State(resources): State<Arc<ServerResources>>,
    Path(ticket_id): Path<Uuid>,
    Json(req): Json<HolderRequest>,
) -> AppResult<Json<Ticket>> {
    let ticket = resources
        .coordinator
        .signal_en_route(ticket_id, req.session_id)
        .await?;
    Ok(Json(ticket))
}

#[derive(Debug, Deserialize)]
struct ScoreSubmission {
    ticket_id: Uuid,
    value: u8,
}

#[derive(Debug, Deserialize)]
struct SubmitScoresRequest {
    session_id: Uuid,
    scores: Vec<ScoreSubmission>,
}

/// Submit the session's scores. The kiosk sends them as one batch; each
/// entry is applied in order and the first failure is surfaced unchanged.
async fn submit_scores(
    State(resources): State<Arc<ServerResources>>,
    Json(req): Json<SubmitScoresRequest>,
) -> AppResult<StatusCode> {
    for score in req.scores {
        resources
            .coordinator
            .submit_score(score.ticket_id, req.session_id, score.value)
            .await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
