// ABOUTME: Staff desk surface: take/release desks, pull the next ticket, complete service
// ABOUTME: Every handler validates the staff JWT and its authority over the desk's company
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::errors::{AppError, AppResult};
use crate::models::{Desk, Ticket};
use crate::server::ServerResources;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

pub fn routes(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route("/api/staff/desks/:desk_id/take", post(take_desk))
        .route("/api/staff/desks/:desk_id/release", post(release_desk))
        .route("/api/staff/desks/:desk_id/next", post(assign_next))
        .route("/api/staff/desks/:desk_id/complete", post(complete_ticket))
        .route("/api/staff/tickets/:ticket_id/cancel", post(cancel_ticket))
        .with_state(resources)
}

/// Check the caller may operate desks of the company owning `desk_id`
fn authorize_desk(
    resources: &ServerResources,
    headers: &HeaderMap,
    desk_id: Uuid,
) -> AppResult<()> {
    let claims = resources.auth.require_staff(headers)?;
    let company_id = resources.coordinator.company_of_desk(desk_id)?;
    if !claims.can_act_on(company_id) {
        return Err(AppError::auth_invalid("desk belongs to another company").with_desk_id(desk_id));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct TakeDeskRequest {
    assistant_id: Uuid,
}

async fn take_desk(
    State(resources): State<Arc<ServerResources>>,
    Path(desk_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<TakeDeskRequest>,
) -> AppResult<Json<Desk>> {
    authorize_desk(&resources, &headers, desk_id)?;
    let desk = resources
        .coordinator
        .take_desk(desk_id, req.assistant_id)
        .await?;
    Ok(Json(desk))
}

async fn release_desk(
    State(resources): State<Arc<ServerResources>>,
    Path(desk_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Json<Desk>> {
    authorize_desk(&resources, &headers, desk_id)?;
    let desk = resources.coordinator.release_desk(desk_id).await?;
    Ok(Json(desk))
}

/// Pull the oldest eligible waiting ticket onto this desk.
/// Responds with `null` when the queue has nothing eligible.
async fn assign_next(
    State(resources): State<Arc<ServerResources>>,
    Path(desk_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Json<Option<Ticket>>> {
    authorize_desk(&resources, &headers, desk_id)?;
    let assigned = resources.coordinator.assign_next_ticket(desk_id).await?;
    Ok(Json(assigned))
}

#[derive(Debug, Deserialize)]
struct CompleteRequest {
    ticket_id: Uuid,
}

async fn complete_ticket(
    State(resources): State<Arc<ServerResources>>,
    Path(desk_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<CompleteRequest>,
) -> AppResult<Json<Ticket>> {
    authorize_desk(&resources, &headers, desk_id)?;
    let ticket = resources
        .coordinator
        .complete_ticket(req.ticket_id, desk_id)
        .await?;
    Ok(Json(ticket))
}

/// Staff cancellation; no holder check
async fn cancel_ticket(
    State(resources): State<Arc<ServerResources>>,
    Path(ticket_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Json<Ticket>> {
    let claims = resources.auth.require_staff(&headers)?;
    let company_id = resources.coordinator.company_of_ticket(ticket_id)?;
    if !claims.can_act_on(company_id) {
        return Err(
            AppError::auth_invalid("ticket belongs to another company").with_ticket_id(ticket_id)
        );
    }
    let ticket = resources.coordinator.cancel_ticket(ticket_id, None).await?;
    Ok(Json(ticket))
}
