// ABOUTME: Staff tenant administration: companies, desks, and assistant records
// ABOUTME: The minimum CRUD the live queue needs; profile editing stays with external collaborators
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::errors::{AppError, AppResult};
use crate::models::{Assistant, Company, Desk, StaffRole};
use crate::server::ServerResources;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

pub fn routes(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .route("/api/staff/companies", post(create_company))
        .route("/api/staff/companies/:company_id", delete(remove_company))
        .route(
            "/api/staff/companies/:company_id/desks",
            post(create_desk).get(list_desks),
        )
        .route("/api/staff/desks/:desk_id", delete(remove_desk))
        .route(
            "/api/staff/companies/:company_id/assistants",
            post(upsert_assistant),
        )
        .route(
            "/api/staff/companies/:company_id/tickets",
            get(company_tickets),
        )
        .with_state(resources)
}

fn require_owner(
    resources: &ServerResources,
    headers: &HeaderMap,
    company_id: Uuid,
) -> AppResult<()> {
    let claims = resources.auth.require_staff(headers)?;
    if claims.role == StaffRole::Assistant {
        return Err(AppError::auth_invalid("assistants cannot administer companies"));
    }
    if !claims.can_act_on(company_id) {
        return Err(AppError::auth_invalid("company belongs to another owner"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct CreateCompanyRequest {
    name: String,
}

async fn create_company(
    State(resources): State<Arc<ServerResources>>,
    headers: HeaderMap,
    Json(req): Json<CreateCompanyRequest>,
) -> AppResult<(StatusCode, Json<Company>)> {
    let claims = resources.auth.require_staff(&headers)?;
    if claims.role == StaffRole::Assistant {
        return Err(AppError::auth_invalid("assistants cannot create companies"));
    }
    if req.name.trim().is_empty() {
        return Err(AppError::invalid_input("company name must not be empty"));
    }

    let company = Company::new(req.name.trim());
    resources.coordinator.register_company(company.clone());
    Ok((StatusCode::CREATED, Json(company)))
}

async fn remove_company(
    State(resources): State<Arc<ServerResources>>,
    Path(company_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    require_owner(&resources, &headers, company_id)?;
    resources.coordinator.remove_company(company_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct CreateDeskRequest {
    label: String,
    #[serde(default)]
    available_from: Option<DateTime<Utc>>,
    #[serde(default)]
    available_to: Option<DateTime<Utc>>,
}

async fn create_desk(
    State(resources): State<Arc<ServerResources>>,
    Path(company_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<CreateDeskRequest>,
) -> AppResult<(StatusCode, Json<Desk>)> {
    require_owner(&resources, &headers, company_id)?;
    if req.label.trim().is_empty()
        || req.label.len() > crate::constants::limits::MAX_DESK_LABEL_LEN
    {
        return Err(AppError::invalid_input("invalid desk label"));
    }

    let mut desk = Desk::new(company_id, req.label.trim());
    desk.available_from = req.available_from;
    desk.available_to = req.available_to;
    let desk = resources.coordinator.register_desk(company_id, desk).await?;
    Ok((StatusCode::CREATED, Json(desk)))
}

async fn list_desks(
    State(resources): State<Arc<ServerResources>>,
    Path(company_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<Desk>>> {
    let claims = resources.auth.require_staff(&headers)?;
    if !claims.can_act_on(company_id) {
        return Err(AppError::auth_invalid("company belongs to another owner"));
    }
    Ok(Json(resources.coordinator.get_desks(company_id).await?))
}

async fn remove_desk(
    State(resources): State<Arc<ServerResources>>,
    Path(desk_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    let claims = resources.auth.require_staff(&headers)?;
    let company_id = resources.coordinator.company_of_desk(desk_id)?;
    if claims.role == StaffRole::Assistant || !claims.can_act_on(company_id) {
        return Err(AppError::auth_invalid("not authorized for this desk"));
    }
    resources.coordinator.remove_desk(desk_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct UpsertAssistantRequest {
    #[serde(default)]
    id: Option<Uuid>,
    name: String,
    role: StaffRole,
    #[serde(default)]
    skills: HashSet<String>,
}

#[derive(Debug, Serialize)]
struct AssistantResponse {
    assistant: Assistant,
    /// Staff JWT the new assistant signs in with
    token: String,
}

async fn upsert_assistant(
    State(resources): State<Arc<ServerResources>>,
    Path(company_id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<UpsertAssistantRequest>,
) -> AppResult<(StatusCode, Json<AssistantResponse>)> {
    require_owner(&resources, &headers, company_id)?;
    if req
        .skills
        .iter()
        .any(|s| s.is_empty() || s.len() > crate::constants::limits::MAX_SKILL_LEN)
    {
        return Err(AppError::invalid_input("invalid skill tag"));
    }

    let assistant = Assistant {
        id: req.id.unwrap_or_else(Uuid::new_v4),
        company_id: Some(company_id),
        name: req.name,
        role: req.role,
        skills: req.skills,
    };
    resources
        .coordinator
        .upsert_assistant(company_id, assistant.clone())
        .await?;
    let token = resources.auth.issue_token(&assistant)?;
    Ok((
        StatusCode::CREATED,
        Json(AssistantResponse { assistant, token }),
    ))
}

/// Staff view of the live queue, same snapshot the public endpoint serves
async fn company_tickets(
    State(resources): State<Arc<ServerResources>>,
    Path(company_id): Path<Uuid>,
    headers: HeaderMap,
) -> AppResult<Json<Vec<crate::models::Ticket>>> {
    let claims = resources.auth.require_staff(&headers)?;
    if !claims.can_act_on(company_id) {
        return Err(AppError::auth_invalid("company belongs to another owner"));
    }
    Ok(Json(resources.coordinator.get_tickets(company_id).await?))
}
