// ABOUTME: Unified error handling with stable error codes and HTTP response mapping
// ABOUTME: Carries the queue taxonomy (InvalidCompany, IllegalTransition, DeskBusy, ...) plus ambient codes
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Unified Error Handling
//!
//! Every fallible operation in the crate returns [`AppResult`]. The
//! [`ErrorCode`] is part of the wire contract: clients switch on it, the
//! human-readable message is presentation only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Stable error codes surfaced to API and WebSocket clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Queue taxonomy
    #[serde(rename = "INVALID_COMPANY")]
    InvalidCompany,
    #[serde(rename = "ILLEGAL_TRANSITION")]
    IllegalTransition,
    #[serde(rename = "DESK_BUSY")]
    DeskBusy,
    #[serde(rename = "UNKNOWN_TICKET")]
    UnknownTicket,
    #[serde(rename = "SCORE_OUT_OF_RANGE")]
    ScoreOutOfRange,

    // Authentication
    #[serde(rename = "AUTH_REQUIRED")]
    AuthRequired,
    #[serde(rename = "AUTH_INVALID")]
    AuthInvalid,

    // Validation and lookup
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput,
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound,

    // Configuration and internal
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    /// HTTP status the code maps to
    pub fn http_status(self) -> StatusCode {
        match self {
            Self::InvalidCompany | Self::UnknownTicket | Self::ResourceNotFound => {
                StatusCode::NOT_FOUND
            }
            Self::IllegalTransition | Self::DeskBusy => StatusCode::CONFLICT,
            Self::ScoreOutOfRange | Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::AuthRequired => StatusCode::UNAUTHORIZED,
            Self::AuthInvalid => StatusCode::FORBIDDEN,
            Self::ConfigError | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short description used in logs
    pub fn description(self) -> &'static str {
        match self {
            Self::InvalidCompany => "Company unknown or has no registered desks",
            Self::IllegalTransition => "Operation not allowed from the ticket's current state",
            Self::DeskBusy => "Desk is serving a ticket",
            Self::UnknownTicket => "Ticket unknown, not finished, or already scored",
            Self::ScoreOutOfRange => "Score value outside the accepted scale",
            Self::AuthRequired => "Authentication required",
            Self::AuthInvalid => "Authentication invalid or insufficient",
            Self::InvalidInput => "Invalid input",
            Self::ResourceNotFound => "Resource not found",
            Self::ConfigError => "Configuration error",
            Self::InternalError => "Internal error",
        }
    }
}

/// Additional context attached to an error for logs and debugging
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Company the failing operation was scoped to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<Uuid>,
    /// Ticket involved, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket_id: Option<Uuid>,
    /// Desk involved, when there is one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desk_id: Option<Uuid>,
}

/// Application error: stable code + message + optional context
#[derive(Debug, Clone, Error)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub context: ErrorContext,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    pub fn with_company_id(mut self, company_id: Uuid) -> Self {
        self.context.company_id = Some(company_id);
        self
    }

    pub fn with_ticket_id(mut self, ticket_id: Uuid) -> Self {
        self.context.ticket_id = Some(ticket_id);
        self
    }

    pub fn with_desk_id(mut self, desk_id: Uuid) -> Self {
        self.context.desk_id = Some(desk_id);
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    // Convenience constructors for the queue taxonomy

    pub fn invalid_company(company_id: Uuid) -> Self {
        Self::new(
            ErrorCode::InvalidCompany,
            "Company unknown or has no registered desks",
        )
        .with_company_id(company_id)
    }

    pub fn illegal_transition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::IllegalTransition, message)
    }

    pub fn desk_busy(desk_id: Uuid) -> Self {
        Self::new(ErrorCode::DeskBusy, "Desk is currently serving a ticket").with_desk_id(desk_id)
    }

    pub fn unknown_ticket(ticket_id: Uuid) -> Self {
        Self::new(
            ErrorCode::UnknownTicket,
            "Ticket unknown, not finished, or already scored",
        )
        .with_ticket_id(ticket_id)
    }

    pub fn score_out_of_range(value: u8, max: u8) -> Self {
        Self::new(
            ErrorCode::ScoreOutOfRange,
            format!("Score {value} outside accepted scale 0..={max}"),
        )
    }

    // Ambient constructors

    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

/// Result alias used throughout the crate
pub type AppResult<T> = Result<T, AppError>;

/// JSON body returned for failed HTTP requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorResponseDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponseDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        let has_context = err.context.company_id.is_some()
            || err.context.ticket_id.is_some()
            || err.context.desk_id.is_some();
        Self {
            error: ErrorResponseDetails {
                code: err.code,
                message: err.message,
                context: has_context.then_some(err.context),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_http_status() {
        assert_eq!(
            ErrorCode::InvalidCompany.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::IllegalTransition.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ErrorCode::DeskBusy.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::ScoreOutOfRange.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::AuthRequired.http_status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_app_error_context_builders() {
        let desk = Uuid::new_v4();
        let err = AppError::desk_busy(desk);
        assert_eq!(err.code, ErrorCode::DeskBusy);
        assert_eq!(err.context.desk_id, Some(desk));
        assert!(err.context.ticket_id.is_none());
    }

    #[test]
    fn test_error_response_serialization() {
        let err = AppError::unknown_ticket(Uuid::new_v4());
        let response = ErrorResponse::from(err);
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("UNKNOWN_TICKET"));
        assert!(json.contains("ticket_id"));
    }

    #[test]
    fn test_score_out_of_range_message() {
        let err = AppError::score_out_of_range(9, 5);
        assert!(err.message.contains("0..=5"));
    }
}
