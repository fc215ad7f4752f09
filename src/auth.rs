// ABOUTME: Session context: staff JWT issuing/validation and anonymous public session identity
// ABOUTME: The coordinator consumes this only to route messages and check callers, never owns it
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! Two kinds of callers exist: authenticated staff (JWT carrying user,
//! company, role) and anonymous public sessions (a server-minted Uuid the
//! kiosk echoes back). Everything beyond that distinction is out of scope.

use crate::constants::defaults;
use crate::errors::{AppError, AppResult};
use crate::models::{Assistant, StaffRole};
use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Legacy header the kiosk hardware still sends
pub const TOKEN_HEADER: &str = "turnos-token";

/// Claims carried by a staff JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffClaims {
    /// Staff user id
    pub sub: Uuid,
    /// Company the staff member belongs to; None for platform admins
    pub company_id: Option<Uuid>,
    pub role: StaffRole,
    /// Expiry, seconds since epoch
    pub exp: i64,
    /// Issued at, seconds since epoch
    pub iat: i64,
}

impl StaffClaims {
    /// Whether the claims authorize acting on the given company
    pub fn can_act_on(&self, company_id: Uuid) -> bool {
        self.role == StaffRole::Admin || self.company_id == Some(company_id)
    }
}

/// Issues and validates staff tokens (HS256)
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthManager {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        }
    }

    /// Issue a token for a staff member
    pub fn issue_token(&self, assistant: &Assistant) -> AppResult<String> {
        let now = Utc::now();
        let claims = StaffClaims {
            sub: assistant.id,
            company_id: assistant.company_id,
            role: assistant.role,
            exp: (now + chrono::Duration::hours(defaults::JWT_EXPIRY_HOURS)).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("token signing failed: {e}")))
    }

    /// Validate a raw token string
    pub fn validate(&self, token: &str) -> AppResult<StaffClaims> {
        let data = decode::<StaffClaims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::auth_invalid(format!("invalid staff token: {e}")))?;
        Ok(data.claims)
    }

    /// Extract and validate the staff token from request headers.
    /// Accepts `Authorization: Bearer <jwt>` and the legacy `turnos-token`
    /// header.
    pub fn require_staff(&self, headers: &HeaderMap) -> AppResult<StaffClaims> {
        let token = token_from_headers(headers).ok_or_else(AppError::auth_required)?;
        self.validate(token)
    }
}

fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token);
            }
        }
    }
    headers.get(TOKEN_HEADER).and_then(|v| v.to_str().ok())
}

/// Mint a fresh anonymous public session id
pub fn new_public_session() -> Uuid {
    Uuid::new_v4()
}
