// ABOUTME: Durable archive for terminal tickets and flushed score batches
// ABOUTME: Request/response collaborator backed by SQLite; never consulted on the live queue path
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! The archive is the external durable store of the system. The coordinator
//! hands it terminal tickets and flushed score batches *after* the live
//! transition committed, outside the per-company lock; archive failures are
//! logged and never roll back a committed transition.

use crate::errors::{AppError, AppResult};
use crate::models::{Score, Ticket, TicketStatus};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use uuid::Uuid;

/// Durable store interface consumed by the coordinator
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Persist a ticket that reached a terminal state
    async fn archive_ticket(&self, ticket: &Ticket) -> AppResult<()>;

    /// Persist a flushed score batch
    async fn archive_scores(&self, session_id: Uuid, company_id: Uuid, scores: &[Score])
        -> AppResult<()>;

    /// Count archived tickets for a company (operational visibility)
    async fn archived_ticket_count(&self, company_id: Uuid) -> AppResult<i64>;
}

/// No-op archive used when `TURNOS_ARCHIVE_URL` is unset and in tests that
/// only exercise live-queue behavior.
#[derive(Debug, Default)]
pub struct NullArchive;

#[async_trait]
impl ArchiveStore for NullArchive {
    async fn archive_ticket(&self, _ticket: &Ticket) -> AppResult<()> {
        Ok(())
    }

    async fn archive_scores(
        &self,
        _session_id: Uuid,
        _company_id: Uuid,
        _scores: &[Score],
    ) -> AppResult<()> {
        Ok(())
    }

    async fn archived_ticket_count(&self, _company_id: Uuid) -> AppResult<i64> {
        Ok(0)
    }
}

/// SQLite-backed archive
#[derive(Debug, Clone)]
pub struct SqliteArchive {
    pool: SqlitePool,
}

impl SqliteArchive {
    /// Connect and run idempotent schema setup
    pub async fn connect(url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::config(format!("invalid archive url: {e}")))?
            .create_if_missing(true);
        // Single connection: archive writes are low-rate, and in-memory
        // SQLite databases are per-connection
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| AppError::internal(format!("archive connect failed: {e}")))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS archived_tickets (
                id TEXT PRIMARY KEY,
                company_id TEXT NOT NULL,
                number INTEGER NOT NULL,
                session_id TEXT NOT NULL,
                status TEXT NOT NULL,
                desk_id TEXT,
                required_skill TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| AppError::internal(format!("archive schema setup failed: {e}")))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS archived_scores (
                ticket_id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                company_id TEXT NOT NULL,
                value INTEGER NOT NULL,
                flushed_at INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| AppError::internal(format!("archive schema setup failed: {e}")))?;

        Ok(Self { pool })
    }
}

fn status_str(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Waiting => "WAITING",
        TicketStatus::Called => "CALLED",
        TicketStatus::InProgress => "IN_PROGRESS",
        TicketStatus::Done => "DONE",
        TicketStatus::Cancelled => "CANCELLED",
    }
}

#[async_trait]
impl ArchiveStore for SqliteArchive {
    async fn archive_ticket(&self, ticket: &Ticket) -> AppResult<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO archived_tickets
             (id, company_id, number, session_id, status, desk_id, required_skill, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(ticket.id.to_string())
        .bind(ticket.company_id.to_string())
        .bind(i64::from(ticket.number))
        .bind(ticket.session_id.to_string())
        .bind(status_str(ticket.status))
        .bind(ticket.desk_id.map(|d| d.to_string()))
        .bind(ticket.required_skill.clone())
        .bind(ticket.created_at.timestamp_millis())
        .bind(ticket.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::internal(format!("ticket archival failed: {e}")))?;
        Ok(())
    }

    async fn archive_scores(
        &self,
        session_id: Uuid,
        company_id: Uuid,
        scores: &[Score],
    ) -> AppResult<()> {
        let flushed_at = chrono::Utc::now().timestamp_millis();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::internal(format!("score archival failed: {e}")))?;
        for score in scores {
            sqlx::query(
                "INSERT OR REPLACE INTO archived_scores
                 (ticket_id, session_id, company_id, value, flushed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(score.ticket_id.to_string())
            .bind(session_id.to_string())
            .bind(company_id.to_string())
            .bind(i64::from(score.value))
            .bind(flushed_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::internal(format!("score archival failed: {e}")))?;
        }
        tx.commit()
            .await
            .map_err(|e| AppError::internal(format!("score archival failed: {e}")))?;
        Ok(())
    }

    async fn archived_ticket_count(&self, company_id: Uuid) -> AppResult<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM archived_tickets WHERE company_id = ?1")
                .bind(company_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::internal(format!("archive query failed: {e}")))?;
        Ok(count)
    }
}
