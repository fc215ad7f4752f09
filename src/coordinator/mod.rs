// ABOUTME: Queue coordinator: per-company serialized state machine driving all ticket/desk mutations
// ABOUTME: Resolves ids to tenants, locks one company at a time, publishes committed events, archives terminals
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! # Queue Coordinator
//!
//! One [`CompanyQueue`] aggregate per tenant, each behind its own async
//! mutex in a sharded map. Operations on different companies run fully
//! parallel; every mutation of one company's tickets and desks is
//! serialized through its mutex, so no transition can observe a stale desk
//! or ticket.
//!
//! Discipline per operation: resolve the company shard, lock it, apply the
//! validated transition(s), publish the resulting events (synchronous,
//! fire-and-forget sends - nothing is awaited inside the critical section),
//! release the lock, then hand terminal tickets and flushed batches to the
//! archive on a spawned task. Archive failures are logged; they never roll
//! back a committed live transition.

pub mod company;

pub use company::{CompanyQueue, EventBuffer, EvictionOutcome, FlushedBatch};

use crate::errors::{AppError, AppResult};
use crate::events::EventPublisher;
use crate::models::{Assistant, Company, Desk, Ticket};
use crate::store::ArchiveStore;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Coordinator configuration extracted from [`crate::config::ServerConfig`]
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    pub max_score: u8,
    pub stale_ticket_ttl: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            max_score: crate::constants::defaults::MAX_SCORE,
            stale_ticket_ttl: Duration::from_secs(
                crate::constants::defaults::STALE_TICKET_TTL_SECS,
            ),
        }
    }
}

/// The central state machine of the service
pub struct QueueCoordinator {
    companies: DashMap<Uuid, Arc<Mutex<CompanyQueue>>>,
    /// ticket id → owning company, for operations addressed by ticket alone
    ticket_index: DashMap<Uuid, Uuid>,
    /// desk id → owning company
    desk_index: DashMap<Uuid, Uuid>,
    publisher: Arc<dyn EventPublisher>,
    archive: Arc<dyn ArchiveStore>,
    settings: CoordinatorSettings,
}

impl QueueCoordinator {
    pub fn new(
        publisher: Arc<dyn EventPublisher>,
        archive: Arc<dyn ArchiveStore>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            companies: DashMap::new(),
            ticket_index: DashMap::new(),
            desk_index: DashMap::new(),
            publisher,
            archive,
            settings,
        }
    }

    // ── Tenant and staff registration ───────────────────────────────────

    /// Register a company. Idempotent on id.
    pub fn register_company(&self, company: Company) {
        info!(company_id = %company.id, name = %company.name, "company registered");
        self.companies
            .entry(company.id)
            .or_insert_with(|| Arc::new(Mutex::new(CompanyQueue::new(company))));
    }

    /// Remove a company with no live tickets or desks
    pub async fn remove_company(&self, company_id: Uuid) -> AppResult<()> {
        let shard = self.shard(company_id)?;
        {
            let queue = shard.lock().await;
            if !queue.tickets.is_empty() || !queue.desks.is_empty() {
                return Err(AppError::illegal_transition(
                    "company still has live tickets or desks",
                )
                .with_company_id(company_id));
            }
        }
        self.companies.remove(&company_id);
        Ok(())
    }

    pub async fn register_desk(&self, company_id: Uuid, desk: Desk) -> AppResult<Desk> {
        let shard = self.shard(company_id)?;
        let mut queue = shard.lock().await;
        let desk_id = desk.id;
        queue.desks.insert(desk.clone());
        drop(queue);
        self.desk_index.insert(desk_id, company_id);
        debug!(%company_id, %desk_id, "desk registered");
        Ok(desk)
    }

    /// Destroy a desk; rejected with `DeskBusy` while it serves a ticket
    pub async fn remove_desk(&self, desk_id: Uuid) -> AppResult<Desk> {
        let company_id = self.company_of_desk(desk_id)?;
        let shard = self.shard(company_id)?;
        let mut queue = shard.lock().await;
        let desk = queue.desks.remove(desk_id)?;
        drop(queue);
        self.desk_index.remove(&desk_id);
        Ok(desk)
    }

    pub async fn upsert_assistant(&self, company_id: Uuid, assistant: Assistant) -> AppResult<()> {
        let shard = self.shard(company_id)?;
        shard.lock().await.upsert_assistant(assistant);
        Ok(())
    }

    // ── Queue operations ────────────────────────────────────────────────

    /// Public client draws a ticket
    pub async fn create_ticket(
        &self,
        company_id: Uuid,
        session_id: Uuid,
        required_skill: Option<String>,
    ) -> AppResult<Ticket> {
        let shard = self
            .shard(company_id)
            .map_err(|_| AppError::invalid_company(company_id))?;
        let mut queue = shard.lock().await;
        let mut events = EventBuffer::new();
        let ticket = queue.create_ticket(session_id, required_skill, &mut events)?;
        self.publish_all(&events);
        drop(queue);

        self.ticket_index.insert(ticket.id, company_id);
        debug!(%company_id, ticket_id = %ticket.id, number = ticket.number, "ticket created");
        Ok(ticket)
    }

    /// Pull the oldest eligible waiting ticket onto a free desk.
    /// `Ok(None)` when nothing is eligible.
    pub async fn assign_next_ticket(&self, desk_id: Uuid) -> AppResult<Option<Ticket>> {
        let company_id = self.company_of_desk(desk_id)?;
        let shard = self.shard(company_id)?;
        let mut queue = shard.lock().await;
        let mut events = EventBuffer::new();
        let assigned = queue.assign_next_ticket(desk_id, Utc::now(), &mut events)?;
        self.publish_all(&events);
        drop(queue);

        if let Some(ticket) = &assigned {
            debug!(%desk_id, ticket_id = %ticket.id, "ticket called to desk");
        }
        Ok(assigned)
    }

    /// Ticket holder signals they are on their way
    pub async fn signal_en_route(&self, ticket_id: Uuid, session_id: Uuid) -> AppResult<Ticket> {
        let company_id = self.company_of_ticket(ticket_id)?;
        let shard = self.shard(company_id)?;
        let mut queue = shard.lock().await;
        let mut events = EventBuffer::new();
        let ticket = queue.signal_en_route(ticket_id, session_id, &mut events)?;
        self.publish_all(&events);
        drop(queue);
        Ok(ticket)
    }

    /// Serving desk finishes the ticket; the desk is freed and the next
    /// eligible ticket is pulled in the same serialized section
    pub async fn complete_ticket(&self, ticket_id: Uuid, desk_id: Uuid) -> AppResult<Ticket> {
        let company_id = self.company_of_ticket(ticket_id)?;
        let shard = self.shard(company_id)?;
        let mut queue = shard.lock().await;
        let mut events = EventBuffer::new();
        let ticket = queue.complete_ticket(ticket_id, desk_id, &mut events)?;
        self.publish_all(&events);
        drop(queue);
        Ok(ticket)
    }

    /// Cancel from Waiting or Called; a Called ticket's desk is freed and
    /// refilled in the same call. Public callers pass their session id for
    /// the holder check; staff pass `None`.
    pub async fn cancel_ticket(
        &self,
        ticket_id: Uuid,
        requester_session: Option<Uuid>,
    ) -> AppResult<Ticket> {
        let company_id = self.company_of_ticket(ticket_id)?;
        let shard = self.shard(company_id)?;
        let mut queue = shard.lock().await;
        let mut events = EventBuffer::new();
        let ticket = queue.cancel_ticket(ticket_id, requester_session, &mut events)?;
        self.publish_all(&events);
        drop(queue);
        Ok(ticket)
    }

    /// Seat an assistant at a desk
    pub async fn take_desk(&self, desk_id: Uuid, assistant_id: Uuid) -> AppResult<Desk> {
        let company_id = self.company_of_desk(desk_id)?;
        let shard = self.shard(company_id)?;
        let desk = shard.lock().await.take_desk(desk_id, assistant_id)?;
        debug!(%desk_id, %assistant_id, "desk taken");
        Ok(desk)
    }

    /// Vacate a desk; `DeskBusy` mid-service
    pub async fn release_desk(&self, desk_id: Uuid) -> AppResult<Desk> {
        let company_id = self.company_of_desk(desk_id)?;
        let shard = self.shard(company_id)?;
        let desk = shard.lock().await.release_desk(desk_id)?;
        debug!(%desk_id, "desk released");
        Ok(desk)
    }

    /// Submit a score for a finished ticket. Completing the session's batch
    /// flushes it and clears the session in the same serialized step.
    pub async fn submit_score(
        &self,
        ticket_id: Uuid,
        session_id: Uuid,
        value: u8,
    ) -> AppResult<()> {
        let company_id = self.company_of_ticket(ticket_id)?;
        let shard = self.shard(company_id)?;
        let mut queue = shard.lock().await;
        let flushed = queue.submit_score(ticket_id, session_id, value, self.settings.max_score)?;
        drop(queue);

        if let Some(batch) = flushed {
            info!(
                %session_id,
                scores = batch.scores.len(),
                "score batch complete, flushing"
            );
            self.archive_batch(batch);
        }
        Ok(())
    }

    /// Full live snapshot for one company, the resynchronization path for
    /// clients that missed events while disconnected
    pub async fn get_tickets(&self, company_id: Uuid) -> AppResult<Vec<Ticket>> {
        let shard = self
            .shard(company_id)
            .map_err(|_| AppError::invalid_company(company_id))?;
        let queue = shard.lock().await;
        Ok(queue.tickets.snapshot())
    }

    /// Desk list for one company's staff UI
    pub async fn get_desks(&self, company_id: Uuid) -> AppResult<Vec<Desk>> {
        let shard = self.shard(company_id)?;
        let queue = shard.lock().await;
        let mut desks: Vec<Desk> = queue.desks.iter().cloned().collect();
        desks.sort_by_key(|d| d.id);
        Ok(desks)
    }

    /// Evict stuck tickets and expired score sessions across all tenants.
    /// Returns the number of tenants touched.
    pub async fn evict_stale(&self) -> usize {
        let shards: Vec<(Uuid, Arc<Mutex<CompanyQueue>>)> = self
            .companies
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();

        let now = Utc::now();
        let mut touched = 0;
        for (company_id, shard) in shards {
            let mut queue = shard.lock().await;
            let mut events = EventBuffer::new();
            match queue.evict_stale(now, self.settings.stale_ticket_ttl, &mut events) {
                Ok(outcome) => {
                    if !events.is_empty()
                        || !outcome.flushed.is_empty()
                        || !outcome.archived.is_empty()
                    {
                        touched += 1;
                    }
                    self.publish_all(&events);
                    drop(queue);
                    for batch in outcome.flushed {
                        self.archive_batch(batch);
                    }
                    for ticket in outcome.archived {
                        self.ticket_index.remove(&ticket.id);
                        let archive = Arc::clone(&self.archive);
                        tokio::spawn(async move {
                            if let Err(e) = archive.archive_ticket(&ticket).await {
                                warn!(ticket_id = %ticket.id, error = %e, "ticket archival failed");
                            }
                        });
                    }
                }
                Err(e) => {
                    warn!(%company_id, error = %e, "eviction sweep failed for company");
                }
            }
        }
        touched
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn shard(&self, company_id: Uuid) -> AppResult<Arc<Mutex<CompanyQueue>>> {
        self.companies
            .get(&company_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| AppError::invalid_company(company_id))
    }

    pub fn company_of_ticket(&self, ticket_id: Uuid) -> AppResult<Uuid> {
        self.ticket_index
            .get(&ticket_id)
            .map(|e| *e.value())
            .ok_or_else(|| AppError::unknown_ticket(ticket_id))
    }

    pub fn company_of_desk(&self, desk_id: Uuid) -> AppResult<Uuid> {
        self.desk_index
            .get(&desk_id)
            .map(|e| *e.value())
            .ok_or_else(|| AppError::not_found("desk").with_desk_id(desk_id))
    }

    /// Publish committed events in transition order. Synchronous sends -
    /// never awaited, never escalated to the initiating caller.
    fn publish_all(&self, events: &EventBuffer) {
        for (room, event) in events {
            self.publisher.publish(room, event);
        }
    }

    /// Hand a flushed batch to the durable archive off the hot path
    fn archive_batch(&self, batch: FlushedBatch) {
        for ticket in &batch.archived_tickets {
            self.ticket_index.remove(&ticket.id);
        }
        let archive = Arc::clone(&self.archive);
        tokio::spawn(async move {
            if let Err(e) = archive
                .archive_scores(batch.session_id, batch.company_id, &batch.scores)
                .await
            {
                warn!(session_id = %batch.session_id, error = %e, "score batch archival failed");
            }
            for ticket in &batch.archived_tickets {
                if let Err(e) = archive.archive_ticket(ticket).await {
                    warn!(ticket_id = %ticket.id, error = %e, "ticket archival failed");
                }
            }
        });
    }
}
