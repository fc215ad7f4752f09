// ABOUTME: Per-company queue aggregate: tickets, desks, assistants, and score batches of one tenant
// ABOUTME: Every state transition is validated here; each mutation appends the events it committed
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! The aggregate behind each company's mutex. Methods mutate live state and
//! append the resulting [`QueueEvent`]s (with their audience rooms) to the
//! caller's buffer in transition order; the coordinator publishes them after
//! the mutation committed. Nothing here performs I/O.

use crate::errors::{AppError, AppResult};
use crate::events::{QueueEvent, Room};
use crate::models::{Assistant, Company, Desk, Score, Ticket, TicketStatus};
use crate::scores::ScoreAggregator;
use crate::store::{DeskRegistry, TicketStore};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use uuid::Uuid;

/// Event buffer filled by aggregate mutations
pub type EventBuffer = Vec<(Room, QueueEvent)>;

/// A completed score batch ready for archival, paired with the finished
/// tickets it releases from the live store.
#[derive(Debug)]
pub struct FlushedBatch {
    pub session_id: Uuid,
    pub company_id: Uuid,
    pub scores: Vec<Score>,
    pub archived_tickets: Vec<Ticket>,
}

/// What an eviction sweep removed from one company
#[derive(Debug, Default)]
pub struct EvictionOutcome {
    /// Sessions force-flushed with whatever partial batch existed
    pub flushed: Vec<FlushedBatch>,
    /// Stale cancelled tickets released straight to the archive
    pub archived: Vec<Ticket>,
}

/// Live queue state of one company
#[derive(Debug)]
pub struct CompanyQueue {
    pub company: Company,
    pub tickets: TicketStore,
    pub desks: DeskRegistry,
    assistants: HashMap<Uuid, Assistant>,
    scores: ScoreAggregator,
    next_number: u32,
}

impl CompanyQueue {
    pub fn new(company: Company) -> Self {
        Self {
            company,
            tickets: TicketStore::new(),
            desks: DeskRegistry::new(),
            assistants: HashMap::new(),
            scores: ScoreAggregator::new(),
            next_number: 0,
        }
    }

    pub fn upsert_assistant(&mut self, assistant: Assistant) {
        self.assistants.insert(assistant.id, assistant);
    }

    /// Skills of the assistant seated at a desk; empty set when the seat is
    /// vacant or the assistant record is unknown.
    fn desk_skills(&self, desk: &Desk) -> HashSet<String> {
        desk.assistant_id
            .and_then(|id| self.assistants.get(&id))
            .map(|a| a.skills.clone())
            .unwrap_or_default()
    }

    /// Draw a new ticket for a public session.
    ///
    /// `InvalidCompany` when the company has no registered desks; a session
    /// must finish or cancel its current ticket before drawing another.
    pub fn create_ticket(
        &mut self,
        session_id: Uuid,
        required_skill: Option<String>,
        events: &mut EventBuffer,
    ) -> AppResult<Ticket> {
        if self.desks.is_empty() {
            return Err(AppError::invalid_company(self.company.id));
        }
        if let Some(active) = self.tickets.active_for_session(session_id) {
            return Err(AppError::illegal_transition(format!(
                "session already holds active ticket {}",
                active.id
            ))
            .with_ticket_id(active.id));
        }

        self.next_number += 1;
        let ticket = Ticket::new(self.company.id, self.next_number, session_id, required_skill);
        self.tickets.insert(ticket.clone());

        events.push((
            Room::Company(self.company.id),
            QueueEvent::TicketCreated {
                ticket: ticket.clone(),
            },
        ));
        Ok(ticket)
    }

    /// Assign the oldest eligible waiting ticket to a desk.
    ///
    /// `Ok(None)` when no ticket is eligible - an expected empty result,
    /// not an error. The desk must be seated, idle, and inside its window.
    pub fn assign_next_ticket(
        &mut self,
        desk_id: Uuid,
        now: DateTime<Utc>,
        events: &mut EventBuffer,
    ) -> AppResult<Option<Ticket>> {
        let desk = self
            .desks
            .get(desk_id)
            .ok_or_else(|| AppError::not_found("desk").with_desk_id(desk_id))?;
        if desk.assistant_id.is_none() {
            return Err(
                AppError::illegal_transition("desk has no assistant seated").with_desk_id(desk_id)
            );
        }
        if desk.current_ticket.is_some() {
            return Err(AppError::desk_busy(desk_id));
        }
        if !desk.is_within_window(now) {
            // Outside the advisory window the desk takes no new tickets
            return Ok(None);
        }

        let skills = self.desk_skills(desk);
        let Some(ticket_id) = self.tickets.next_eligible_waiting(&skills) else {
            return Ok(None);
        };

        let ticket = self.transition(ticket_id, TicketStatus::Called, now)?;
        let ticket = {
            let t = self
                .tickets
                .get_mut(ticket.id)
                .ok_or_else(|| AppError::internal("ticket vanished mid-assignment"))?;
            t.desk_id = Some(desk_id);
            t.clone()
        };
        self.desks.mark_busy(desk_id, ticket.id)?;
        let desk = self
            .desks
            .get(desk_id)
            .ok_or_else(|| AppError::internal("desk vanished mid-assignment"))?
            .clone();

        events.push((
            Room::Session(ticket.session_id),
            QueueEvent::TicketCalled {
                ticket: ticket.clone(),
                desk_id,
            },
        ));
        events.push((
            Room::Company(self.company.id),
            QueueEvent::DeskOccupied {
                desk,
                ticket: ticket.clone(),
            },
        ));
        Ok(Some(ticket))
    }

    /// Holder signals they are walking to the desk. Called → InProgress.
    pub fn signal_en_route(
        &mut self,
        ticket_id: Uuid,
        session_id: Uuid,
        events: &mut EventBuffer,
    ) -> AppResult<Ticket> {
        let ticket = self
            .tickets
            .get(ticket_id)
            .ok_or_else(|| AppError::unknown_ticket(ticket_id))?;
        if ticket.session_id != session_id {
            return Err(AppError::auth_invalid("not the ticket holder").with_ticket_id(ticket_id));
        }
        let desk_id = ticket.desk_id;

        let ticket = self.transition(ticket_id, TicketStatus::InProgress, Utc::now())?;
        if let Some(desk_id) = desk_id {
            events.push((
                Room::Desk(desk_id),
                QueueEvent::ClienteEnCamino {
                    desk_id,
                    ticket_id: ticket.id,
                },
            ));
        }
        Ok(ticket)
    }

    /// Serving desk marks the service finished. Frees the desk and
    /// immediately pulls the next eligible ticket onto it.
    pub fn complete_ticket(
        &mut self,
        ticket_id: Uuid,
        desk_id: Uuid,
        events: &mut EventBuffer,
    ) -> AppResult<Ticket> {
        let ticket = self
            .tickets
            .get(ticket_id)
            .ok_or_else(|| AppError::unknown_ticket(ticket_id))?;
        if ticket.desk_id != Some(desk_id) {
            return Err(
                AppError::auth_invalid("ticket is not served by this desk").with_desk_id(desk_id)
            );
        }

        let ticket = self.transition(ticket_id, TicketStatus::Done, Utc::now())?;
        self.desks.mark_free(desk_id);

        events.push((
            Room::Session(ticket.session_id),
            QueueEvent::TicketDone {
                ticket: ticket.clone(),
            },
        ));

        // Reassignment runs in the same serialized section; no ticket is an
        // expected no-op
        self.assign_next_ticket(desk_id, Utc::now(), events)?;
        Ok(ticket)
    }

    /// Cancel a ticket from Waiting or Called. Cancelling a Called ticket
    /// frees its desk and triggers reassignment in the same call.
    ///
    /// `requester_session` is checked against the holder for public
    /// callers; staff cancellations pass `None`.
    pub fn cancel_ticket(
        &mut self,
        ticket_id: Uuid,
        requester_session: Option<Uuid>,
        events: &mut EventBuffer,
    ) -> AppResult<Ticket> {
        let ticket = self
            .tickets
            .get(ticket_id)
            .ok_or_else(|| AppError::unknown_ticket(ticket_id))?;
        if let Some(session_id) = requester_session {
            if ticket.session_id != session_id {
                return Err(
                    AppError::auth_invalid("not the ticket holder").with_ticket_id(ticket_id)
                );
            }
        }
        let freed_desk = ticket.desk_id;

        let ticket = self.transition(ticket_id, TicketStatus::Cancelled, Utc::now())?;

        events.push((
            Room::Company(self.company.id),
            QueueEvent::TicketCancelled { ticket_id },
        ));
        events.push((
            Room::Session(ticket.session_id),
            QueueEvent::TicketCancelled { ticket_id },
        ));

        if let Some(desk_id) = freed_desk {
            self.desks.mark_free(desk_id);
            self.assign_next_ticket(desk_id, Utc::now(), events)?;
        }
        Ok(ticket)
    }

    /// Seat an assistant at a desk. Pure occupancy toggle; pulling the
    /// first ticket stays an explicit `assign_next_ticket` call.
    pub fn take_desk(&mut self, desk_id: Uuid, assistant_id: Uuid) -> AppResult<Desk> {
        if !self.assistants.contains_key(&assistant_id) {
            return Err(AppError::not_found("assistant"));
        }
        Ok(self.desks.take(desk_id, assistant_id)?.clone())
    }

    /// Vacate a desk. `DeskBusy` mid-service.
    pub fn release_desk(&mut self, desk_id: Uuid) -> AppResult<Desk> {
        Ok(self.desks.release(desk_id)?.clone())
    }

    /// Submit one score for a finished ticket of this session.
    ///
    /// Returns the flushed batch when this score completed it: every
    /// finished ticket of the session scored. Flushing removes the
    /// session's terminal tickets from the live store in the same step.
    pub fn submit_score(
        &mut self,
        ticket_id: Uuid,
        session_id: Uuid,
        value: u8,
        max_score: u8,
    ) -> AppResult<Option<FlushedBatch>> {
        if value > max_score {
            return Err(AppError::score_out_of_range(value, max_score));
        }
        let ticket = self
            .tickets
            .get(ticket_id)
            .ok_or_else(|| AppError::unknown_ticket(ticket_id))?;
        if ticket.status != TicketStatus::Done || ticket.session_id != session_id {
            return Err(AppError::unknown_ticket(ticket_id));
        }

        self.scores.record(session_id, ticket_id, value);
        Ok(self.try_flush_session(session_id))
    }

    /// Flush the session's batch if every finished ticket is scored
    fn try_flush_session(&mut self, session_id: Uuid) -> Option<FlushedBatch> {
        let done = self
            .tickets
            .session_tickets_in(session_id, TicketStatus::Done);
        if done.is_empty() || self.scores.batch_len(session_id) < done.len() {
            return None;
        }

        Some(self.flush_session(session_id, &done))
    }

    /// Unconditionally flush a session: take its (possibly partial) batch
    /// and release its terminal tickets from the live store.
    fn flush_session(&mut self, session_id: Uuid, done_tickets: &[Uuid]) -> FlushedBatch {
        let scores = self.scores.take_batch(session_id);
        let mut archived: Vec<Ticket> = done_tickets
            .iter()
            .filter_map(|id| self.tickets.remove(*id))
            .collect();
        // Cancelled leftovers of the session leave the live store too
        for id in self
            .tickets
            .session_tickets_in(session_id, TicketStatus::Cancelled)
        {
            if let Some(t) = self.tickets.remove(id) {
                archived.push(t);
            }
        }

        FlushedBatch {
            session_id,
            company_id: self.company.id,
            scores,
            archived_tickets: archived,
        }
    }

    /// Evict tickets stuck past the TTL and force-flush their sessions.
    ///
    /// Called/InProgress tickets older than `ttl` (by last transition) are
    /// cancelled, freeing their desks; Done-but-unscored tickets older than
    /// `ttl` get their session flushed with whatever partial batch exists.
    pub fn evict_stale(
        &mut self,
        now: DateTime<Utc>,
        ttl: Duration,
        events: &mut EventBuffer,
    ) -> AppResult<EvictionOutcome> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| AppError::config("stale ticket TTL out of range"))?;
        let cutoff = now - ttl;

        let stuck: Vec<Uuid> = self
            .tickets
            .iter()
            .filter(|t| {
                matches!(t.status, TicketStatus::Called | TicketStatus::InProgress)
                    && t.updated_at < cutoff
            })
            .map(|t| t.id)
            .collect();
        for ticket_id in stuck {
            // InProgress is not cancellable by the state machine; force the
            // desk free and drop the ticket as Done-without-score instead
            let status = self.tickets.get(ticket_id).map(|t| t.status);
            match status {
                Some(TicketStatus::Called) => {
                    self.cancel_ticket(ticket_id, None, events)?;
                }
                Some(TicketStatus::InProgress) => {
                    if let Some(desk_id) = self.tickets.get(ticket_id).and_then(|t| t.desk_id) {
                        self.complete_ticket(ticket_id, desk_id, events)?;
                    }
                }
                _ => {}
            }
        }

        let expired_sessions: Vec<Uuid> = self
            .tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Done && t.updated_at < cutoff)
            .map(|t| t.session_id)
            .collect();
        let mut outcome = EvictionOutcome::default();
        for session_id in expired_sessions {
            let done = self
                .tickets
                .session_tickets_in(session_id, TicketStatus::Done);
            if !done.is_empty() {
                outcome.flushed.push(self.flush_session(session_id, &done));
            }
        }

        // Stale cancelled tickets whose session never scored anything
        let stale_cancelled: Vec<Uuid> = self
            .tickets
            .iter()
            .filter(|t| t.status == TicketStatus::Cancelled && t.updated_at < cutoff)
            .map(|t| t.id)
            .collect();
        for id in stale_cancelled {
            if let Some(ticket) = self.tickets.remove(id) {
                outcome.archived.push(ticket);
            }
        }
        Ok(outcome)
    }

    /// Apply a validated state transition and return the updated ticket
    fn transition(
        &mut self,
        ticket_id: Uuid,
        next: TicketStatus,
        now: DateTime<Utc>,
    ) -> AppResult<Ticket> {
        let ticket = self
            .tickets
            .get_mut(ticket_id)
            .ok_or_else(|| AppError::unknown_ticket(ticket_id))?;
        if !ticket.status.can_transition_to(next) {
            return Err(AppError::illegal_transition(format!(
                "{:?} -> {:?} is not a legal ticket transition",
                ticket.status, next
            ))
            .with_ticket_id(ticket_id));
        }
        ticket.status = next;
        ticket.updated_at = now;
        // The desk back-reference is cleared on completion and cancellation
        if next.is_terminal() {
            ticket.desk_id = None;
        }
        Ok(ticket.clone())
    }
}
