// ABOUTME: In-memory authoritative ticket store for one company
// ABOUTME: FIFO selection of the oldest eligible waiting ticket, ties broken by creation time then id
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::models::{Ticket, TicketStatus};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Live tickets of a single company. Terminal tickets stay until the
/// coordinator removes them for archival (after scoring or eviction).
#[derive(Debug, Default)]
pub struct TicketStore {
    tickets: HashMap<Uuid, Ticket>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ticket: Ticket) {
        self.tickets.insert(ticket.id, ticket);
    }

    pub fn get(&self, id: Uuid) -> Option<&Ticket> {
        self.tickets.get(&id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Ticket> {
        self.tickets.get_mut(&id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Ticket> {
        self.tickets.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Oldest `Waiting` ticket whose skill requirement is empty or covered
    /// by `skills`. Strict FIFO: earliest `created_at` wins, ticket id
    /// breaks exact-timestamp ties so selection is deterministic.
    pub fn next_eligible_waiting(&self, skills: &HashSet<String>) -> Option<Uuid> {
        self.tickets
            .values()
            .filter(|t| t.status == TicketStatus::Waiting)
            .filter(|t| {
                t.required_skill
                    .as_ref()
                    .is_none_or(|skill| skills.contains(skill))
            })
            .min_by_key(|t| (t.created_at, t.id))
            .map(|t| t.id)
    }

    /// The session's current non-terminal ticket, if any. A session holds
    /// at most one.
    pub fn active_for_session(&self, session_id: Uuid) -> Option<&Ticket> {
        self.tickets
            .values()
            .find(|t| t.session_id == session_id && !t.status.is_terminal())
    }

    /// All tickets of the session in the given state
    pub fn session_tickets_in(&self, session_id: Uuid, status: TicketStatus) -> Vec<Uuid> {
        self.tickets
            .values()
            .filter(|t| t.session_id == session_id && t.status == status)
            .map(|t| t.id)
            .collect()
    }

    /// Snapshot of every live ticket, ordered by creation time then id
    pub fn snapshot(&self) -> Vec<Ticket> {
        let mut all: Vec<Ticket> = self.tickets.values().cloned().collect();
        all.sort_by_key(|t| (t.created_at, t.id));
        all
    }

    pub fn iter(&self) -> impl Iterator<Item = &Ticket> {
        self.tickets.values()
    }
}
