// ABOUTME: Domain model types for the ticket queue: companies, desks, assistants, tickets, scores
// ABOUTME: Owns the ticket lifecycle state machine and its transition legality rules
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! Core data structures shared across the coordinator, stores, routes, and
//! the event channel. Transition legality lives here, on [`TicketStatus`],
//! so there is exactly one place the state machine is defined.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Tenant boundary. Owns desks, tickets, and assistants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// Staff roles, in decreasing order of privilege
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StaffRole {
    Admin,
    CompanyOwner,
    Assistant,
}

/// Staff member who serves tickets at a desk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: Uuid,
    /// None for company-less admins
    pub company_id: Option<Uuid>,
    pub name: String,
    pub role: StaffRole,
    /// Skill tags used for ticket eligibility matching
    pub skills: HashSet<String>,
}

/// A service counter belonging to one company
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Desk {
    pub id: Uuid,
    pub company_id: Uuid,
    /// Display label, e.g. "3" or "caja 2"
    pub label: String,
    /// Assistant currently occupying the desk
    pub assistant_id: Option<Uuid>,
    /// Availability window start; None = always available
    pub available_from: Option<DateTime<Utc>>,
    /// Availability window end; None = always available
    pub available_to: Option<DateTime<Utc>>,
    /// Ticket currently served at this desk
    pub current_ticket: Option<Uuid>,
}

impl Desk {
    pub fn new(company_id: Uuid, label: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id,
            label: label.into(),
            assistant_id: None,
            available_from: None,
            available_to: None,
            current_ticket: None,
        }
    }

    /// Whether the advisory availability window contains `now`.
    /// A missing bound is open on that side.
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.available_from.is_none_or(|from| now >= from)
            && self.available_to.is_none_or(|to| now <= to)
    }
}

/// Ticket lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    Waiting,
    Called,
    InProgress,
    Done,
    Cancelled,
}

impl TicketStatus {
    /// Done and Cancelled are terminal
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Cancelled)
    }

    /// Legal transitions follow Waiting → Called → InProgress → Done with
    /// Cancelled reachable from Waiting or Called. Called → Done is legal:
    /// a desk may finish service even when the holder never signalled they
    /// were on their way.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::Called)
                | (Self::Called, Self::InProgress)
                | (Self::Called | Self::InProgress, Self::Done)
                | (Self::Waiting | Self::Called, Self::Cancelled)
        )
    }
}

/// A numbered request for service drawn by a public client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: Uuid,
    pub company_id: Uuid,
    /// Per-company monotonic display number
    pub number: u32,
    /// Anonymous public session that drew the ticket
    pub session_id: Uuid,
    pub status: TicketStatus,
    /// Desk currently serving the ticket, while Called/InProgress
    pub desk_id: Option<Uuid>,
    /// Optional skill the serving assistant must have
    pub required_skill: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Timestamp of the latest state transition
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        company_id: Uuid,
        number: u32,
        session_id: Uuid,
        required_skill: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            company_id,
            number,
            session_id,
            status: TicketStatus::Waiting,
            desk_id: None,
            required_skill,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One rating attached to one finished ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub ticket_id: Uuid,
    pub value: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_legal_transitions() {
        use TicketStatus::*;
        assert!(Waiting.can_transition_to(Called));
        assert!(Called.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Done));
        assert!(Called.can_transition_to(Done));
        assert!(Waiting.can_transition_to(Cancelled));
        assert!(Called.can_transition_to(Cancelled));
    }

    #[test]
    fn test_illegal_transitions() {
        use TicketStatus::*;
        assert!(!Waiting.can_transition_to(InProgress));
        assert!(!Waiting.can_transition_to(Done));
        assert!(!InProgress.can_transition_to(Cancelled));
        assert!(!Done.can_transition_to(Waiting));
        assert!(!Cancelled.can_transition_to(Called));
        assert!(!Called.can_transition_to(Called));
    }

    #[test]
    fn test_terminal_states() {
        assert!(TicketStatus::Done.is_terminal());
        assert!(TicketStatus::Cancelled.is_terminal());
        assert!(!TicketStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_desk_window() {
        let now = Utc::now();
        let mut desk = Desk::new(Uuid::new_v4(), "1");
        assert!(desk.is_within_window(now));

        desk.available_from = Some(now - Duration::hours(1));
        desk.available_to = Some(now + Duration::hours(1));
        assert!(desk.is_within_window(now));

        desk.available_to = Some(now - Duration::minutes(5));
        assert!(!desk.is_within_window(now));

        desk.available_from = Some(now + Duration::minutes(5));
        desk.available_to = None;
        assert!(!desk.is_within_window(now));
    }

    #[test]
    fn test_ticket_status_wire_names() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
    }
}
