// ABOUTME: Desk registry tracking occupancy, assistant assignment, and availability windows
// ABOUTME: Occupancy is the hard invariant: one ticket per desk, no takeover mid-service
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::errors::{AppError, AppResult};
use crate::models::Desk;
use std::collections::HashMap;
use uuid::Uuid;

/// Desks of a single company. Mutated only through the coordinator.
#[derive(Debug, Default)]
pub struct DeskRegistry {
    desks: HashMap<Uuid, Desk>,
}

impl DeskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, desk: Desk) {
        self.desks.insert(desk.id, desk);
    }

    /// Remove a desk. Rejected while it is serving a ticket.
    pub fn remove(&mut self, desk_id: Uuid) -> AppResult<Desk> {
        let serving = self
            .desks
            .get(&desk_id)
            .ok_or_else(|| AppError::not_found("desk").with_desk_id(desk_id))?
            .current_ticket
            .is_some();
        if serving {
            return Err(AppError::desk_busy(desk_id));
        }
        self.desks
            .remove(&desk_id)
            .ok_or_else(|| AppError::internal("desk disappeared during removal"))
    }

    pub fn get(&self, desk_id: Uuid) -> Option<&Desk> {
        self.desks.get(&desk_id)
    }

    pub fn len(&self) -> usize {
        self.desks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.desks.is_empty()
    }

    /// Record that `desk_id` started serving `ticket_id`
    pub fn mark_busy(&mut self, desk_id: Uuid, ticket_id: Uuid) -> AppResult<()> {
        let desk = self
            .desks
            .get_mut(&desk_id)
            .ok_or_else(|| AppError::not_found("desk").with_desk_id(desk_id))?;
        if desk.current_ticket.is_some() {
            return Err(AppError::desk_busy(desk_id));
        }
        desk.current_ticket = Some(ticket_id);
        Ok(())
    }

    /// Clear the desk's serving reference
    pub fn mark_free(&mut self, desk_id: Uuid) {
        if let Some(desk) = self.desks.get_mut(&desk_id) {
            desk.current_ticket = None;
        }
    }

    /// Seat an assistant at a desk. Rejected mid-service.
    pub fn take(&mut self, desk_id: Uuid, assistant_id: Uuid) -> AppResult<&Desk> {
        let desk = self
            .desks
            .get_mut(&desk_id)
            .ok_or_else(|| AppError::not_found("desk").with_desk_id(desk_id))?;
        if desk.current_ticket.is_some() {
            return Err(AppError::desk_busy(desk_id));
        }
        desk.assistant_id = Some(assistant_id);
        Ok(desk)
    }

    /// Vacate a desk. Rejected mid-service.
    pub fn release(&mut self, desk_id: Uuid) -> AppResult<&Desk> {
        let desk = self
            .desks
            .get_mut(&desk_id)
            .ok_or_else(|| AppError::not_found("desk").with_desk_id(desk_id))?;
        if desk.current_ticket.is_some() {
            return Err(AppError::desk_busy(desk_id));
        }
        desk.assistant_id = None;
        Ok(desk)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Desk> {
        self.desks.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    fn seated_desk(company: Uuid) -> Desk {
        let mut desk = Desk::new(company, "1");
        desk.assistant_id = Some(Uuid::new_v4());
        desk
    }

    #[test]
    fn test_busy_desk_rejects_double_booking() {
        let mut registry = DeskRegistry::new();
        let desk = seated_desk(Uuid::new_v4());
        let desk_id = desk.id;
        registry.insert(desk);

        registry.mark_busy(desk_id, Uuid::new_v4()).unwrap();
        let err = registry.mark_busy(desk_id, Uuid::new_v4()).unwrap_err();
        assert_eq!(err.code, ErrorCode::DeskBusy);

        registry.mark_free(desk_id);
        registry.mark_busy(desk_id, Uuid::new_v4()).unwrap();
    }

    #[test]
    fn test_take_seats_and_release_vacates() {
        let mut registry = DeskRegistry::new();
        let company = Uuid::new_v4();
        let desk = Desk::new(company, "2");
        let desk_id = desk.id;
        registry.insert(desk);

        let assistant = Uuid::new_v4();
        assert_eq!(
            registry.take(desk_id, assistant).unwrap().assistant_id,
            Some(assistant)
        );
        assert_eq!(registry.release(desk_id).unwrap().assistant_id, None);
    }

    #[test]
    fn test_release_mid_service_rejected() {
        let mut registry = DeskRegistry::new();
        let desk = seated_desk(Uuid::new_v4());
        let desk_id = desk.id;
        registry.insert(desk);
        registry.mark_busy(desk_id, Uuid::new_v4()).unwrap();

        assert_eq!(
            registry.release(desk_id).unwrap_err().code,
            ErrorCode::DeskBusy
        );
        assert_eq!(
            registry.remove(desk_id).unwrap_err().code,
            ErrorCode::DeskBusy
        );
    }

    #[test]
    fn test_unknown_desk_not_found() {
        let mut registry = DeskRegistry::new();
        let err = registry.take(Uuid::new_v4(), Uuid::new_v4()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ResourceNotFound);
    }
}
