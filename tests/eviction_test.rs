// ABOUTME: Integration tests for the stale-ticket eviction sweep
// ABOUTME: Stuck Called/InProgress tickets are reclaimed and expired sessions force-flushed
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

mod common;

use common::{seed_company, seed_seated_desk, test_coordinator_with};
use std::time::Duration;
use turnos_server::coordinator::CoordinatorSettings;
use turnos_server::models::TicketStatus;
use uuid::Uuid;

/// Settings with a zero TTL so anything committed before the sweep counts
/// as stale.
fn instant_ttl() -> CoordinatorSettings {
    CoordinatorSettings {
        stale_ticket_ttl: Duration::from_secs(0),
        ..CoordinatorSettings::default()
    }
}

/// The sweep compares against wall-clock time; give the clock a moment to
/// move past the last transition.
async fn let_clock_advance() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test]
async fn test_stuck_called_ticket_is_cancelled() {
    let (coordinator, _) = test_coordinator_with(instant_ttl());
    let company = seed_company(&coordinator, "banco");
    let (desk, _) = seed_seated_desk(&coordinator, company, &[]).await;

    let ticket = coordinator
        .create_ticket(company, Uuid::new_v4(), None)
        .await
        .unwrap();
    coordinator.assign_next_ticket(desk).await.unwrap();
    let_clock_advance().await;

    assert_eq!(coordinator.evict_stale().await, 1);

    let snapshot = coordinator.get_tickets(company).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].status, TicketStatus::Cancelled);
    assert_eq!(snapshot[0].id, ticket.id);

    // The desk is free for the next client again
    let desks = coordinator.get_desks(company).await.unwrap();
    assert_eq!(desks[0].current_ticket, None);
}

#[tokio::test]
async fn test_stuck_in_progress_ticket_is_force_completed() {
    let (coordinator, _) = test_coordinator_with(instant_ttl());
    let company = seed_company(&coordinator, "banco");
    let (desk, _) = seed_seated_desk(&coordinator, company, &[]).await;
    let session = Uuid::new_v4();

    let ticket = coordinator
        .create_ticket(company, session, None)
        .await
        .unwrap();
    coordinator.assign_next_ticket(desk).await.unwrap();
    coordinator.signal_en_route(ticket.id, session).await.unwrap();
    let_clock_advance().await;

    assert_eq!(coordinator.evict_stale().await, 1);

    // Force-completed; the desk serves again
    let snapshot = coordinator.get_tickets(company).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].status, TicketStatus::Done);
    let desks = coordinator.get_desks(company).await.unwrap();
    assert_eq!(desks[0].current_ticket, None);

    // The next sweep flushes the never-scored session
    let_clock_advance().await;
    assert_eq!(coordinator.evict_stale().await, 1);
    assert!(coordinator.get_tickets(company).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unscored_session_is_force_flushed() {
    let (coordinator, _) = test_coordinator_with(instant_ttl());
    let company = seed_company(&coordinator, "banco");
    let (desk, _) = seed_seated_desk(&coordinator, company, &[]).await;
    let session = Uuid::new_v4();

    let ticket = coordinator
        .create_ticket(company, session, None)
        .await
        .unwrap();
    coordinator.assign_next_ticket(desk).await.unwrap();
    coordinator.complete_ticket(ticket.id, desk).await.unwrap();
    let_clock_advance().await;

    assert_eq!(coordinator.evict_stale().await, 1);
    assert!(coordinator.get_tickets(company).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_fresh_tickets_survive_the_sweep() {
    let (coordinator, _) = test_coordinator_with(CoordinatorSettings::default());
    let company = seed_company(&coordinator, "banco");
    let (desk, _) = seed_seated_desk(&coordinator, company, &[]).await;

    coordinator
        .create_ticket(company, Uuid::new_v4(), None)
        .await
        .unwrap();
    coordinator.assign_next_ticket(desk).await.unwrap();

    // Default TTL is hours; nothing here qualifies
    assert_eq!(coordinator.evict_stale().await, 0);
    let snapshot = coordinator.get_tickets(company).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].status, TicketStatus::Called);
}
