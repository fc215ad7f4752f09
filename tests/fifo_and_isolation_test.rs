// ABOUTME: Integration tests for assignment ordering, skill gating, and tenant isolation
// ABOUTME: Covers FIFO draw order, skill-filtered eligibility, desk windows, and snapshots
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

mod common;

use chrono::{Duration, Utc};
use common::{seed_company, seed_seated_desk, test_coordinator};
use turnos_server::models::{Desk, TicketStatus};
use uuid::Uuid;

#[tokio::test]
async fn test_tickets_assigned_in_creation_order() {
    let (coordinator, _) = test_coordinator();
    let company = seed_company(&coordinator, "banco");
    let (desk, _) = seed_seated_desk(&coordinator, company, &[]).await;

    let mut created = Vec::new();
    for _ in 0..3 {
        let ticket = coordinator
            .create_ticket(company, Uuid::new_v4(), None)
            .await
            .unwrap();
        created.push(ticket);
    }
    assert_eq!(
        created.iter().map(|t| t.number).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );

    // The first pull is explicit; every completion auto-refills the desk
    // with the next ticket in creation order
    let called = coordinator.assign_next_ticket(desk).await.unwrap().unwrap();
    assert_eq!(called.id, created[0].id);
    for expected in &created {
        let desks = coordinator.get_desks(company).await.unwrap();
        assert_eq!(desks[0].current_ticket, Some(expected.id));
        coordinator.complete_ticket(expected.id, desk).await.unwrap();
    }

    // Queue drained: the desk is idle and an explicit pull finds nothing
    let desks = coordinator.get_desks(company).await.unwrap();
    assert_eq!(desks[0].current_ticket, None);
    assert!(coordinator.assign_next_ticket(desk).await.unwrap().is_none());
}

#[tokio::test]
async fn test_skill_gating_skips_ineligible_tickets() {
    let (coordinator, _) = test_coordinator();
    let company = seed_company(&coordinator, "banco");
    let (plain_desk, _) = seed_seated_desk(&coordinator, company, &[]).await;

    let visa_ticket = coordinator
        .create_ticket(company, Uuid::new_v4(), Some("visa".into()))
        .await
        .unwrap();
    let plain_ticket = coordinator
        .create_ticket(company, Uuid::new_v4(), None)
        .await
        .unwrap();

    // The unskilled desk passes over the older visa ticket
    let called = coordinator
        .assign_next_ticket(plain_desk)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(called.id, plain_ticket.id);

    // A skilled desk picks the visa ticket up
    let (visa_desk, _) = seed_seated_desk(&coordinator, company, &["visa", "loans"]).await;
    let called = coordinator
        .assign_next_ticket(visa_desk)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(called.id, visa_ticket.id);
}

#[tokio::test]
async fn test_desk_outside_window_takes_no_tickets() {
    let (coordinator, _) = test_coordinator();
    let company = seed_company(&coordinator, "banco");
    let (_, assistant) = seed_seated_desk(&coordinator, company, &[]).await;

    let mut closed = Desk::new(company, "closed");
    closed.available_to = Some(Utc::now() - Duration::hours(1));
    let closed_id = closed.id;
    coordinator.register_desk(company, closed).await.unwrap();
    coordinator.take_desk(closed_id, assistant).await.unwrap();

    coordinator
        .create_ticket(company, Uuid::new_v4(), None)
        .await
        .unwrap();

    // Outside the window: an empty result, not an error
    assert!(coordinator
        .assign_next_ticket(closed_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_assignment_never_crosses_companies() {
    let (coordinator, _) = test_coordinator();
    let company_a = seed_company(&coordinator, "banco");
    let company_b = seed_company(&coordinator, "clinica");
    seed_seated_desk(&coordinator, company_a, &[]).await;
    let (desk_b, _) = seed_seated_desk(&coordinator, company_b, &[]).await;

    let ticket_a = coordinator
        .create_ticket(company_a, Uuid::new_v4(), None)
        .await
        .unwrap();

    // Company B's desk sees nothing to pull
    assert!(coordinator.assign_next_ticket(desk_b).await.unwrap().is_none());

    let tickets_a = coordinator.get_tickets(company_a).await.unwrap();
    assert_eq!(tickets_a.len(), 1);
    assert_eq!(tickets_a[0].id, ticket_a.id);
    assert_eq!(tickets_a[0].status, TicketStatus::Waiting);
    assert!(coordinator.get_tickets(company_b).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_snapshot_reflects_live_state() {
    let (coordinator, _) = test_coordinator();
    let company = seed_company(&coordinator, "banco");
    let (desk, _) = seed_seated_desk(&coordinator, company, &[]).await;

    let first = coordinator
        .create_ticket(company, Uuid::new_v4(), None)
        .await
        .unwrap();
    let second = coordinator
        .create_ticket(company, Uuid::new_v4(), None)
        .await
        .unwrap();
    coordinator.assign_next_ticket(desk).await.unwrap();

    let snapshot = coordinator.get_tickets(company).await.unwrap();
    assert_eq!(snapshot.len(), 2);
    let by_id = |id| snapshot.iter().find(|t| t.id == id).unwrap();
    assert_eq!(by_id(first.id).status, TicketStatus::Called);
    assert_eq!(by_id(first.id).desk_id, Some(desk));
    assert_eq!(by_id(second.id).status, TicketStatus::Waiting);
}
