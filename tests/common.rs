// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides coordinator, company, and seated desk seeding helpers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
#![allow(dead_code, clippy::missing_panics_doc, clippy::must_use_candidate)]
//! Shared test utilities for `turnos_server`
//!
//! This module provides common test setup functions to reduce duplication
//! across integration tests.

use std::collections::HashSet;
use std::sync::{Arc, Once};
use turnos_server::{
    coordinator::{CoordinatorSettings, QueueCoordinator},
    events::RecordingPublisher,
    models::{Assistant, Company, Desk, StaffRole},
    store::NullArchive,
};
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Coordinator wired to a recording publisher and the null archive
pub fn test_coordinator() -> (Arc<QueueCoordinator>, Arc<RecordingPublisher>) {
    test_coordinator_with(CoordinatorSettings::default())
}

pub fn test_coordinator_with(
    settings: CoordinatorSettings,
) -> (Arc<QueueCoordinator>, Arc<RecordingPublisher>) {
    init_test_logging();
    let publisher = Arc::new(RecordingPublisher::new());
    let coordinator = Arc::new(QueueCoordinator::new(
        publisher.clone(),
        Arc::new(NullArchive),
        settings,
    ));
    (coordinator, publisher)
}

/// Register a company and return its id
pub fn seed_company(coordinator: &QueueCoordinator, name: &str) -> Uuid {
    let company = Company::new(name);
    let company_id = company.id;
    coordinator.register_company(company);
    company_id
}

/// Register a desk with an assistant seated at it. Returns (desk, assistant).
pub async fn seed_seated_desk(
    coordinator: &QueueCoordinator,
    company_id: Uuid,
    skills: &[&str],
) -> (Uuid, Uuid) {
    let desk = Desk::new(company_id, "1");
    let desk_id = desk.id;
    coordinator.register_desk(company_id, desk).await.unwrap();

    let assistant = Assistant {
        id: Uuid::new_v4(),
        company_id: Some(company_id),
        name: "ana".into(),
        role: StaffRole::Assistant,
        skills: skills.iter().map(|s| (*s).to_string()).collect::<HashSet<_>>(),
    };
    let assistant_id = assistant.id;
    coordinator
        .upsert_assistant(company_id, assistant)
        .await
        .unwrap();
    coordinator.take_desk(desk_id, assistant_id).await.unwrap();
    (desk_id, assistant_id)
}

/// Register a desk without anyone seated
pub async fn seed_empty_desk(coordinator: &QueueCoordinator, company_id: Uuid) -> Uuid {
    let desk = Desk::new(company_id, "2");
    let desk_id = desk.id;
    coordinator.register_desk(company_id, desk).await.unwrap();
    desk_id
}
