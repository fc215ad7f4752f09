// ABOUTME: Main library entry point for the Turnos queueing platform
// ABOUTME: Multi-tenant ticket lifecycle, desk assignment, and real-time event delivery
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

#![deny(unsafe_code)]

//! # Turnos Server
//!
//! A multi-tenant queueing service. Each company registers service desks,
//! its assistants take desks and call waiting clients, and clients draw
//! numbered tickets from anonymous sessions, follow their progress over
//! WebSocket, and score the service afterwards.
//!
//! ## Architecture
//!
//! - **Models**: Companies, desks, assistants, tickets, and scores
//! - **Coordinator**: Per-company serialized queue state and the ticket
//!   state machine
//! - **Events**: Room-based fan-out of queue events to WebSocket clients
//! - **Auth**: JWT staff tokens and anonymous public sessions
//! - **Archive**: Durable storage of finished tickets and score batches

// ── Public API ──────────────────────────────────────────────────────────
// These modules are used by the server binary (src/bin/) and integration
// tests (tests/). They must remain `pub` so external consumers can access them.

/// JWT staff authentication and anonymous session minting
pub mod auth;

/// Environment-driven server configuration
pub mod config;

/// Project-wide constants and environment variable names
pub mod constants;

/// Per-company queue coordination and the ticket state machine
pub mod coordinator;

/// Typed error handling with error codes and `HTTP` status mapping
pub mod errors;

/// Queue events, rooms, and the WebSocket channel manager
pub mod events;

/// Structured logging initialization
pub mod logging;

/// Core domain types
pub mod models;

/// `HTTP` route handlers
pub mod routes;

/// Per-session score batching and flush tracking
pub mod scores;

/// Shared server resources and the axum entry point
pub mod server;

/// Live ticket and desk stores plus the durable archive
pub mod store;

/// WebSocket connection lifecycle and the hello handshake
pub mod websocket;
