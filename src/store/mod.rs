// ABOUTME: Authoritative live-state stores consulted and mutated only by the coordinator
// ABOUTME: Ticket store, desk registry, and the durable SQLite archive collaborator
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! Live state lives in [`tickets::TicketStore`] and [`desks::DeskRegistry`],
//! both scoped to a single company inside its coordinator aggregate. The
//! [`archive`] module is the external durable store terminal tickets and
//! flushed score batches are handed to.

pub mod archive;
pub mod desks;
pub mod tickets;

pub use archive::{ArchiveStore, NullArchive, SqliteArchive};
pub use desks::DeskRegistry;
pub use tickets::TicketStore;
