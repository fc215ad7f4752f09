// ABOUTME: HTTP route modules grouped by surface: public tickets, staff desks, companies, health, ws
// ABOUTME: Each module exposes a routes() constructor merged into the application router
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

pub mod companies;
pub mod desks;
pub mod health;
pub mod tickets;
pub mod websocket;
