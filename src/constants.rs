// ABOUTME: Application constants and default configuration values
// ABOUTME: Groups protocol limits, environment variable names, and event identifiers
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! Central place for tunables and names shared across modules.

/// Server identity
pub mod service {
    /// Service name used in structured log output
    pub const SERVICE_NAME: &str = "turnos-server";

    /// Crate version, stamped into startup logs and health responses
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Environment variable names (environment-only configuration)
pub mod env_config {
    /// HTTP/WebSocket bind port
    pub const HTTP_PORT: &str = "TURNOS_HTTP_PORT";

    /// Bind host, defaults to 127.0.0.1
    pub const HTTP_HOST: &str = "TURNOS_HTTP_HOST";

    /// HMAC secret for staff JWTs; generated at startup when unset
    pub const JWT_SECRET: &str = "TURNOS_JWT_SECRET";

    /// SQLite connection string for the durable archive; archive disabled when unset
    pub const ARCHIVE_URL: &str = "TURNOS_ARCHIVE_URL";

    /// Maximum accepted score value (scale is 0..=max)
    pub const MAX_SCORE: &str = "TURNOS_MAX_SCORE";

    /// Seconds before a stuck Called/InProgress ticket is evicted
    pub const STALE_TICKET_TTL_SECS: &str = "TURNOS_STALE_TICKET_TTL_SECS";

    /// Seconds between eviction sweeps (0 disables the sweep task)
    pub const EVICTION_INTERVAL_SECS: &str = "TURNOS_EVICTION_INTERVAL_SECS";

    /// Log level (error, warn, info, debug, trace)
    pub const LOG_LEVEL: &str = "TURNOS_LOG_LEVEL";

    /// Log output format (json, pretty, compact)
    pub const LOG_FORMAT: &str = "TURNOS_LOG_FORMAT";
}

/// Default values applied when the environment leaves a knob unset
pub mod defaults {
    /// Default HTTP port
    pub const HTTP_PORT: u16 = 8081;

    /// Default bind host
    pub const HTTP_HOST: &str = "127.0.0.1";

    /// Score scale upper bound (0..=5, the scale the kiosk UI renders)
    pub const MAX_SCORE: u8 = 5;

    /// Stuck tickets are cancelled after two hours without a transition
    pub const STALE_TICKET_TTL_SECS: u64 = 2 * 60 * 60;

    /// Eviction sweep cadence
    pub const EVICTION_INTERVAL_SECS: u64 = 60;

    /// Staff JWT lifetime
    pub const JWT_EXPIRY_HOURS: i64 = 24;
}

/// Channel and registry capacity limits
pub mod limits {
    /// Outbound messages buffered per WebSocket connection before the
    /// forwarding task applies backpressure by dropping the client
    pub const CONNECTION_SEND_BUFFER: usize = 256;

    /// Upper bound on desk label length accepted from staff input
    pub const MAX_DESK_LABEL_LEN: usize = 64;

    /// Upper bound on skill tag length
    pub const MAX_SKILL_LEN: usize = 48;
}

/// Wire names of the real-time queue events
pub mod events {
    pub const TICKET_CREATED: &str = "ticket-created";
    pub const TICKET_CALLED: &str = "ticket-called";
    pub const DESK_OCCUPIED: &str = "desk-occupied";
    pub const CLIENTE_EN_CAMINO: &str = "cliente-en-camino";
    pub const TICKET_DONE: &str = "ticket-done";
    pub const TICKET_CANCELLED: &str = "ticket-cancelled";
}
