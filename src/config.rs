// ABOUTME: Environment-based configuration for deployment-specific settings
// ABOUTME: Parses env vars into a strongly typed ServerConfig with sensible defaults
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

//! Environment-only configuration. Every knob has a default so a bare
//! `turnos-server` invocation starts a usable development instance.

use crate::constants::{defaults, env_config};
use crate::errors::{AppError, AppResult};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Strongly typed log level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Parse from string with fallback
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" => Self::Error,
            "warn" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Info,
        }
    }
}

/// Log output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON for production log shipping
    Json,
    /// Pretty format for development
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl LogFormat {
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

/// Complete server configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP/WebSocket bind port
    pub http_port: u16,
    /// Bind host
    pub http_host: String,
    /// HMAC secret for staff JWTs
    pub jwt_secret: Vec<u8>,
    /// SQLite connection string for the durable archive; None disables archival
    pub archive_url: Option<String>,
    /// Accepted score scale is 0..=max_score
    pub max_score: u8,
    /// Tickets stuck Called/InProgress longer than this are evicted
    pub stale_ticket_ttl: Duration,
    /// Cadence of the background eviction sweep; zero disables it
    pub eviction_interval: Duration,
    /// Log level
    pub log_level: LogLevel,
    /// Log output format
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let http_port = parse_env(env_config::HTTP_PORT, defaults::HTTP_PORT)?;
        let http_host =
            env::var(env_config::HTTP_HOST).unwrap_or_else(|_| defaults::HTTP_HOST.into());

        let jwt_secret = match env::var(env_config::JWT_SECRET) {
            Ok(secret) if !secret.is_empty() => secret.into_bytes(),
            _ => {
                tracing::warn!(
                    "{} not set, generating an ephemeral JWT secret; staff tokens will not survive a restart",
                    env_config::JWT_SECRET
                );
                let mut secret = vec![0_u8; 32];
                rand::thread_rng().fill_bytes(&mut secret);
                secret
            }
        };

        let archive_url = env::var(env_config::ARCHIVE_URL).ok().filter(|s| !s.is_empty());

        let max_score: u8 = parse_env(env_config::MAX_SCORE, defaults::MAX_SCORE)?;
        if max_score == 0 {
            return Err(AppError::config("TURNOS_MAX_SCORE must be at least 1"));
        }

        let stale_ticket_ttl = Duration::from_secs(parse_env(
            env_config::STALE_TICKET_TTL_SECS,
            defaults::STALE_TICKET_TTL_SECS,
        )?);
        let eviction_interval = Duration::from_secs(parse_env(
            env_config::EVICTION_INTERVAL_SECS,
            defaults::EVICTION_INTERVAL_SECS,
        )?);

        let log_level = env::var(env_config::LOG_LEVEL)
            .map(|s| LogLevel::from_str_or_default(&s))
            .unwrap_or_default();
        let log_format = env::var(env_config::LOG_FORMAT)
            .map(|s| LogFormat::from_str_or_default(&s))
            .unwrap_or_default();

        Ok(Self {
            http_port,
            http_host,
            jwt_secret,
            archive_url,
            max_score,
            stale_ticket_ttl,
            eviction_interval,
            log_level,
            log_format,
        })
    }

    /// One-line summary logged at startup
    pub fn summary(&self) -> String {
        format!(
            "bind={}:{} archive={} max_score={} stale_ttl={}s sweep={}s log={:?}/{:?}",
            self.http_host,
            self.http_port,
            self.archive_url.as_deref().unwrap_or("disabled"),
            self.max_score,
            self.stale_ticket_ttl.as_secs(),
            self.eviction_interval.as_secs(),
            self.log_level,
            self.log_format,
        )
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("invalid value for {name}: {raw:?}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str_or_default("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::from_str_or_default("bogus"), LogLevel::Info);
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str_or_default("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_str_or_default(""), LogFormat::Pretty);
    }

    #[test]
    #[serial_test::serial]
    fn test_from_env_overrides() {
        env::set_var(env_config::HTTP_PORT, "9099");
        env::set_var(env_config::MAX_SCORE, "10");
        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.http_port, 9099);
        assert_eq!(config.max_score, 10);
        env::remove_var(env_config::HTTP_PORT);
        env::remove_var(env_config::MAX_SCORE);
    }

    #[test]
    #[serial_test::serial]
    fn test_invalid_env_value_rejected() {
        env::set_var(env_config::HTTP_PORT, "not-a-port");
        assert!(ServerConfig::from_env().is_err());
        env::remove_var(env_config::HTTP_PORT);
    }
}
