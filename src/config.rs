//! Runtime configuration, read from the environment (and `.env` via dotenvy).

use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    /// Raw SESSION_KEY value; validated when the cookie key is built.
    pub session_key: Option<String>,
    pub db_max_connections: u32,
    pub workflow: WorkflowConfig,
    pub login_max_attempts: usize,
    pub login_window: Duration,
    pub audit_retention_days: i64,
    pub scheduler_interval: Duration,
    pub admin_password: Option<String>,
}

/// Phase duration rules used by the workflow controller.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowConfig {
    pub phase_default_days: i32,
    /// Upper bound on a phase's total duration, extensions included.
    pub phase_max_days: i32,
    pub phase_max_extension_days: i32,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        WorkflowConfig {
            phase_default_days: 14,
            phase_max_days: 365,
            phase_max_extension_days: 90,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    /// `DATABASE_URL` is required; everything else has a default.
    pub fn from_env() -> Result<Self, String> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Ignoring unreadable .env file: {e}");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup (used by tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| "DATABASE_URL must be set".to_string())?;

        let defaults = WorkflowConfig::default();
        let phase_max_days = parse_positive(&lookup, "PHASE_MAX_DAYS", defaults.phase_max_days);
        let mut phase_default_days = parse_positive(&lookup, "PHASE_DEFAULT_DAYS", defaults.phase_default_days);
        if phase_default_days > phase_max_days {
            log::warn!("PHASE_DEFAULT_DAYS exceeds PHASE_MAX_DAYS, capping at {phase_max_days}");
            phase_default_days = phase_max_days;
        }

        Ok(Config {
            database_url,
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            session_key: lookup("SESSION_KEY"),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", 8),
            workflow: WorkflowConfig {
                phase_default_days,
                phase_max_days,
                phase_max_extension_days: parse_positive(
                    &lookup,
                    "PHASE_MAX_EXTENSION_DAYS",
                    defaults.phase_max_extension_days,
                ),
            },
            login_max_attempts: parse_or(&lookup, "LOGIN_MAX_ATTEMPTS", 5),
            login_window: Duration::from_secs(parse_or(&lookup, "LOGIN_WINDOW_SECS", 900)),
            audit_retention_days: parse_or(&lookup, "AUDIT_RETENTION_DAYS", 365),
            scheduler_interval: Duration::from_secs(parse_or(&lookup, "SCHEDULER_INTERVAL_SECS", 300).max(1)),
            admin_password: lookup("ADMIN_PASSWORD").filter(|v| !v.is_empty()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Invalid value for {key} ({raw:?}), using default {default}");
                default
            }
        },
    }
}

fn parse_positive<F>(lookup: &F, key: &str, default: i32) -> i32
where
    F: Fn(&str) -> Option<String>,
{
    let value = parse_or(lookup, key, default);
    if value <= 0 {
        log::warn!("{key} must be positive, using default {default}");
        default
    } else {
        value
    }
}
