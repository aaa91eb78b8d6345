//! Engine configuration.
//!
//! Everything has a default; the environment only overrides. Values are
//! validated up front so a bad deployment fails at startup rather than on
//! the first request.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use labstock_numbering::NumberingScheme;

use crate::retry::RetryPolicy;

pub const ENV_SESSION_TTL_SECS: &str = "LABSTOCK_SESSION_TTL_SECS";
pub const ENV_RETRY_MAX_ATTEMPTS: &str = "LABSTOCK_RETRY_MAX_ATTEMPTS";
pub const ENV_RETRY_BASE_DELAY_MS: &str = "LABSTOCK_RETRY_BASE_DELAY_MS";
pub const ENV_DOC_ORG: &str = "LABSTOCK_DOC_ORG";
pub const ENV_DOC_DOMAIN: &str = "LABSTOCK_DOC_DOMAIN";
pub const ENV_DOC_SEQ_WIDTH: &str = "LABSTOCK_DOC_SEQ_WIDTH";
pub const ENV_BOOTSTRAP_ADMIN_SECRET: &str = "LABSTOCK_BOOTSTRAP_ADMIN_SECRET";
pub const ENV_BIND_ADDR: &str = "LABSTOCK_BIND_ADDR";

/// Used only when no bootstrap secret is configured.
pub const DEV_ADMIN_SECRET: &str = "change-me-admin";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: expected {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

fn invalid(var: &'static str, expected: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        expected,
        value: value.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub session_ttl: chrono::Duration,
    pub retry: RetryPolicy,
    pub numbering: NumberingScheme,
    pub bootstrap_admin_secret: String,
    pub bind_addr: SocketAddr,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_ttl: chrono::Duration::seconds(300),
            retry: RetryPolicy::default(),
            numbering: NumberingScheme::default(),
            bootstrap_admin_secret: DEV_ADMIN_SECRET.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(raw) = get(ENV_SESSION_TTL_SECS) {
            let secs: i64 = raw
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| invalid(ENV_SESSION_TTL_SECS, "a positive number of seconds", &raw))?;
            config.session_ttl = chrono::Duration::seconds(secs);
        }

        let mut attempts = config.retry.max_attempts;
        if let Some(raw) = get(ENV_RETRY_MAX_ATTEMPTS) {
            attempts = raw
                .parse()
                .ok()
                .filter(|n| (1..=100).contains(n))
                .ok_or_else(|| invalid(ENV_RETRY_MAX_ATTEMPTS, "an integer in 1..=100", &raw))?;
        }
        let mut base_delay = config.retry.base_delay;
        if let Some(raw) = get(ENV_RETRY_BASE_DELAY_MS) {
            let ms: u64 = raw
                .parse()
                .ok()
                .filter(|ms| *ms <= 10_000)
                .ok_or_else(|| invalid(ENV_RETRY_BASE_DELAY_MS, "milliseconds in 0..=10000", &raw))?;
            base_delay = Duration::from_millis(ms);
        }
        config.retry = RetryPolicy::exponential(attempts, base_delay);

        let org = get(ENV_DOC_ORG).unwrap_or_else(|| config.numbering.org().to_string());
        let domain = get(ENV_DOC_DOMAIN).unwrap_or_else(|| config.numbering.domain().to_string());
        let mut width = config.numbering.width();
        if let Some(raw) = get(ENV_DOC_SEQ_WIDTH) {
            width = raw
                .parse()
                .ok()
                .ok_or_else(|| invalid(ENV_DOC_SEQ_WIDTH, "an integer in 1..=12", &raw))?;
        }
        config.numbering = NumberingScheme::new(&org, &domain, width).map_err(|_| {
            invalid(
                ENV_DOC_SEQ_WIDTH,
                "segments without '/' and a width in 1..=12",
                &format!("{org}/{domain}/{width}"),
            )
        })?;

        match get(ENV_BOOTSTRAP_ADMIN_SECRET) {
            Some(secret) => {
                if secret.chars().count() < labstock_auth::credentials::MIN_SECRET_LENGTH {
                    return Err(invalid(
                        ENV_BOOTSTRAP_ADMIN_SECRET,
                        "at least 8 characters",
                        "<redacted>",
                    ));
                }
                config.bootstrap_admin_secret = secret;
            }
            None => {
                warn!(
                    var = ENV_BOOTSTRAP_ADMIN_SECRET,
                    "no bootstrap admin secret configured; using the development default"
                );
            }
        }

        if let Some(raw) = get(ENV_BIND_ADDR) {
            config.bind_addr = raw
                .parse()
                .map_err(|_| invalid(ENV_BIND_ADDR, "a socket address like 0.0.0.0:8080", &raw))?;
        }

        Ok(config)
    }
}
