//! Coordinator configuration.
//!
//! Values can come from JSON or from `LOCK_ORDER_*` environment variables
//! (a `.env` file is loaded first when present). Anything unset keeps its
//! default.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::coordinator::AcquirePolicy;
use crate::core::error::ConfigError;
use crate::core::lock::MAX_LOCK_TIMEOUT;

/// Prefix of every environment variable read by [`CoordinatorConfig::from_env`].
pub const ENV_PREFIX: &str = "LOCK_ORDER_";

/// Timeout, retry and backoff configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Bounded wait per lock, in milliseconds.
    pub lock_timeout_ms: u64,
    /// Total attempts before giving up.
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    pub backoff_base_ms: u64,
    /// Growth factor between successive delays.
    pub backoff_multiplier: f64,
    /// Optional cap on a single delay, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backoff_ms: Option<u64>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: 5_000,
            max_attempts: 3,
            backoff_base_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_ms: None,
        }
    }
}

impl CoordinatorConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.lock_timeout_ms == 0 {
            return Err("lock_timeout_ms must be greater than 0".into());
        }
        if u128::from(self.lock_timeout_ms) > MAX_LOCK_TIMEOUT.as_millis() {
            return Err(format!(
                "lock_timeout_ms must not exceed {}",
                MAX_LOCK_TIMEOUT.as_millis()
            ));
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be greater than 0".into());
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err("backoff_multiplier must be a finite number >= 1.0".into());
        }
        if self.max_backoff_ms.is_some_and(|cap| cap < self.backoff_base_ms) {
            return Err("max_backoff_ms must not be below backoff_base_ms".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load `.env` if present, then read `LOCK_ORDER_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source, keyed by full variable name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = parse_var(&lookup, "LOCK_TIMEOUT_MS")? {
            cfg.lock_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "MAX_ATTEMPTS")? {
            cfg.max_attempts = v;
        }
        if let Some(v) = parse_var(&lookup, "BACKOFF_BASE_MS")? {
            cfg.backoff_base_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "BACKOFF_MULTIPLIER")? {
            cfg.backoff_multiplier = v;
        }
        if let Some(v) = parse_var(&lookup, "MAX_BACKOFF_MS")? {
            cfg.max_backoff_ms = Some(v);
        }
        cfg.validate().map_err(ConfigError::Invalid)?;
        Ok(cfg)
    }

    /// Runtime policy for these values.
    pub fn to_policy(&self) -> AcquirePolicy {
        AcquirePolicy {
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            max_attempts: self.max_attempts,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_multiplier: self.backoff_multiplier,
            max_backoff: self.max_backoff_ms.map(Duration::from_millis),
        }
    }
}

fn parse_var<T, F>(lookup: &F, suffix: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let name = format!("{ENV_PREFIX}{suffix}");
    match lookup(&name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Env {
                name,
                reason: e.to_string(),
            }),
    }
}
