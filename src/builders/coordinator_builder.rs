//! Build a [`LockCoordinator`] from configuration.

use std::sync::Arc;

use anyhow::Context;

use crate::config::CoordinatorConfig;
use crate::core::{AppResult, AuditSink, ConfigError, LockCoordinator};

/// Validate `cfg` and build a coordinator, optionally audited.
pub fn build_coordinator(
    cfg: &CoordinatorConfig,
    audit: Option<Arc<dyn AuditSink>>,
) -> Result<LockCoordinator, ConfigError> {
    cfg.validate().map_err(ConfigError::Invalid)?;

    let coordinator = LockCoordinator::new(cfg.to_policy());
    tracing::info!(
        lock_timeout_ms = cfg.lock_timeout_ms,
        max_attempts = cfg.max_attempts,
        backoff_base_ms = cfg.backoff_base_ms,
        backoff_multiplier = cfg.backoff_multiplier,
        "lock coordinator configured"
    );
    Ok(match audit {
        Some(sink) => coordinator.with_audit(sink),
        None => coordinator,
    })
}

/// Build a coordinator from `LOCK_ORDER_*` environment variables.
pub fn build_from_env() -> AppResult<LockCoordinator> {
    let cfg = CoordinatorConfig::from_env().context("loading lock coordinator configuration")?;
    build_coordinator(&cfg, None).context("building lock coordinator")
}
