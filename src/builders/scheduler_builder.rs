//! Builder that turns validated configuration into a scheduler.

use std::time::Duration;

use crate::config::MaintenanceConfig;
use crate::core::{ActionFactory, MaintenanceError, MaintenanceScheduler, SchedulerLimits};

/// Convert validated configuration into runtime limits.
///
/// # Errors
///
/// `MaintenanceError::InvalidConfig` if validation fails.
pub fn limits_from_config(cfg: &MaintenanceConfig) -> Result<SchedulerLimits, MaintenanceError> {
    cfg.validate().map_err(MaintenanceError::InvalidConfig)?;
    Ok(SchedulerLimits {
        worker_count: cfg.maintenance_threads_max,
        block: Duration::from_secs(cfg.actions_block_seconds),
        linger: Duration::from_secs(cfg.actions_linger_seconds),
        wake_interval: Duration::from_millis(cfg.wake_interval_ms),
        thread_stack_size: cfg.thread_stack_size,
    })
}

/// Build a scheduler (not yet started) from configuration and a kind factory.
///
/// # Errors
///
/// `MaintenanceError::InvalidConfig` if validation fails.
pub fn build_scheduler(
    cfg: &MaintenanceConfig,
    factory: ActionFactory,
) -> Result<MaintenanceScheduler, MaintenanceError> {
    let limits = limits_from_config(cfg)?;
    tracing::debug!(
        worker_count = limits.worker_count,
        kinds = ?factory.kinds(),
        "building maintenance scheduler"
    );
    Ok(MaintenanceScheduler::new(limits, factory))
}
