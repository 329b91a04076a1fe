//! Tests for builder modules

use std::time::Duration;

use maintenance_scheduler::builders::{build_scheduler, limits_from_config};
use maintenance_scheduler::config::MaintenanceConfig;
use maintenance_scheduler::core::{ActionFactory, MaintenanceError};

#[test]
fn test_limits_from_config() {
    let config = MaintenanceConfig {
        maintenance_threads_max: 3,
        actions_block_seconds: 5,
        actions_linger_seconds: 60,
        wake_interval_ms: 250,
        thread_stack_size: 512 * 1024,
    };

    let limits = limits_from_config(&config).unwrap();
    assert_eq!(limits.worker_count, 3);
    assert_eq!(limits.block, Duration::from_secs(5));
    assert_eq!(limits.linger, Duration::from_secs(60));
    assert_eq!(limits.wake_interval, Duration::from_millis(250));
    assert_eq!(limits.thread_stack_size, 512 * 1024);
}

#[test]
fn test_build_scheduler_rejects_invalid_config() {
    let config = MaintenanceConfig {
        maintenance_threads_max: 0,
        ..MaintenanceConfig::default()
    };
    let err = build_scheduler(&config, ActionFactory::with_builtins()).err().unwrap();
    assert!(matches!(err, MaintenanceError::InvalidConfig(_)));
}

#[test]
fn test_build_scheduler_starts_and_stops() {
    let config = MaintenanceConfig {
        maintenance_threads_max: 2,
        wake_interval_ms: 50,
        ..MaintenanceConfig::default()
    };
    let scheduler = build_scheduler(&config, ActionFactory::with_builtins()).unwrap();
    assert_eq!(scheduler.limits().worker_count, 2);
    scheduler.start().unwrap();
    scheduler.shutdown();
    assert!(scheduler.is_shutting_down());
}
