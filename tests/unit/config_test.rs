//! Tests for configuration validation

use maintenance_scheduler::config::MaintenanceConfig;

fn valid() -> MaintenanceConfig {
    MaintenanceConfig {
        maintenance_threads_max: 4,
        actions_block_seconds: 30,
        actions_linger_seconds: 300,
        wake_interval_ms: 1000,
        thread_stack_size: 2 * 1024 * 1024,
    }
}

#[test]
fn test_config_validation() {
    assert!(valid().validate().is_ok());
}

#[test]
fn test_config_invalid_threads() {
    let invalid = MaintenanceConfig {
        maintenance_threads_max: 0,
        ..valid()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_block_must_not_exceed_linger() {
    let invalid = MaintenanceConfig {
        actions_block_seconds: 301,
        ..valid()
    };
    assert!(invalid.validate().is_err());

    let equal = MaintenanceConfig {
        actions_block_seconds: 300,
        ..valid()
    };
    assert!(equal.validate().is_ok());
}

#[test]
fn test_config_invalid_wake_interval_and_stack() {
    let invalid = MaintenanceConfig {
        wake_interval_ms: 0,
        ..valid()
    };
    assert!(invalid.validate().is_err());

    let invalid = MaintenanceConfig {
        thread_stack_size: 1024,
        ..valid()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "maintenance-threads-max": 2,
        "actions-block-seconds": 10,
        "actions-linger-seconds": 60
    }"#;

    let config = MaintenanceConfig::from_json_str(json).unwrap();
    assert_eq!(config.maintenance_threads_max, 2);
    assert_eq!(config.actions_block_seconds, 10);
    assert_eq!(config.actions_linger_seconds, 60);
    assert_eq!(config.wake_interval_ms, 1000);
}

#[test]
fn test_config_from_json_rejects_invalid() {
    let json = r#"{ "actions-block-seconds": 600, "actions-linger-seconds": 60 }"#;
    assert!(MaintenanceConfig::from_json_str(json).is_err());
    assert!(MaintenanceConfig::from_json_str("not json").is_err());
}
