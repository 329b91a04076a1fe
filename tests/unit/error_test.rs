//! Tests for error types

use maintenance_scheduler::core::MaintenanceError;

#[test]
fn test_invalid_parameter_error() {
    let err = MaintenanceError::InvalidParameter("missing name".to_string());
    assert_eq!(format!("{}", err), "invalid parameter: missing name");
}

#[test]
fn test_unknown_action_kind_error() {
    let err = MaintenanceError::UnknownActionKind("bubba".to_string());
    assert_eq!(format!("{}", err), "unknown action kind: bubba");
}

#[test]
fn test_execution_failure_error() {
    let err = MaintenanceError::ExecutionFailure("shard gone".to_string());
    assert_eq!(format!("{}", err), "action execution failed: shard gone");
}

#[test]
fn test_internal_error() {
    let err = MaintenanceError::Internal("lost lock".to_string());
    assert_eq!(format!("{}", err), "internal error: lost lock");
}
