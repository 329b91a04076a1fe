//! Tests for audit sink

use maintenance_scheduler::core::{
    build_audit_event, ActionDescription, ActionState, AuditKind, AuditSink, InMemoryAuditSink,
    MaintenanceAction, NoopAction,
};

fn make_action(id: u64) -> MaintenanceAction {
    let desc = ActionDescription::from_pairs([("name", "noop"), ("shard", "s1")]).unwrap();
    MaintenanceAction::new(id, desc, Box::new(NoopAction::default()))
}

#[test]
fn test_build_audit_event() {
    let action = make_action(7);
    action.set_state(ActionState::Executing);
    action.fail("boom");

    let event = build_audit_event(&action, AuditKind::Failed, action.error());
    assert_eq!(event.action_id, Some(7));
    assert_eq!(event.hash, action.hash());
    assert_eq!(event.name, "noop");
    assert_eq!(event.kind, AuditKind::Failed);
    assert_eq!(event.detail.as_deref(), Some("boom"));
    assert!(event.created_at_ms > 0);
    assert!(!event.event_id.is_empty());
}

#[test]
fn test_event_ids_are_unique() {
    let action = make_action(1);
    let a = build_audit_event(&action, AuditKind::Submitted, None);
    let b = build_audit_event(&action, AuditKind::Submitted, None);
    assert_ne!(a.event_id, b.event_id);
}

#[test]
fn test_audit_sink_overflow() {
    let action = make_action(1);
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(&action, AuditKind::Submitted, None));
    sink.record(build_audit_event(&action, AuditKind::Claimed, None));
    sink.record(build_audit_event(&action, AuditKind::Completed, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, AuditKind::Claimed); // First one popped
    assert_eq!(events[1].kind, AuditKind::Completed);
}

#[test]
fn test_audit_kind_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&AuditKind::Purged).unwrap(), "\"purged\"");
    assert_eq!(AuditKind::Rejected.to_string(), "rejected");
}
