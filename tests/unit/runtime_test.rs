//! Tests for runtime API models and the tokio bridge

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use maintenance_scheduler::core::{
    ActionDescription, ActionFactory, ActionState, MaintenanceError, MaintenanceScheduler,
    SchedulerLimits,
};
use maintenance_scheduler::runtime::{
    action_status, submit_action, ActionSubmission, TokioBridge,
};

fn limits(worker_count: usize) -> SchedulerLimits {
    SchedulerLimits {
        worker_count,
        block: Duration::ZERO,
        linger: Duration::from_secs(60),
        wake_interval: Duration::from_millis(20),
        thread_stack_size: 256 * 1024,
    }
}

fn submission(pairs: &[(&str, &str)], execute_now: bool) -> ActionSubmission {
    ActionSubmission {
        properties: pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect::<BTreeMap<_, _>>(),
        execute_now,
    }
}

// ============================================================================
// REQUEST/RESPONSE MODELS
// ============================================================================

#[test]
fn test_submit_action_accepts_and_rejects() {
    let scheduler = MaintenanceScheduler::new(limits(0), ActionFactory::with_builtins());

    let ok = submit_action(&scheduler, submission(&[("name", "noop"), ("shard", "s1")], false));
    assert!(ok.accepted);
    assert!(ok.action_id.is_some());
    assert!(ok.error.is_none());

    let dup = submit_action(&scheduler, submission(&[("name", "noop"), ("shard", "s1")], false));
    assert!(!dup.accepted);
    assert!(dup.action_id.is_none());
    assert!(dup.error.unwrap().starts_with("duplicate action"));

    let missing = submit_action(&scheduler, submission(&[("shard", "s2")], false));
    assert!(!missing.accepted);
    assert!(missing.error.unwrap().starts_with("invalid parameter"));
}

#[test]
fn test_submission_deserializes_without_execute_now() {
    let json = r#"{ "properties": { "name": "noop", "collection": "c1" } }"#;
    let req: ActionSubmission = serde_json::from_str(json).unwrap();
    assert!(!req.execute_now);
    assert_eq!(req.properties.get("collection").map(String::as_str), Some("c1"));
}

#[test]
fn test_action_status() {
    let scheduler = MaintenanceScheduler::new(limits(0), ActionFactory::with_builtins());
    let resp = submit_action(&scheduler, submission(&[("name", "noop")], true));
    let id = resp.action_id.unwrap();

    let status = action_status(&scheduler, id);
    assert_eq!(status.action_id, id);
    let snapshot = status.action.unwrap();
    assert_eq!(snapshot.state, ActionState::Complete);
    assert_eq!(snapshot.name, "noop");
    assert!(snapshot.completed_at_ms.is_some());

    let unknown = action_status(&scheduler, id + 1000);
    assert!(unknown.action.is_none());
}

// ============================================================================
// TOKIO BRIDGE
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bridge_submit_and_wait() {
    let scheduler = Arc::new(MaintenanceScheduler::new(limits(2), ActionFactory::with_builtins()));
    scheduler.start().unwrap();
    let bridge = TokioBridge::current(Arc::clone(&scheduler)).unwrap();

    let desc =
        ActionDescription::from_pairs([("name", "noop"), ("sleep-ms", "200")]).unwrap();
    let id = bridge.submit_async(desc.clone(), false).await.unwrap();

    let err = bridge.submit_async(desc, false).await.unwrap_err();
    assert!(matches!(err, MaintenanceError::DuplicateAction(_)));

    let snapshot = bridge
        .wait_for_action(id, Duration::from_millis(10), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(snapshot.state, ActionState::Complete);

    assert!(bridge
        .wait_for_action(id + 1000, Duration::from_millis(10), Duration::from_millis(50))
        .await
        .is_none());

    scheduler.begin_shutdown();
}

#[tokio::test]
async fn test_bridge_execute_now_runs_off_runtime() {
    let scheduler = Arc::new(MaintenanceScheduler::new(limits(0), ActionFactory::with_builtins()));
    let bridge = TokioBridge::current(Arc::clone(&scheduler)).unwrap();

    let desc = ActionDescription::from_pairs([("name", "noop")]).unwrap();
    let id = bridge.submit_async(desc, true).await.unwrap();
    let action = bridge.scheduler().find_action_by_id(id).unwrap();
    assert_eq!(action.state(), ActionState::Complete);
}

#[test]
fn test_bridge_requires_runtime() {
    let scheduler = Arc::new(MaintenanceScheduler::new(limits(0), ActionFactory::with_builtins()));
    assert!(matches!(
        TokioBridge::current(scheduler),
        Err(MaintenanceError::Internal(_))
    ));
}
