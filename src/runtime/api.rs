//! API-facing request/response models for a request layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{ActionId, ActionSnapshot, MaintenanceScheduler, SchedulerStats};

/// Action submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionSubmission {
    /// Description properties; must include `name`.
    pub properties: BTreeMap<String, String>,
    /// Run on the handling thread instead of queueing.
    #[serde(default)]
    pub execute_now: bool,
}

/// Immediate accept/reject answer to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    /// Whether the action was accepted (and, if synchronous, succeeded).
    pub accepted: bool,
    /// Id assigned to the accepted action.
    pub action_id: Option<ActionId>,
    /// Rejection or failure reason.
    pub error: Option<String>,
}

/// Action status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionStatusResponse {
    /// Requested id.
    pub action_id: ActionId,
    /// Current status; `None` if unknown or already purged.
    pub action: Option<ActionSnapshot>,
}

/// Submit an action on behalf of a request handler.
pub fn submit_action(scheduler: &MaintenanceScheduler, req: ActionSubmission) -> SubmissionResponse {
    match scheduler.submit_properties(req.properties, req.execute_now) {
        Ok(id) => SubmissionResponse {
            accepted: true,
            action_id: Some(id),
            error: None,
        },
        Err(e) => SubmissionResponse {
            accepted: false,
            action_id: None,
            error: Some(e.to_string()),
        },
    }
}

/// Look up one action by id.
#[must_use]
pub fn action_status(scheduler: &MaintenanceScheduler, action_id: ActionId) -> ActionStatusResponse {
    ActionStatusResponse {
        action_id,
        action: scheduler.find_action_by_id(action_id).map(|a| a.snapshot()),
    }
}

/// Scheduler statistics payload.
#[must_use]
pub fn stats(scheduler: &MaintenanceScheduler) -> SchedulerStats {
    scheduler.stats()
}
