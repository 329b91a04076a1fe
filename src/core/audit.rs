//! Audit sink for action lifecycle events.
//!
//! The scheduler records one event per lifecycle step when a sink is attached.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::MaintenanceAction;
use crate::util::clock::now_ms;

/// Lifecycle step being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    /// Accepted into the registry.
    Submitted,
    /// Refused at submit time.
    Rejected,
    /// Claimed by a worker or the submitting thread.
    Claimed,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Removed from the registry after lingering.
    Purged,
}

impl fmt::Display for AuditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::Rejected => "rejected",
            Self::Claimed => "claimed",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Purged => "purged",
        };
        f.write_str(s)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related action; `None` for rejections before an id was assigned.
    pub action_id: Option<u64>,
    /// Description hash.
    pub hash: u64,
    /// Action kind.
    pub name: String,
    /// Lifecycle step.
    pub kind: AuditKind,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context (error text, rejection reason).
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events.min(1024)),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Shared sinks let the caller keep a handle for inspection.
impl<S: AuditSink> AuditSink for Arc<Mutex<S>> {
    fn record(&mut self, event: AuditEvent) {
        self.lock().record(event);
    }
}

/// Helper to build an audit event for a registered action.
#[must_use]
pub fn build_audit_event(
    action: &MaintenanceAction,
    kind: AuditKind,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        action_id: Some(action.id()),
        hash: action.hash(),
        name: action.name().to_string(),
        kind,
        created_at_ms: now_ms(),
        detail,
    }
}
