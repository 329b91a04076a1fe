//! Maintenance actions and their lifecycle state machine.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::{ActionBody, ActionDescription};
use crate::util::clock::now_ms;

/// Process-unique, monotonically increasing action identifier.
pub type ActionId = u64;

/// Lifecycle state of a maintenance action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    /// Constructed, not yet registered.
    Created,
    /// Registered and eligible for claim by a worker.
    Waiting,
    /// Claimed by a worker or running on a submitting thread.
    Executing,
    /// Finished successfully.
    Complete,
    /// Finished with an error.
    Failed,
}

impl ActionState {
    /// `Complete` or `Failed`.
    #[must_use]
    pub const fn is_done(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether the state machine permits `self -> next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Created, Self::Waiting | Self::Executing)
                | (Self::Waiting, Self::Executing)
                | (Self::Executing, Self::Complete | Self::Failed)
        )
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Waiting => "waiting",
            Self::Executing => "executing",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Mutable part of an action, guarded by its own mutex.
#[derive(Debug)]
struct Progress {
    state: ActionState,
    completed_at: Option<Instant>,
    completed_at_ms: Option<u128>,
    error: Option<String>,
}

/// A unit of maintenance work tracked through [`ActionState`].
///
/// Owned by the registry behind an `Arc`; a worker holds a clone only while
/// running it. The action owns its executable body but no thread.
pub struct MaintenanceAction {
    id: ActionId,
    description: ActionDescription,
    created_at: Instant,
    created_at_ms: u128,
    progress: Mutex<Progress>,
    body: Mutex<Box<dyn ActionBody>>,
}

impl MaintenanceAction {
    /// Create an action in state `Created`.
    #[must_use]
    pub fn new(id: ActionId, description: ActionDescription, body: Box<dyn ActionBody>) -> Self {
        Self {
            id,
            description,
            created_at: Instant::now(),
            created_at_ms: now_ms(),
            progress: Mutex::new(Progress {
                state: ActionState::Created,
                completed_at: None,
                completed_at_ms: None,
                error: None,
            }),
            body: Mutex::new(body),
        }
    }

    /// Unique id.
    #[must_use]
    pub const fn id(&self) -> ActionId {
        self.id
    }

    /// Hash of the originating description.
    #[must_use]
    pub const fn hash(&self) -> u64 {
        self.description.hash()
    }

    /// Action kind.
    #[must_use]
    pub fn name(&self) -> &str {
        self.description.name()
    }

    /// Originating description.
    #[must_use]
    pub const fn description(&self) -> &ActionDescription {
        &self.description
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ActionState {
        self.progress.lock().state
    }

    /// Eligible for claim (`Waiting`).
    #[must_use]
    pub fn runnable(&self) -> bool {
        self.state() == ActionState::Waiting
    }

    /// Reached a terminal state.
    #[must_use]
    pub fn done(&self) -> bool {
        self.state().is_done()
    }

    /// Creation instant.
    #[must_use]
    pub const fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Instant the action entered a terminal state.
    #[must_use]
    pub fn completed_at(&self) -> Option<Instant> {
        self.progress.lock().completed_at
    }

    /// Error detail for a `Failed` action.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.progress.lock().error.clone()
    }

    /// True when terminal and finished at least `age` before `now`.
    #[must_use]
    pub fn finished_before(&self, now: Instant, age: Duration) -> bool {
        let progress = self.progress.lock();
        match progress.completed_at {
            Some(at) if progress.state.is_done() => now.saturating_duration_since(at) >= age,
            _ => false,
        }
    }

    /// Transition to `next`.
    ///
    /// # Panics
    ///
    /// Panics on a transition the state machine forbids (e.g. leaving a
    /// terminal state). Such a transition means the scheduler itself is broken.
    pub fn set_state(&self, next: ActionState) {
        self.transition(next, None);
    }

    /// Enter `Failed`, recording `error`.
    ///
    /// # Panics
    ///
    /// Panics unless the action is `Executing`.
    pub fn fail(&self, error: impl Into<String>) {
        self.transition(ActionState::Failed, Some(error.into()));
    }

    fn transition(&self, next: ActionState, error: Option<String>) {
        let mut progress = self.progress.lock();
        assert!(
            progress.state.can_transition_to(next),
            "illegal maintenance action transition {} -> {} for action {}",
            progress.state,
            next,
            self.id
        );
        progress.state = next;
        if next.is_done() {
            progress.completed_at = Some(Instant::now());
            progress.completed_at_ms = Some(now_ms());
            progress.error = error;
        }
    }

    /// Run the body against this action's description. Caller must hold the
    /// action in `Executing`.
    pub(crate) fn execute_body(&self) -> anyhow::Result<()> {
        let mut body = self.body.lock();
        body.execute(&self.description)
    }

    /// Point-in-time view suitable for status queries.
    #[must_use]
    pub fn snapshot(&self) -> ActionSnapshot {
        let progress = self.progress.lock();
        ActionSnapshot {
            id: self.id,
            hash: self.hash(),
            name: self.name().to_string(),
            state: progress.state,
            created_at_ms: self.created_at_ms,
            completed_at_ms: progress.completed_at_ms,
            error: progress.error.clone(),
        }
    }
}

impl fmt::Debug for MaintenanceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let progress = self.progress.lock();
        f.debug_struct("MaintenanceAction")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("state", &progress.state)
            .field("error", &progress.error)
            .finish_non_exhaustive()
    }
}

/// Serializable view of one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSnapshot {
    /// Action id.
    pub id: ActionId,
    /// Description hash.
    pub hash: u64,
    /// Action kind.
    pub name: String,
    /// State at snapshot time.
    pub state: ActionState,
    /// Creation time, ms since epoch.
    pub created_at_ms: u128,
    /// Completion time, ms since epoch.
    pub completed_at_ms: Option<u128>,
    /// Failure detail.
    pub error: Option<String>,
}
