//! Bridge for submitting from async code.
//!
//! `submit` may run an action on the calling thread, so async callers go
//! through tokio's blocking pool instead of stalling a runtime worker.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::core::{
    ActionDescription, ActionId, ActionSnapshot, MaintenanceError, MaintenanceResult,
    MaintenanceScheduler,
};

/// Async façade over a shared [`MaintenanceScheduler`].
#[derive(Clone)]
pub struct TokioBridge {
    scheduler: Arc<MaintenanceScheduler>,
    handle: Handle,
}

impl TokioBridge {
    /// Create a bridge that uses `handle` for blocking work.
    #[must_use]
    pub const fn new(scheduler: Arc<MaintenanceScheduler>, handle: Handle) -> Self {
        Self { scheduler, handle }
    }

    /// Create a bridge on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// `MaintenanceError::Internal` outside a tokio runtime.
    pub fn current(scheduler: Arc<MaintenanceScheduler>) -> MaintenanceResult<Self> {
        let handle = Handle::try_current()
            .map_err(|e| MaintenanceError::Internal(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(scheduler, handle))
    }

    /// The wrapped scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &Arc<MaintenanceScheduler> {
        &self.scheduler
    }

    /// [`MaintenanceScheduler::submit`] on the blocking pool.
    ///
    /// # Errors
    ///
    /// As `submit`, plus `Internal` if the blocking task could not be joined.
    pub async fn submit_async(
        &self,
        description: ActionDescription,
        execute_now: bool,
    ) -> MaintenanceResult<ActionId> {
        let scheduler = Arc::clone(&self.scheduler);
        self.handle
            .spawn_blocking(move || scheduler.submit(description, execute_now))
            .await
            .map_err(|e| MaintenanceError::Internal(format!("submit task failed: {e}")))?
    }

    /// Poll action `id` until it is done or `timeout` elapses.
    ///
    /// Returns the last snapshot seen, or `None` if the action is unknown
    /// (never submitted, or already purged).
    pub async fn wait_for_action(
        &self,
        id: ActionId,
        poll: Duration,
        timeout: Duration,
    ) -> Option<ActionSnapshot> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let snapshot = self.scheduler.find_action_by_id(id)?.snapshot();
            if snapshot.state.is_done() || tokio::time::Instant::now() >= deadline {
                return Some(snapshot);
            }
            tokio::time::sleep(poll).await;
        }
    }
}
