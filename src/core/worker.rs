//! Execution harness that runs one claimed action on the current thread.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{ActionState, MaintenanceAction, MaintenanceError, MaintenanceResult};

/// Runs a single action to a terminal state and keeps the outcome.
///
/// Used both by pool threads and by a submitting thread on the synchronous
/// path. `run` never panics: body errors and body panics both end up as
/// `ActionState::Failed` on the action and as an `ExecutionFailure` result.
#[derive(Debug)]
pub struct MaintenanceWorker {
    action: Arc<MaintenanceAction>,
    result: Option<MaintenanceResult<()>>,
}

impl MaintenanceWorker {
    /// Bind a worker to an action that is already `Executing`.
    #[must_use]
    pub const fn new(action: Arc<MaintenanceAction>) -> Self {
        Self {
            action,
            result: None,
        }
    }

    /// The bound action.
    #[must_use]
    pub const fn action(&self) -> &Arc<MaintenanceAction> {
        &self.action
    }

    /// Execute the action body and record the outcome.
    pub fn run(&mut self) {
        if self.result.is_some() {
            return;
        }
        let action = &self.action;
        if action.state() != ActionState::Executing {
            warn!(
                action_id = action.id(),
                state = %action.state(),
                "worker bound to an action that is not executing"
            );
            self.result = Some(Err(MaintenanceError::Internal(format!(
                "action {} is {}, expected executing",
                action.id(),
                action.state()
            ))));
            return;
        }

        debug!(action_id = action.id(), name = action.name(), "running maintenance action");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| action.execute_body()));

        let result = match outcome {
            Ok(Ok(())) => {
                action.set_state(ActionState::Complete);
                Ok(())
            }
            Ok(Err(e)) => {
                let detail = format!("{e:#}");
                action.fail(detail.clone());
                Err(MaintenanceError::ExecutionFailure(detail))
            }
            Err(payload) => {
                let detail = format!("action panicked: {}", panic_message(payload.as_ref()));
                action.fail(detail.clone());
                Err(MaintenanceError::ExecutionFailure(detail))
            }
        };
        self.result = Some(result);
    }

    /// Outcome of `run`; `Internal` if `run` has not been called.
    ///
    /// # Errors
    ///
    /// `ExecutionFailure` carrying the body's error text when the action failed.
    pub fn result(&self) -> MaintenanceResult<()> {
        self.result.clone().unwrap_or_else(|| {
            Err(MaintenanceError::Internal(format!(
                "worker for action {} has not run",
                self.action.id()
            )))
        })
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
