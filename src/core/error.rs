//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by the maintenance scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MaintenanceError {
    /// Description is malformed or incomplete (e.g. no `name`).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// An equivalent action is still pending, executing, or inside its block window.
    #[error("duplicate action: {0}")]
    DuplicateAction(String),
    /// The `name` does not resolve to a registered action kind.
    #[error("unknown action kind: {0}")]
    UnknownActionKind(String),
    /// Unexpected fault inside the scheduler itself.
    #[error("internal error: {0}")]
    Internal(String),
    /// The action's own logic failed.
    #[error("action execution failed: {0}")]
    ExecutionFailure(String),
    /// The scheduler no longer accepts queued work.
    #[error("scheduler is shutting down")]
    ShuttingDown,
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result alias for the scheduler's public surface.
pub type MaintenanceResult<T> = Result<T, MaintenanceError>;

/// Application-facing result using anyhow for action bodies and other
/// higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
