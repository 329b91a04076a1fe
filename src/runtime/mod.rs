//! Runtime adapters and request/response surface.

pub mod api;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_bridge;

pub use api::{action_status, submit_action, ActionStatusResponse, ActionSubmission, SubmissionResponse};
#[cfg(feature = "tokio-runtime")]
pub use tokio_bridge::TokioBridge;
