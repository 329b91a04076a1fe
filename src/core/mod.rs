//! Core scheduling abstractions: descriptions, actions, registry, workers.

pub mod action;
pub mod audit;
pub mod description;
pub mod error;
pub mod factory;
pub mod registry;
pub mod scheduler;
pub mod worker;

pub use action::{ActionId, ActionSnapshot, ActionState, MaintenanceAction};
pub use audit::{AuditEvent, AuditKind, AuditSink, InMemoryAuditSink, build_audit_event};
pub use description::ActionDescription;
pub use error::{AppResult, MaintenanceError, MaintenanceResult};
pub use factory::{ActionBody, ActionConstructor, ActionFactory, NoopAction};
pub use registry::{ActionRegistry, ScanOutcome};
pub use scheduler::{MaintenanceScheduler, SchedulerLimits, SchedulerStats};
pub use worker::MaintenanceWorker;
