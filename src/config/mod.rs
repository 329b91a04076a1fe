//! Configuration models for the scheduler.

pub mod maintenance;

pub use maintenance::MaintenanceConfig;
