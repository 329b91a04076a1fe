//! # Maintenance Scheduler
//!
//! A deduplicating scheduler for cluster maintenance actions ("create
//! collection", "synchronize shard", ...) backed by a dedicated pool of
//! worker threads.
//!
//! ## Core Problem Solved
//!
//! Cluster reconciliation logic requests the same maintenance work over and
//! over while it converges. The scheduler makes sure that:
//!
//! - **No duplicate work**: a request identical to one that is pending,
//!   executing, or only just finished is rejected, not queued
//! - **No double claim**: each queued action is claimed by exactly one worker
//! - **Bounded memory**: finished actions linger for status queries, then are
//!   purged by the workers' own selection scan
//! - **Synchronous escape hatch**: a caller can run an action on its own
//!   thread while still going through dedup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use maintenance_scheduler::builders::build_scheduler;
//! use maintenance_scheduler::config::MaintenanceConfig;
//! use maintenance_scheduler::core::{ActionDescription, ActionFactory};
//!
//! let factory = ActionFactory::with_builtins()
//!     .with_kind("sync-shard", |d| Ok(Box::new(SyncShard::new(d)?)));
//! let scheduler = build_scheduler(&MaintenanceConfig::from_env()?, factory)?;
//! scheduler.start()?;
//!
//! // Queued: returns as soon as the action is registered.
//! let description = ActionDescription::from_pairs([("name", "sync-shard"), ("shard", "s1")])?;
//! let id = scheduler.submit(description.clone(), false)?;
//!
//! // Same content while the first is in flight: DuplicateAction.
//! assert!(scheduler.submit(description, false).is_err());
//!
//! // Poll for the outcome.
//! let state = scheduler.find_action_by_id(id).map(|a| a.state());
//!
//! scheduler.shutdown();
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: descriptions, actions, registry, workers.
pub mod core;
/// Configuration models for the scheduler.
pub mod config;
/// Builders to construct the scheduler from configuration.
pub mod builders;
/// Runtime adapters and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
