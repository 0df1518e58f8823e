//! # updatekit
//!
//! Risk-aware update orchestration for Linux hosts.
//!
//! This crate provides functionality for:
//! - Querying pending updates from apt, snap, flatpak, npm and pip
//! - Classifying updates into critical, high and safe risk tiers
//! - Applying one tier (or everything) under a host-wide session lock
//! - Retrying metadata refreshes and journaling every session
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use updatekit::backend::{default_backends, runner::ProcessRunner};
//! use updatekit::{HostState, Journal, LinuxHost, LockManager, NoObserver, Orchestrator};
//! use updatekit::{RiskTier, TierSelector};
//!
//! let host: Arc<dyn HostState> = Arc::new(LinuxHost::default());
//! let orchestrator = Orchestrator::new(
//!     default_backends(Arc::new(ProcessRunner::new())),
//!     LockManager::new("/tmp/upkeep.lock", host.clone()),
//!     host,
//!     Journal::new("/tmp/upkeep.log"),
//! );
//!
//! // What is pending, grouped by risk
//! let report = orchestrator.status_report();
//! println!("{} updates pending", report.pending_total());
//!
//! // Install only the safe system updates
//! let result = orchestrator
//!     .apply(TierSelector::from(RiskTier::Safe), &NoObserver)
//!     .expect("session lock held elsewhere");
//! std::process::exit(result.exit_code());
//! ```
//!
//! ## Retry Logic
//!
//! Metadata refreshes are retried with a fixed delay. Configure retry
//! behavior with [`RetryConfig`] and [`Orchestrator::with_retry`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod classify;
pub mod error;
pub mod host;
pub mod journal;
pub mod lock;
pub mod orchestrator;
pub mod retry;
pub mod types;

pub use error::{Error, ErrorCategory, Result};
pub use host::{HostState, LinuxHost};
pub use journal::Journal;
pub use lock::{LockGuard, LockManager, LockRecord};
pub use orchestrator::{ApplyObserver, NoObserver, Orchestrator};
pub use types::{
    BackendFailure, BackendKind, BackendStatus, Operation, PackageRef, RetryConfig, RiskTier,
    SessionResult, StatusReport, TierCounts, TierSelector, UpdatePlan,
};
