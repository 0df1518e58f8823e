//! Update orchestration across backends.
//!
//! One [`Orchestrator::apply`] call walks Idle → Locked → Classifying →
//! Applying → Reporting. The session lock is held from the first step until
//! reporting starts and is released by a scoped guard on every exit path.
//! Backend-level failures never escape `apply`; they are folded into the
//! returned [`SessionResult`].

use crate::backend::Backend;
use crate::classify;
use crate::error::{Error, Result};
use crate::host::HostState;
use crate::journal::Journal;
use crate::lock::{LockManager, LockRecord};
use crate::retry::{self, RetryCallback, Sleeper, ThreadSleeper};
use crate::types::{
    BackendFailure, BackendKind, BackendStatus, Operation, RetryConfig, SessionResult,
    StatusReport, TierSelector, UpdatePlan,
};
use std::sync::Arc;
use std::time::Duration;

/// Progress hooks for rendering an apply invocation.
///
/// All methods default to doing nothing.
pub trait ApplyObserver {
    /// A backend is about to be processed.
    fn backend_started(&self, _backend: BackendKind) {}

    /// A backend was skipped because it is not installed.
    fn backend_skipped(&self, _backend: BackendKind) {}

    /// A metadata refresh attempt failed and will be retried.
    fn retrying(&self, _backend: BackendKind, _attempt: u32, _max_attempts: u32, _error: &Error) {}

    /// The packages to install have been selected.
    fn plan_ready(&self, _plan: &UpdatePlan) {}

    /// A backend finished without error.
    fn backend_succeeded(&self, _backend: BackendKind) {}

    /// A backend failed; the session continues with the next one.
    fn backend_failed(&self, _failure: &BackendFailure) {}
}

/// Observer that ignores every event.
pub struct NoObserver;

impl ApplyObserver for NoObserver {}

/// Forwards retry notifications to the log and to an observer.
struct RefreshRetry<'a> {
    backend: BackendKind,
    observer: &'a dyn ApplyObserver,
}

impl RetryCallback for RefreshRetry<'_> {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration) {
        log::warn!(
            "{}: refresh attempt {}/{} failed: {}. Retrying in {}s...",
            self.backend,
            attempt,
            max_attempts,
            error,
            delay.as_secs()
        );
        self.observer
            .retrying(self.backend, attempt, max_attempts, error);
    }
}

/// Coordinates classification, locking, retries and per-backend applies.
pub struct Orchestrator {
    backends: Vec<Box<dyn Backend>>,
    lock: LockManager,
    host: Arc<dyn HostState>,
    journal: Journal,
    retry: RetryConfig,
    sleeper: Box<dyn Sleeper>,
}

impl Orchestrator {
    /// Create an orchestrator. Backends are sorted into processing order.
    pub fn new(
        mut backends: Vec<Box<dyn Backend>>,
        lock: LockManager,
        host: Arc<dyn HostState>,
        journal: Journal,
    ) -> Self {
        backends.sort_by_key(|b| b.kind());
        Self {
            backends,
            lock,
            host,
            journal,
            retry: RetryConfig::default(),
            sleeper: Box::new(ThreadSleeper),
        }
    }

    /// Use a custom retry policy for metadata refreshes.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Use a custom sleep primitive between retries.
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Backends in processing order.
    pub fn backend_kinds(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    /// Current holder of the session lock, if any.
    pub fn lock_holder(&self) -> Result<Option<LockRecord>> {
        self.lock.holder()
    }

    /// Whether the host reports a pending reboot.
    pub fn reboot_required(&self) -> bool {
        self.host.reboot_required()
    }

    // =========================================================================
    // Read-only operations
    // =========================================================================

    /// Pending updates per backend. Takes no lock.
    pub fn status_report(&self) -> StatusReport {
        let mut report = StatusReport::default();
        for backend in &self.backends {
            let kind = backend.kind();
            let status = if !backend.is_available() {
                BackendStatus::Unavailable
            } else {
                match backend.query() {
                    Ok(pending) => BackendStatus::Available {
                        total: pending.len(),
                        counts: classify::tally(&pending),
                    },
                    Err(e) if e.is_skippable() => BackendStatus::Unavailable,
                    Err(e) => {
                        log::warn!("{kind}: query failed: {e}");
                        self.note(&format!("status: {kind} query failed: {e}"));
                        BackendStatus::Failed {
                            message: e.to_string(),
                        }
                    }
                }
            };
            log::debug!("{kind}: {status:?}");
            report.backends.insert(kind, status);
        }
        report
    }

    /// Total pending updates across available backends.
    pub fn pending_total(&self) -> usize {
        self.status_report().pending_total()
    }

    /// Packages `selector` would install on one backend, from a fresh query.
    pub fn plan(&self, kind: BackendKind, selector: TierSelector) -> Result<UpdatePlan> {
        let backend = self
            .backends
            .iter()
            .find(|b| b.kind() == kind)
            .filter(|b| b.is_available())
            .ok_or(Error::BackendUnavailable { backend: kind })?;
        build_plan(backend.as_ref(), selector)
    }

    /// What `apply(selector)` would install right now, per targeted backend.
    pub fn preview(&self, selector: TierSelector) -> Vec<(BackendKind, Result<UpdatePlan>)> {
        self.targets(selector)
            .map(|backend| (backend.kind(), self.plan(backend.kind(), selector)))
            .collect()
    }

    // =========================================================================
    // Apply
    // =========================================================================

    /// Install the updates selected by `selector`.
    ///
    /// Returns an error only when the session lock cannot be taken, in which
    /// case nothing was attempted. Every backend failure is recorded in the
    /// result instead.
    pub fn apply(&self, selector: TierSelector, observer: &dyn ApplyObserver) -> Result<SessionResult> {
        let guard = match self.lock.acquire() {
            Ok(guard) => guard,
            Err(e) => {
                log::warn!("apply {selector}: {e}");
                self.note(&format!("apply {selector}: refused: {e}"));
                return Err(e);
            }
        };
        self.note(&format!(
            "apply {selector}: session started (pid {})",
            guard.record().pid
        ));

        let mut result = SessionResult::default();
        for backend in self.targets(selector) {
            self.apply_backend(backend, selector, observer, &mut result);
        }

        drop(guard);

        result.reboot_required = self.host.reboot_required();
        self.note(&format!(
            "apply {selector}: finished, {} succeeded, {} errors{}",
            result.succeeded.len(),
            result.error_count,
            if result.reboot_required {
                ", reboot required"
            } else {
                ""
            }
        ));
        Ok(result)
    }

    fn apply_backend(
        &self,
        backend: &dyn Backend,
        selector: TierSelector,
        observer: &dyn ApplyObserver,
        result: &mut SessionResult,
    ) {
        let kind = backend.kind();

        if !backend.is_available() {
            log::info!("{kind}: not installed, skipping");
            result.skipped.insert(kind);
            observer.backend_skipped(kind);
            return;
        }

        result.attempted.insert(kind);
        observer.backend_started(kind);

        if backend.has_refresh_step() {
            let callback = RefreshRetry { backend: kind, observer };
            if let Err(e) = retry::with_retry_using(
                &self.retry,
                Some(&callback),
                self.sleeper.as_ref(),
                || backend.refresh_metadata(),
            ) {
                self.record_failure(result, observer, kind, Operation::Refresh, &e);
                return;
            }
        }

        let plan = match build_plan(backend, selector) {
            Ok(plan) => plan,
            Err(e) if e.is_skippable() => {
                result.attempted.remove(&kind);
                result.skipped.insert(kind);
                observer.backend_skipped(kind);
                return;
            }
            Err(e) => {
                self.record_failure(result, observer, kind, Operation::Query, &e);
                return;
            }
        };
        log::info!(
            "{kind}: {} package(s) selected for {selector}{}",
            plan.packages.len(),
            if plan.bulk { " (bulk upgrade)" } else { "" }
        );
        observer.plan_ready(&plan);

        let outcome = if plan.bulk {
            backend.apply_all(&plan.packages)
        } else {
            backend.apply(&plan.packages)
        };

        match outcome {
            Ok(()) => {
                self.note(&format!(
                    "apply {selector}: {kind} updated {} package(s)",
                    plan.packages.len()
                ));
                result.succeeded.insert(kind);
                observer.backend_succeeded(kind);
            }
            Err(e) => self.record_failure(result, observer, kind, Operation::Apply, &e),
        }
    }

    fn record_failure(
        &self,
        result: &mut SessionResult,
        observer: &dyn ApplyObserver,
        backend: BackendKind,
        operation: Operation,
        error: &Error,
    ) {
        log::error!("{backend}: {operation} failed: {error}");
        self.note(&format!("{backend}: {operation} failed: {error}"));
        result.record_failure(backend, operation, error.to_string());
        if let Some(failure) = result.failures.last() {
            observer.backend_failed(failure);
        }
    }

    fn targets(&self, selector: TierSelector) -> impl Iterator<Item = &dyn Backend> + '_ {
        self.backends
            .iter()
            .map(|b| b.as_ref())
            .filter(move |b| selector.targets(b.kind()))
    }

    /// Append to the journal; a failed write is logged, never fatal.
    fn note(&self, message: &str) {
        if let Err(e) = self.journal.append(message) {
            log::warn!("Could not write journal: {e}");
        }
    }
}

/// Build a fresh plan from a new query.
fn build_plan(backend: &dyn Backend, selector: TierSelector) -> Result<UpdatePlan> {
    let pending = backend.query()?;
    let (packages, bulk) = match selector {
        TierSelector::All => (pending, true),
        TierSelector::Tier(_) => (classify::select(&pending, selector), false),
    };
    Ok(UpdatePlan {
        backend: backend.kind(),
        selector,
        packages,
        bulk,
    })
}
