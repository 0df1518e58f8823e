use anyhow::Result;
use indicatif::ProgressBar;
use std::cell::RefCell;
use updatekit::backend::runner::ProcessRunner;
use updatekit::{
    ApplyObserver, BackendFailure, BackendKind, Error, Orchestrator, TierSelector, UpdatePlan,
};

use crate::Context;
use crate::progress;
use crate::ui;

/// Renders orchestrator progress in the terminal.
///
/// Refresh and query run under a spinner; the spinner is cleared before
/// installs start because the package manager writes to the terminal.
pub struct UiObserver {
    quiet: bool,
    spinner: RefCell<Option<ProgressBar>>,
}

impl UiObserver {
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            spinner: RefCell::new(None),
        }
    }

    fn start_spinner(&self, msg: &str) {
        if self.quiet {
            return;
        }
        if let Some(old) = self.spinner.replace(Some(progress::spinner(msg))) {
            progress::finish_clear(&old);
        }
    }

    fn clear_spinner(&self) {
        if let Some(pb) = self.spinner.borrow_mut().take() {
            progress::finish_clear(&pb);
        }
    }

    /// Replace the spinner with `msg`, or print it when there is none.
    fn finish(&self, on_spinner: fn(&ProgressBar, &str), fallback: fn(&str), msg: &str) {
        match self.spinner.borrow_mut().take() {
            Some(pb) => on_spinner(&pb, msg),
            None => fallback(msg),
        }
    }
}

impl ApplyObserver for UiObserver {
    fn backend_started(&self, backend: BackendKind) {
        ui::section(backend.label());
        self.start_spinner(&format!("Checking {} for updates...", backend.name()));
    }

    fn backend_skipped(&self, backend: BackendKind) {
        self.clear_spinner();
        ui::dim(&format!("{} not installed, skipping", backend.name()));
    }

    fn retrying(&self, backend: BackendKind, attempt: u32, max_attempts: u32, error: &Error) {
        self.finish(
            progress::finish_warn,
            ui::warn,
            &format!(
                "{}: refresh attempt {attempt}/{max_attempts} failed: {error}",
                backend.name()
            ),
        );
        self.start_spinner("Retrying...");
    }

    fn plan_ready(&self, plan: &UpdatePlan) {
        self.clear_spinner();
        if plan.bulk {
            ui::info("Upgrading every pending package");
        } else if plan.is_empty() {
            ui::dim(&format!("No {} updates", plan.selector));
        } else {
            ui::info(&format!(
                "Installing {} package(s): {}",
                plan.packages.len(),
                plan.names().join(" ")
            ));
        }
    }

    fn backend_succeeded(&self, backend: BackendKind) {
        self.finish(
            progress::finish_success,
            ui::success,
            &format!("{} done", backend.label()),
        );
    }

    fn backend_failed(&self, failure: &BackendFailure) {
        self.finish(progress::finish_error, ui::error, &ui::describe_failure(failure));
    }
}

pub fn run(ctx: &Context, selector: TierSelector) -> Result<i32> {
    let orchestrator = super::orchestrator(ctx, ProcessRunner::new())?;
    execute(ctx, &orchestrator, selector)
}

/// Apply `selector` and render the outcome. Returns the exit code.
///
/// Lock refusals are rendered and reported as exit code 1; any other
/// orchestrator error is returned.
pub fn execute(ctx: &Context, orchestrator: &Orchestrator, selector: TierSelector) -> Result<i32> {
    if ctx.dry_run {
        preview(orchestrator, selector);
        return Ok(0);
    }

    if let TierSelector::Tier(tier) = selector {
        ui::header(&format!("Installing {tier} updates"));
        ui::dim("Risk tiers apply to system packages; use 'all' for every backend.");
    } else {
        ui::header("Installing all updates");
    }

    let observer = UiObserver::new(ctx.quiet);
    match orchestrator.apply(selector, &observer) {
        Ok(result) => {
            ui::session_result(&result);
            Ok(result.exit_code())
        }
        Err(e) if e.is_fatal() => {
            ui::error(&e.to_string());
            ui::dim(e.category().advice());
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

fn preview(orchestrator: &Orchestrator, selector: TierSelector) {
    ui::header(&format!("Dry run: {selector}"));
    for (kind, plan) in orchestrator.preview(selector) {
        match plan {
            Ok(plan) => ui::plan(kind, &plan),
            Err(e) if e.is_skippable() => ui::kv(kind.label(), "not installed"),
            Err(e) => ui::error(&format!("{}: {e}", kind.label())),
        }
    }
    println!();
    ui::dim("Nothing was changed.");
}
