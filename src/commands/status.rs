use anyhow::Result;
use updatekit::backend::runner::ProcessRunner;
use updatekit::{Orchestrator, StatusReport};

use crate::Context;
use crate::progress;
use crate::ui;

/// Query every backend and render the dashboard.
pub fn show(ctx: &Context, orchestrator: &Orchestrator) -> StatusReport {
    let pb = (!ctx.quiet).then(|| progress::spinner("Checking for updates..."));
    let report = orchestrator.status_report();
    if let Some(pb) = pb {
        progress::finish_clear(&pb);
    }

    ui::status_report(&report);
    if orchestrator.reboot_required() {
        ui::warn("A reboot is pending from an earlier update");
    }
    report
}

pub fn run(ctx: &Context) -> Result<i32> {
    let orchestrator = super::orchestrator(ctx, ProcessRunner::new())?;
    show(ctx, &orchestrator);
    Ok(0)
}
