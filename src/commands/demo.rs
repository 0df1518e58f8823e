use anyhow::Result;
use std::time::Duration;

use crate::Context;
use crate::progress;
use crate::ui;

const STEP_DELAY: Duration = Duration::from_millis(250);

/// Simulated session. Never calls a backend.
pub fn run(ctx: &Context) -> Result<i32> {
    ui::header("Simulated update session");
    ui::dim("Nothing on this system is changed.");
    println!();

    progress::simulate(STEP_DELAY, !ctx.quiet);

    println!();
    ui::success("Simulation finished");
    Ok(0)
}
