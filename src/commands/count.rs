use anyhow::Result;
use updatekit::backend::runner::ProcessRunner;

use crate::Context;

/// Print the total number of pending updates as a single integer.
///
/// Each query is bounded by `count_timeout_secs`; a backend that times out
/// or fails contributes nothing.
pub fn run(ctx: &Context) -> Result<i32> {
    let runner = ProcessRunner::with_timeout(ctx.config.count_timeout());
    let orchestrator = super::orchestrator(ctx, runner)?;
    println!("{}", orchestrator.pending_total());
    Ok(0)
}
