// One-shot actions
pub mod apply;
pub mod count;
pub mod demo;
pub mod status;

use anyhow::Result;
use std::sync::Arc;
use updatekit::backend::default_backends;
use updatekit::backend::runner::ProcessRunner;
use updatekit::{HostState, Journal, LockManager, Orchestrator};

use crate::Context;

/// Build the orchestrator for this host from the loaded config.
pub fn orchestrator(ctx: &Context, runner: ProcessRunner) -> Result<Orchestrator> {
    let config = &ctx.config;
    let disabled = config.disabled_backends()?;

    let backends = default_backends(Arc::new(runner))
        .into_iter()
        .filter(|b| {
            let keep = !disabled.contains(&b.kind());
            if !keep {
                log::debug!("{} disabled in config", b.kind());
            }
            keep
        })
        .collect();

    let host: Arc<dyn HostState> = Arc::new(config.host());
    let lock = LockManager::new(config.lock_path()?, host.clone());
    let journal = Journal::new(config.journal_path()?);

    Ok(Orchestrator::new(backends, lock, host, journal).with_retry(config.retry_config()))
}
