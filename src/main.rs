mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod session;
mod ui;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use cli::{Action, Cli};
use config::Config;
use updatekit::{RiskTier, TierSelector};

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub dry_run: bool,
    pub config: Config,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            // Usage problems exit 1 like any other failure.
            let _ = e.print();
            std::process::exit(1);
        }
    };

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            ui::error(&format!("{e:#}"));
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<i32> {
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        dry_run: cli.dry_run,
        config: Config::load(cli.config.as_deref())?,
    };
    log::debug!("Starting with verbosity {}", ctx.verbose);

    match cli.action {
        None => session::run(&ctx),
        Some(Action::Check) => commands::status::run(&ctx),
        Some(Action::Count) => commands::count::run(&ctx),
        Some(Action::Demo) => commands::demo::run(&ctx),
        Some(Action::Safe) => commands::apply::run(&ctx, RiskTier::Safe.into()),
        Some(Action::High) => commands::apply::run(&ctx, RiskTier::High.into()),
        Some(Action::Critical) => commands::apply::run(&ctx, RiskTier::Critical.into()),
        Some(Action::All) => commands::apply::run(&ctx, TierSelector::All),
    }
}
