//! Interactive session loop.
//!
//! Shows the pending-updates dashboard, then reads one keyword per line
//! until the user exits. Every keyword maps to exactly one orchestrator call
//! or local action.

use anyhow::{Context as _, Result};
use dialoguer::Input;
use updatekit::backend::runner::ProcessRunner;
use updatekit::TierSelector;

use crate::Context;
use crate::commands;
use crate::ui;

/// One parsed line of session input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Apply(TierSelector),
    Demo,
    Status,
    Help,
    Exit,
    Unknown(String),
}

/// Map a line of input to a command. Matching ignores case and surrounding
/// whitespace; an empty line exits.
pub fn parse_command(input: &str) -> SessionCommand {
    let word = input.trim().to_lowercase();
    if let Some(selector) = TierSelector::from_keyword(&word) {
        return SessionCommand::Apply(selector);
    }
    match word.as_str() {
        "demo" | "sim" | "simulate" => SessionCommand::Demo,
        "status" | "check" => SessionCommand::Status,
        "help" | "?" => SessionCommand::Help,
        "exit" | "quit" | "q" | "" => SessionCommand::Exit,
        _ => SessionCommand::Unknown(input.trim().to_string()),
    }
}

fn print_help() {
    ui::section("Commands");
    ui::kv("safe, low", "install low-risk system updates");
    ui::kv("high, system", "install core system component updates");
    ui::kv("critical, security", "install security-sensitive updates");
    ui::kv("all", "install everything on every backend");
    ui::kv("demo, sim", "simulate an update session");
    ui::kv("status, check", "show pending updates again");
    ui::kv("exit, quit, q", "leave (an empty line works too)");
}

/// Run the interactive loop. Returns the exit code of the worst apply.
pub fn run(ctx: &Context) -> Result<i32> {
    if !console::user_attended() {
        ui::error("Interactive mode needs a terminal");
        ui::dim("Pass an action instead, e.g. 'upkeep check' or 'upkeep safe'.");
        return Ok(1);
    }

    let orchestrator = commands::orchestrator(ctx, ProcessRunner::new())?;
    let report = commands::status::show(ctx, &orchestrator);
    if !report.has_pending() {
        return Ok(0);
    }

    println!();
    ui::dim("Type a tier to install it, 'help' for all commands, or press Enter to leave.");

    let mut exit_code = 0;
    loop {
        let input: String = Input::new()
            .with_prompt("upkeep")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read command")?;

        match parse_command(&input) {
            SessionCommand::Apply(selector) => {
                let code = commands::apply::execute(ctx, &orchestrator, selector)?;
                exit_code = exit_code.max(code);
            }
            SessionCommand::Demo => {
                commands::demo::run(ctx)?;
            }
            SessionCommand::Status => {
                commands::status::show(ctx, &orchestrator);
            }
            SessionCommand::Help => print_help(),
            SessionCommand::Exit => break,
            SessionCommand::Unknown(word) => {
                ui::warn(&format!("Unknown command '{word}'. Type 'help' for a list."));
            }
        }
    }

    log::debug!("Session ended with exit code {exit_code}");
    Ok(exit_code)
}
