use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "upkeep")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Risk-aware updates for apt, snap, flatpak, npm and pip", long_about = None)]
#[command(after_help = "Run without an action to start an interactive session.")]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: ~/.config/upkeep/config.toml)
    #[arg(long, global = true, env = "UPKEEP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Show what an update action would install without changing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Run one action and exit
    #[arg(value_enum)]
    pub action: Option<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// Show pending updates grouped by risk
    #[value(alias = "status")]
    Check,

    /// Print the number of pending updates
    Count,

    /// Install low-risk system updates
    #[value(alias = "low")]
    Safe,

    /// Install core system component updates
    #[value(alias = "system")]
    High,

    /// Install security-sensitive updates
    #[value(alias = "security")]
    Critical,

    /// Install everything on every backend
    All,

    /// Simulate an update session without touching the system
    #[value(aliases = ["sim", "simulate"])]
    Demo,
}
