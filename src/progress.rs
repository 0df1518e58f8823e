//! Progress indicators for the upkeep CLI.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use updatekit::BackendKind;

const TICK_STRINGS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "];

/// Create a spinner with a message.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(TICK_STRINGS)
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Create a bounded progress bar.
pub fn bar(len: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:>16.bold} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb
}

fn message_only() -> ProgressStyle {
    ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Finish with a success mark.
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.set_style(message_only());
    pb.finish_with_message(format!("{} {}", "✓".green(), msg));
}

/// Finish with a warning mark.
pub fn finish_warn(pb: &ProgressBar, msg: &str) {
    pb.set_style(message_only());
    pb.finish_with_message(format!("{} {}", "⚠".yellow(), msg));
}

/// Finish with an error mark.
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.set_style(message_only());
    pb.finish_with_message(format!("{} {}", "✗".red(), msg));
}

/// Remove the indicator from the terminal.
pub fn finish_clear(pb: &ProgressBar) {
    pb.finish_and_clear();
}

// ============================================================================
// Simulation
// ============================================================================

/// Stages shown for every backend in a simulated session.
pub const DEMO_STAGES: &[&str] = &[
    "refreshing metadata",
    "resolving updates",
    "downloading",
    "installing",
    "verifying",
];

/// Render a simulated update session.
///
/// Touches nothing on the host; every backend just walks through
/// [`DEMO_STAGES`]. Returns the number of stages rendered.
pub fn simulate(step_delay: Duration, visible: bool) -> usize {
    let mut rendered = 0;
    for kind in BackendKind::ALL {
        let pb = bar(DEMO_STAGES.len() as u64, kind.label());
        if !visible {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        for stage in DEMO_STAGES {
            pb.set_message(*stage);
            std::thread::sleep(step_delay);
            pb.inc(1);
            rendered += 1;
        }
        pb.finish_with_message("done");
    }
    rendered
}
