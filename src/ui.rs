use colored::Colorize;
use updatekit::{
    BackendFailure, BackendKind, BackendStatus, RiskTier, SessionResult, StatusReport, TierCounts,
    UpdatePlan,
};

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

// ============================================================================
// Report Rendering
// ============================================================================

/// Tier name padded for column output, colored by risk.
fn tier_label(tier: RiskTier) -> colored::ColoredString {
    let label = format!("{:<9}", tier.keyword());
    match tier {
        RiskTier::Critical => label.red().bold(),
        RiskTier::High => label.yellow(),
        RiskTier::Safe => label.green(),
    }
}

/// One-line summary of tier counts, e.g. `1 critical, 0 high, 2 safe`.
pub fn format_counts(counts: &TierCounts) -> String {
    RiskTier::ALL
        .iter()
        .map(|tier| format!("{} {}", counts.get(*tier), tier.keyword()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Human-readable line for one backend in the status table.
pub fn describe_status(status: &BackendStatus) -> String {
    match status {
        BackendStatus::Available { total: 0, .. } => "up to date".to_string(),
        BackendStatus::Available { total, counts } if counts.total() == *total => {
            format!("{total} pending ({})", format_counts(counts))
        }
        BackendStatus::Available { total, .. } => format!("{total} pending"),
        BackendStatus::Unavailable => "not installed".to_string(),
        BackendStatus::Failed { message } => format!("query failed: {message}"),
    }
}

/// Render the pending-updates dashboard.
pub fn status_report(report: &StatusReport) {
    header("Pending updates");

    for (kind, status) in &report.backends {
        let line = describe_status(status);
        let line = match status {
            BackendStatus::Available { total: 0, .. } => line.green(),
            BackendStatus::Available { .. } => line.normal(),
            BackendStatus::Unavailable => line.dimmed(),
            BackendStatus::Failed { .. } => line.red(),
        };
        println!("  {:<16} {}", kind.label(), line);
    }

    let totals = report.tier_totals();
    section("By risk (system packages)");
    for tier in RiskTier::ALL {
        println!("  {} {}", tier_label(tier), totals.get(tier));
    }
    let untiered = report.untiered_pending();
    if untiered > 0 {
        dim(&format!("{untiered} more on other backends, installed by 'all'"));
    }
    println!();

    if report.has_pending() {
        info(&format!("{} update(s) pending", report.pending_total()));
    } else {
        success("Everything is up to date");
    }
}

/// Render a dry-run preview.
pub fn plan(kind: BackendKind, plan: &UpdatePlan) {
    if plan.bulk {
        kv(kind.label(), "every pending update (bulk upgrade)");
    } else if plan.is_empty() {
        kv(kind.label(), "nothing to install");
    } else {
        kv(kind.label(), &plan.names().join(" "));
    }
}

/// One-line description of a backend failure.
pub fn describe_failure(failure: &BackendFailure) -> String {
    format!(
        "{}: {} failed: {}",
        failure.backend.label(),
        failure.operation,
        failure.message
    )
}

/// Render the outcome of an apply session.
pub fn session_result(result: &SessionResult) {
    header("Session summary");

    let names = |set: &std::collections::BTreeSet<BackendKind>| {
        set.iter().map(|k| k.name()).collect::<Vec<_>>().join(", ")
    };

    if !result.succeeded.is_empty() {
        kv("Updated", &names(&result.succeeded));
    }
    if !result.skipped.is_empty() {
        kv("Skipped (not installed)", &names(&result.skipped));
    }
    for f in &result.failures {
        error(&describe_failure(f));
    }
    println!();

    if result.is_success() {
        success("All updates applied");
    } else {
        error(&format!(
            "Finished with {} error(s); see the journal for details",
            result.error_count
        ));
    }
    if result.reboot_required {
        warn("A reboot is required to finish applying updates");
    }
}

// ============================================================================
// Tests
// ============================================================================
