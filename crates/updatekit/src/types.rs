//! Core types for update orchestration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// Package ecosystem managed by one backend.
///
/// The declaration order is the canonical processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Primary OS packages (apt)
    System,
    /// Snap packages
    Sandbox,
    /// Flatpak applications
    DesktopSandbox,
    /// npm global packages
    NodeGlobal,
    /// pip packages
    PythonGlobal,
}

impl BackendKind {
    /// All backends in processing order.
    pub const ALL: [BackendKind; 5] = [
        BackendKind::System,
        BackendKind::Sandbox,
        BackendKind::DesktopSandbox,
        BackendKind::NodeGlobal,
        BackendKind::PythonGlobal,
    ];

    /// Short name of the underlying tool.
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::System => "apt",
            BackendKind::Sandbox => "snap",
            BackendKind::DesktopSandbox => "flatpak",
            BackendKind::NodeGlobal => "npm",
            BackendKind::PythonGlobal => "pip",
        }
    }

    /// Human readable description.
    pub fn label(&self) -> &'static str {
        match self {
            BackendKind::System => "System packages",
            BackendKind::Sandbox => "Snap packages",
            BackendKind::DesktopSandbox => "Flatpak apps",
            BackendKind::NodeGlobal => "npm globals",
            BackendKind::PythonGlobal => "pip packages",
        }
    }

    /// Whether risk-tier selections (as opposed to `All`) apply to this backend.
    pub fn is_tier_scoped(&self) -> bool {
        matches!(self, BackendKind::System)
    }

    /// Parse a backend from its tool name.
    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One pending update reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageRef {
    name: String,
    backend: BackendKind,
}

impl PackageRef {
    /// Create a package reference, normalizing the name.
    ///
    /// Returns `None` when the trimmed name is empty, starts with `-` (it
    /// would be read as an option), or still contains whitespace or control
    /// characters.
    pub fn new(name: &str, backend: BackendKind) -> Option<Self> {
        let name = name.trim();
        if name.is_empty()
            || name.starts_with('-')
            || name.chars().any(|c| c.is_whitespace() || c.is_control())
        {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            backend,
        })
    }

    /// Backend-local package identifier.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Backend that reported this update.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }
}

impl std::fmt::Display for PackageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.backend, self.name)
    }
}

/// Risk category of a pending update. Ordered from most to least risky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// Security-relevant packages
    Critical,
    /// Core system components (kernel, init)
    High,
    /// Everything else
    Safe,
}

impl RiskTier {
    /// All tiers, most risky first.
    pub const ALL: [RiskTier; 3] = [RiskTier::Critical, RiskTier::High, RiskTier::Safe];

    /// Lowercase keyword for this tier.
    pub fn keyword(&self) -> &'static str {
        match self {
            RiskTier::Critical => "critical",
            RiskTier::High => "high",
            RiskTier::Safe => "safe",
        }
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// What an apply invocation should install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierSelector {
    /// Only packages classified into this tier
    Tier(RiskTier),
    /// Every pending update on every backend
    All,
}

impl TierSelector {
    /// Parse a selector keyword, including the accepted aliases.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" | "security" => Some(TierSelector::Tier(RiskTier::Critical)),
            "high" | "system" => Some(TierSelector::Tier(RiskTier::High)),
            "safe" | "low" => Some(TierSelector::Tier(RiskTier::Safe)),
            "all" => Some(TierSelector::All),
            _ => None,
        }
    }

    /// Whether this selector covers a package of the given tier.
    pub fn includes(&self, tier: RiskTier) -> bool {
        match self {
            TierSelector::Tier(t) => *t == tier,
            TierSelector::All => true,
        }
    }

    /// Whether this selector touches the given backend.
    pub fn targets(&self, backend: BackendKind) -> bool {
        match self {
            TierSelector::Tier(_) => backend.is_tier_scoped(),
            TierSelector::All => true,
        }
    }
}

impl From<RiskTier> for TierSelector {
    fn from(tier: RiskTier) -> Self {
        TierSelector::Tier(tier)
    }
}

impl std::fmt::Display for TierSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TierSelector::Tier(tier) => write!(f, "{tier}"),
            TierSelector::All => write!(f, "all"),
        }
    }
}

/// Number of pending updates per tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    /// Critical-tier packages
    pub critical: usize,
    /// High-tier packages
    pub high: usize,
    /// Safe-tier packages
    pub safe: usize,
}

impl TierCounts {
    /// Count one package of the given tier.
    pub fn add(&mut self, tier: RiskTier) {
        match tier {
            RiskTier::Critical => self.critical += 1,
            RiskTier::High => self.high += 1,
            RiskTier::Safe => self.safe += 1,
        }
    }

    /// Count for a single tier.
    pub fn get(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::Critical => self.critical,
            RiskTier::High => self.high,
            RiskTier::Safe => self.safe,
        }
    }

    /// Total number of packages.
    pub fn total(&self) -> usize {
        self.critical + self.high + self.safe
    }
}

/// Packages selected for one backend in one apply invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    /// Backend the plan applies to
    pub backend: BackendKind,
    /// Selector the plan was built for
    pub selector: TierSelector,
    /// Selected packages
    pub packages: Vec<PackageRef>,
    /// Use the backend's own unfiltered upgrade path
    pub bulk: bool,
}

impl UpdatePlan {
    /// Whether applying this plan would do nothing.
    pub fn is_empty(&self) -> bool {
        !self.bulk && self.packages.is_empty()
    }

    /// Package names in plan order.
    pub fn names(&self) -> Vec<&str> {
        self.packages.iter().map(PackageRef::name).collect()
    }
}

/// Outcome of querying one backend for the status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// Backend answered; counts are classified
    Available {
        /// Total pending updates
        total: usize,
        /// Pending updates per tier
        counts: TierCounts,
    },
    /// Executable not installed
    Unavailable,
    /// Backend is installed but the query failed
    Failed {
        /// Error message
        message: String,
    },
}

impl BackendStatus {
    /// Pending updates, zero unless available.
    pub fn pending(&self) -> usize {
        match self {
            BackendStatus::Available { total, .. } => *total,
            _ => 0,
        }
    }
}

/// Pending updates across all backends, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// Status per backend
    pub backends: BTreeMap<BackendKind, BackendStatus>,
}

impl StatusReport {
    /// Sum of pending updates across available backends.
    pub fn pending_total(&self) -> usize {
        self.backends.values().map(BackendStatus::pending).sum()
    }

    /// Whether any backend has something to update.
    pub fn has_pending(&self) -> bool {
        self.pending_total() > 0
    }

    /// Pending updates on backends that only `all` installs.
    pub fn untiered_pending(&self) -> usize {
        self.backends
            .iter()
            .filter(|(kind, _)| !kind.is_tier_scoped())
            .map(|(_, status)| status.pending())
            .sum()
    }

    /// Tier counts summed over the backends a tier selection installs from.
    ///
    /// Other backends are only updated by `all`; see
    /// [`StatusReport::untiered_pending`].
    pub fn tier_totals(&self) -> TierCounts {
        let mut totals = TierCounts::default();
        for (kind, status) in &self.backends {
            if !kind.is_tier_scoped() {
                continue;
            }
            if let BackendStatus::Available { counts, .. } = status {
                totals.critical += counts.critical;
                totals.high += counts.high;
                totals.safe += counts.safe;
            }
        }
        totals
    }
}

/// Operation that failed inside an apply invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Metadata refresh (after retries)
    Refresh,
    /// Listing pending updates
    Query,
    /// Installing updates
    Apply,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Operation::Refresh => "refresh",
            Operation::Query => "query",
            Operation::Apply => "apply",
        };
        write!(f, "{s}")
    }
}

/// One backend failure recorded during an apply invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFailure {
    /// Backend that failed
    pub backend: BackendKind,
    /// Operation that failed
    pub operation: Operation,
    /// Error message
    pub message: String,
}

/// Aggregate outcome of one apply invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionResult {
    /// Backends that were installed and in scope
    pub attempted: BTreeSet<BackendKind>,
    /// Backends that finished without error
    pub succeeded: BTreeSet<BackendKind>,
    /// Backends skipped because they are not installed
    pub skipped: BTreeSet<BackendKind>,
    /// Number of backend-level failures
    pub error_count: usize,
    /// Failures in the order they happened
    pub failures: Vec<BackendFailure>,
    /// Host reports a pending reboot
    pub reboot_required: bool,
}

impl SessionResult {
    /// Record a backend failure.
    pub fn record_failure(&mut self, backend: BackendKind, operation: Operation, message: String) {
        self.error_count += 1;
        self.failures.push(BackendFailure {
            backend,
            operation,
            message,
        });
    }

    /// Whether the session finished without errors.
    pub fn is_success(&self) -> bool {
        self.error_count == 0
    }

    /// Process exit code for this result.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_factor: f64,
    /// Maximum delay between retries
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            backoff_factor: 1.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Create a retry config with a fixed delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            backoff_factor: 1.0,
            max_delay: delay,
        }
    }

    /// Calculate the delay after a failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let capped = delay.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_order() {
        let mut kinds = vec![
            BackendKind::PythonGlobal,
            BackendKind::System,
            BackendKind::NodeGlobal,
            BackendKind::DesktopSandbox,
            BackendKind::Sandbox,
        ];
        kinds.sort();
        assert_eq!(kinds, BackendKind::ALL.to_vec());
    }

    #[test]
    fn test_backend_from_name() {
        assert_eq!(BackendKind::from_name("Flatpak"), Some(BackendKind::DesktopSandbox));
        assert_eq!(BackendKind::from_name(" pip "), Some(BackendKind::PythonGlobal));
        assert_eq!(BackendKind::from_name("brew"), None);
    }

    #[test]
    fn test_package_ref_normalization() {
        let pkg = PackageRef::new("  firefox\n", BackendKind::System).unwrap();
        assert_eq!(pkg.name(), "firefox");
        assert_eq!(pkg.backend(), BackendKind::System);
        assert_eq!(pkg.to_string(), "apt:firefox");

        assert!(PackageRef::new("", BackendKind::System).is_none());
        assert!(PackageRef::new("   ", BackendKind::System).is_none());
        assert!(PackageRef::new("foo bar", BackendKind::System).is_none());
        assert!(PackageRef::new("foo\u{7}bar", BackendKind::System).is_none());
        assert!(PackageRef::new("--allow-unauthenticated", BackendKind::System).is_none());
    }

    #[test]
    fn test_package_ref_keeps_shell_metacharacters_literal() {
        let pkg = PackageRef::new("evil;rm", BackendKind::NodeGlobal).unwrap();
        assert_eq!(pkg.name(), "evil;rm");
    }

    #[test]
    fn test_selector_keywords() {
        assert_eq!(
            TierSelector::from_keyword("security"),
            Some(TierSelector::Tier(RiskTier::Critical))
        );
        assert_eq!(
            TierSelector::from_keyword("SYSTEM"),
            Some(TierSelector::Tier(RiskTier::High))
        );
        assert_eq!(
            TierSelector::from_keyword("low"),
            Some(TierSelector::Tier(RiskTier::Safe))
        );
        assert_eq!(TierSelector::from_keyword("all"), Some(TierSelector::All));
        assert_eq!(TierSelector::from_keyword("everything"), None);
    }

    #[test]
    fn test_selector_targets() {
        let safe = TierSelector::Tier(RiskTier::Safe);
        assert!(safe.targets(BackendKind::System));
        assert!(!safe.targets(BackendKind::Sandbox));
        for kind in BackendKind::ALL {
            assert!(TierSelector::All.targets(kind));
        }
    }

    #[test]
    fn test_tier_counts() {
        let mut counts = TierCounts::default();
        counts.add(RiskTier::Critical);
        counts.add(RiskTier::Safe);
        counts.add(RiskTier::Safe);
        assert_eq!(counts.get(RiskTier::Safe), 2);
        assert_eq!(counts.get(RiskTier::High), 0);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_status_report_totals() {
        let mut report = StatusReport::default();
        report.backends.insert(
            BackendKind::System,
            BackendStatus::Available {
                total: 3,
                counts: TierCounts {
                    critical: 1,
                    high: 1,
                    safe: 1,
                },
            },
        );
        report
            .backends
            .insert(BackendKind::Sandbox, BackendStatus::Unavailable);
        report.backends.insert(
            BackendKind::NodeGlobal,
            BackendStatus::Failed {
                message: "boom".to_string(),
            },
        );
        assert_eq!(report.pending_total(), 3);
        assert!(report.has_pending());
        assert_eq!(report.tier_totals().critical, 1);
        assert_eq!(report.untiered_pending(), 0);
    }

    #[test]
    fn test_tier_totals_skip_backends_tiers_never_install() {
        let mut report = StatusReport::default();
        report.backends.insert(
            BackendKind::System,
            BackendStatus::Available {
                total: 1,
                counts: TierCounts {
                    safe: 1,
                    ..TierCounts::default()
                },
            },
        );
        report.backends.insert(
            BackendKind::Sandbox,
            BackendStatus::Available {
                total: 2,
                counts: TierCounts {
                    safe: 2,
                    ..TierCounts::default()
                },
            },
        );
        assert_eq!(report.tier_totals().safe, 1);
        assert_eq!(report.untiered_pending(), 2);
        assert_eq!(report.pending_total(), 3);
    }

    #[test]
    fn test_session_result_exit_code() {
        let mut result = SessionResult::default();
        assert_eq!(result.exit_code(), 0);
        result.record_failure(BackendKind::System, Operation::Apply, "dpkg error".to_string());
        assert_eq!(result.error_count, 1);
        assert_eq!(result.exit_code(), 1);
        assert_eq!(result.failures[0].operation, Operation::Apply);
    }

    #[test]
    fn test_retry_config_fixed_delay() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
    }

    #[test]
    fn test_retry_config_backoff() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay: Duration::from_secs(10),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(30),
        };
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(10));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(20));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(30));
    }
}
