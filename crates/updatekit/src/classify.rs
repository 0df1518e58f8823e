//! Risk classification of pending updates by package name.
//!
//! Rules are evaluated in a fixed priority order and the first match wins:
//! Critical patterns, then High patterns, otherwise Safe. A name matching
//! both a Critical and a High pattern is Critical. Status counts and apply
//! selection both go through [`classify`], so the two can never disagree.

use crate::types::{PackageRef, RiskTier, TierCounts, TierSelector};
use std::collections::BTreeMap;

/// Substrings marking security-relevant packages.
pub const CRITICAL_PATTERNS: &[&str] = &["security", "openssh", "openssl"];

/// Substrings marking core system components.
pub const HIGH_PATTERNS: &[&str] = &["systemd", "kernel", "linux-image", "linux-libc"];

/// Classify a package name into a risk tier.
pub fn classify(name: &str) -> RiskTier {
    let name = name.to_lowercase();
    let matches_any = |patterns: &[&str]| patterns.iter().any(|p| name.contains(p));

    if matches_any(CRITICAL_PATTERNS) {
        RiskTier::Critical
    } else if matches_any(HIGH_PATTERNS) {
        RiskTier::High
    } else {
        RiskTier::Safe
    }
}

/// Classify several names at once.
pub fn classify_batch<'a, I>(names: I) -> BTreeMap<String, RiskTier>
where
    I: IntoIterator<Item = &'a str>,
{
    names
        .into_iter()
        .map(|name| (name.to_string(), classify(name)))
        .collect()
}

/// Count packages per tier.
pub fn tally(packages: &[PackageRef]) -> TierCounts {
    let mut counts = TierCounts::default();
    for pkg in packages {
        counts.add(classify(pkg.name()));
    }
    counts
}

/// Keep only the packages covered by `selector`, preserving order.
pub fn select(packages: &[PackageRef], selector: TierSelector) -> Vec<PackageRef> {
    packages
        .iter()
        .filter(|pkg| selector.includes(classify(pkg.name())))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BackendKind;

    fn refs(names: &[&str]) -> Vec<PackageRef> {
        names
            .iter()
            .map(|n| PackageRef::new(n, BackendKind::System).unwrap())
            .collect()
    }

    #[test]
    fn test_critical_patterns() {
        assert_eq!(classify("openssl"), RiskTier::Critical);
        assert_eq!(classify("libssl-openssl3"), RiskTier::Critical);
        assert_eq!(classify("openssh-server"), RiskTier::Critical);
        assert_eq!(classify("ubuntu-security-status"), RiskTier::Critical);
    }

    #[test]
    fn test_high_patterns() {
        assert_eq!(classify("systemd"), RiskTier::High);
        assert_eq!(classify("linux-image-6.8.0-45-generic"), RiskTier::High);
        assert_eq!(classify("linux-libc-dev"), RiskTier::High);
        assert_eq!(classify("kernelshark"), RiskTier::High);
    }

    #[test]
    fn test_everything_else_is_safe() {
        assert_eq!(classify("firefox"), RiskTier::Safe);
        assert_eq!(classify("linux-firmware"), RiskTier::Safe);
        assert_eq!(classify(""), RiskTier::Safe);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("OpenSSL-Dev"), RiskTier::Critical);
        assert_eq!(classify("SystemD-Timesyncd"), RiskTier::High);
    }

    #[test]
    fn test_critical_wins_over_high() {
        // Matches "systemd" and "security"; priority order decides.
        assert_eq!(classify("systemd-security-hardening"), RiskTier::Critical);
        assert_eq!(classify("kernel-openssl-module"), RiskTier::Critical);
    }

    #[test]
    fn test_batch_matches_single_calls() {
        let names = ["firefox", "openssl-dev", "systemd-lib", "firefox"];
        let batch = classify_batch(names);
        assert_eq!(batch.len(), 3);
        for name in names {
            assert_eq!(batch[name], classify(name));
        }

        let mut reversed = names;
        reversed.reverse();
        assert_eq!(classify_batch(reversed), batch);
    }

    #[test]
    fn test_select_per_tier() {
        let pending = refs(&["openssl-dev", "firefox", "systemd-lib"]);
        let names = |selector: TierSelector| {
            select(&pending, selector)
                .iter()
                .map(|p| p.name().to_string())
                .collect::<Vec<_>>()
        };

        assert_eq!(names(RiskTier::Critical.into()), vec!["openssl-dev"]);
        assert_eq!(names(RiskTier::High.into()), vec!["systemd-lib"]);
        assert_eq!(names(RiskTier::Safe.into()), vec!["firefox"]);
        assert_eq!(names(TierSelector::All).len(), 3);
    }

    #[test]
    fn test_tally_agrees_with_select() {
        let pending = refs(&["openssl-dev", "firefox", "systemd-lib", "vim", "linux-image-generic"]);
        let counts = tally(&pending);
        for tier in RiskTier::ALL {
            assert_eq!(counts.get(tier), select(&pending, tier.into()).len());
        }
        assert_eq!(counts.total(), pending.len());
    }
}
