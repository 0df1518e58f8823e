//! System packages through `apt` / `apt-get`.

use crate::backend::runner::CommandRunner;
use crate::backend::{Backend, Tool, name_args};
use crate::error::Result;
use crate::types::{BackendKind, PackageRef};
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

/// Backend for Debian-family system packages.
pub struct AptBackend {
    apt: Tool,
    apt_get: Tool,
}

impl AptBackend {
    /// Create an apt backend using the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            apt: Tool::new(runner.clone(), "apt", BackendKind::System),
            apt_get: Tool::new(runner, "apt-get", BackendKind::System),
        }
    }
}

impl Backend for AptBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::System
    }

    fn is_available(&self) -> bool {
        self.apt.is_available() && self.apt_get.is_available()
    }

    fn query(&self) -> Result<Vec<PackageRef>> {
        self.apt_get.ensure_available()?;
        let stdout = self
            .apt
            .run_checked(&self.apt.invocation(&["list", "--upgradable"]))?;
        Ok(self.apt.package_refs(parse_upgradable(&stdout)))
    }

    fn has_refresh_step(&self) -> bool {
        true
    }

    fn refresh_metadata(&self) -> Result<()> {
        let invocation = self.apt_get.invocation(&["update", "-q"]).elevated();
        self.apt_get.run_checked(&invocation)?;
        Ok(())
    }

    fn apply(&self, packages: &[PackageRef]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let invocation = self
            .apt_get
            .invocation(&["install", "--only-upgrade", "-y"])
            .with_args(name_args(packages))
            .elevated()
            .streaming();
        self.apt_get.run_apply(&invocation)
    }

    fn apply_all(&self, _pending: &[PackageRef]) -> Result<()> {
        let invocation = self
            .apt_get
            .invocation(&["upgrade", "-y"])
            .elevated()
            .streaming();
        self.apt_get.run_apply(&invocation)
    }
}

/// Extract package names from `apt list --upgradable`.
///
/// Lines look like
/// `openssl/jammy-updates 3.0.2-0ubuntu1.15 amd64 [upgradable from: 3.0.2-0ubuntu1.14]`;
/// the `Listing...` banner and warnings are skipped. Multi-arch hosts list a
/// package once per architecture; each name is kept once, in first-seen order.
fn parse_upgradable(stdout: &str) -> Vec<&str> {
    static LINE: OnceLock<Regex> = OnceLock::new();
    let re = LINE.get_or_init(|| {
        Regex::new(r"^([^/\s]+)/\S+\s+\S+\s+\S+\s+\[upgradable from:").expect("valid regex")
    });

    let mut seen = HashSet::new();
    stdout
        .lines()
        .filter_map(|line| re.captures(line.trim()))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| seen.insert(*name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::runner::CommandOutput;
    use crate::backend::testing::ScriptedRunner;
    use crate::error::Error;

    const LISTING: &str = "\
Listing... Done
openssl/jammy-updates,jammy-security 3.0.2-0ubuntu1.15 amd64 [upgradable from: 3.0.2-0ubuntu1.14]
firefox/jammy-updates 1:1snap1-0ubuntu2 amd64 [upgradable from: 1:1snap1-0ubuntu1]
systemd-timesyncd/jammy-updates 249.11-0ubuntu3.12 amd64 [upgradable from: 249.11-0ubuntu3.11]
";

    fn backend(runner: &Arc<ScriptedRunner>) -> AptBackend {
        AptBackend::new(runner.clone())
    }

    #[test]
    fn test_parse_upgradable() {
        assert_eq!(
            parse_upgradable(LISTING),
            vec!["openssl", "firefox", "systemd-timesyncd"]
        );
    }

    #[test]
    fn test_parse_upgradable_lists_multiarch_packages_once() {
        let output = "\
Listing...
libc6/jammy-updates 2.35-0ubuntu3.8 amd64 [upgradable from: 2.35-0ubuntu3.7]
libc6/jammy-updates 2.35-0ubuntu3.8 i386 [upgradable from: 2.35-0ubuntu3.7]
zlib1g/jammy-updates 1:1.2.11.dfsg-2ubuntu9.2 amd64 [upgradable from: 1:1.2.11.dfsg-2ubuntu9]
";
        assert_eq!(parse_upgradable(output), vec!["libc6", "zlib1g"]);
    }

    #[test]
    fn test_parse_upgradable_ignores_noise() {
        let output = "WARNING: apt does not have a stable CLI interface.\n\nListing...\n";
        assert!(parse_upgradable(output).is_empty());
    }

    #[test]
    fn test_query_lists_pending() {
        let runner = Arc::new(ScriptedRunner::new(&["apt", "apt-get"]));
        runner.push(CommandOutput::ok(LISTING));

        let pending = backend(&runner).query().unwrap();
        let names: Vec<_> = pending.iter().map(PackageRef::name).collect();
        assert_eq!(names, vec!["openssl", "firefox", "systemd-timesyncd"]);
        assert!(pending.iter().all(|p| p.backend() == BackendKind::System));

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "apt");
        assert_eq!(calls[0].args, vec!["list", "--upgradable"]);
        assert!(!calls[0].elevated);
    }

    #[test]
    fn test_refresh_is_elevated() {
        let runner = Arc::new(ScriptedRunner::new(&["apt", "apt-get"]));
        backend(&runner).refresh_metadata().unwrap();

        let calls = runner.calls();
        assert_eq!(calls[0].program, "apt-get");
        assert_eq!(calls[0].args, vec!["update", "-q"]);
        assert!(calls[0].elevated);
    }

    #[test]
    fn test_refresh_failure_is_reported() {
        let runner = Arc::new(ScriptedRunner::new(&["apt", "apt-get"]));
        runner.push(CommandOutput::failed("E: Failed to fetch http://archive.ubuntu.com\n"));
        let err = backend(&runner).refresh_metadata().unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));
    }

    #[test]
    fn test_apply_passes_names_as_discrete_arguments() {
        let runner = Arc::new(ScriptedRunner::new(&["apt", "apt-get"]));
        let packages = vec![
            PackageRef::new("openssl", BackendKind::System).unwrap(),
            PackageRef::new("evil;reboot", BackendKind::System).unwrap(),
        ];
        backend(&runner).apply(&packages).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec!["install", "--only-upgrade", "-y", "openssl", "evil;reboot"]
        );
        assert!(calls[0].elevated);
        assert!(calls[0].inherit_output);
    }

    #[test]
    fn test_apply_all_uses_upgrade() {
        let runner = Arc::new(ScriptedRunner::new(&["apt", "apt-get"]));
        backend(&runner).apply_all(&[]).unwrap();
        assert_eq!(runner.calls()[0].args, vec!["upgrade", "-y"]);
    }

    #[test]
    fn test_apply_failure_is_apply_failed() {
        let runner = Arc::new(ScriptedRunner::new(&["apt", "apt-get"]));
        runner.push(CommandOutput::failed(""));
        let packages = vec![PackageRef::new("firefox", BackendKind::System).unwrap()];
        let err = backend(&runner).apply(&packages).unwrap_err();
        assert!(matches!(
            err,
            Error::ApplyFailed {
                backend: BackendKind::System,
                ..
            }
        ));
    }
}
