//! Snap packages.

use crate::backend::runner::CommandRunner;
use crate::backend::{Backend, Tool, name_args};
use crate::error::{Error, Result};
use crate::types::{BackendKind, PackageRef};
use std::sync::Arc;

/// Backend for snapd.
pub struct SnapBackend {
    snap: Tool,
}

impl SnapBackend {
    /// Create a snap backend using the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            snap: Tool::new(runner, "snap", BackendKind::Sandbox),
        }
    }
}

impl Backend for SnapBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sandbox
    }

    fn is_available(&self) -> bool {
        self.snap.is_available()
    }

    fn query(&self) -> Result<Vec<PackageRef>> {
        let output = self.snap.capture(&self.snap.invocation(&["refresh", "--list"]))?;
        if !output.success {
            return Err(Error::from_command_output("snap", &output.stderr_str()));
        }
        // "All snaps up to date." goes to stderr with a zero exit code.
        let stdout = output.stdout_str();
        Ok(self.snap.package_refs(parse_refresh_list(&stdout)))
    }

    fn apply(&self, packages: &[PackageRef]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let invocation = self
            .snap
            .invocation(&["refresh", "--"])
            .with_args(name_args(packages))
            .elevated()
            .streaming();
        self.snap.run_apply(&invocation)
    }

    fn apply_all(&self, _pending: &[PackageRef]) -> Result<()> {
        let invocation = self.snap.invocation(&["refresh"]).elevated().streaming();
        self.snap.run_apply(&invocation)
    }
}

/// Extract snap names from the `snap refresh --list` table.
fn parse_refresh_list(stdout: &str) -> Vec<&str> {
    let mut lines = stdout.lines().filter(|l| !l.trim().is_empty());
    match lines.next() {
        Some(header) if header.starts_with("Name") => {}
        _ => return Vec::new(),
    }
    lines
        .filter_map(|line| line.split_whitespace().next())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::runner::CommandOutput;
    use crate::backend::testing::ScriptedRunner;

    const TABLE: &str = "\
Name     Version       Rev   Size   Publisher   Notes
firefox  131.0-1       4955  282MB  mozilla**   -
core22   20240904      1621  77MB   canonical**  base
";

    #[test]
    fn test_parse_refresh_list() {
        assert_eq!(parse_refresh_list(TABLE), vec!["firefox", "core22"]);
    }

    #[test]
    fn test_parse_up_to_date() {
        assert!(parse_refresh_list("").is_empty());
        assert!(parse_refresh_list("All snaps up to date.\n").is_empty());
    }

    #[test]
    fn test_query() {
        let runner = Arc::new(ScriptedRunner::new(&["snap"]));
        runner.push(CommandOutput::ok(TABLE));
        let pending = SnapBackend::new(runner.clone()).query().unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(runner.calls()[0].args, vec!["refresh", "--list"]);
    }

    #[test]
    fn test_apply_subset() {
        let runner = Arc::new(ScriptedRunner::new(&["snap"]));
        let packages = vec![PackageRef::new("firefox", BackendKind::Sandbox).unwrap()];
        SnapBackend::new(runner.clone()).apply(&packages).unwrap();

        let call = &runner.calls()[0];
        assert_eq!(call.args, vec!["refresh", "--", "firefox"]);
        assert!(call.elevated);
    }

    #[test]
    fn test_no_refresh_step() {
        let runner = Arc::new(ScriptedRunner::new(&["snap"]));
        let backend = SnapBackend::new(runner.clone());
        assert!(!backend.has_refresh_step());
        backend.refresh_metadata().unwrap();
        assert!(runner.calls().is_empty());
    }
}
