//! Python packages installed with pip.

use crate::backend::runner::CommandRunner;
use crate::backend::{Backend, Tool, name_args};
use crate::error::Result;
use crate::types::{BackendKind, PackageRef};
use serde::Deserialize;
use std::sync::Arc;

/// Backend for `pip3`.
///
/// pip has no bulk upgrade command, so `apply_all` installs the queried
/// list it is handed.
pub struct PipBackend {
    pip: Tool,
}

#[derive(Debug, Deserialize)]
struct OutdatedEntry {
    name: String,
}

impl PipBackend {
    /// Create a pip backend using the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            pip: Tool::new(runner, "pip3", BackendKind::PythonGlobal),
        }
    }
}

impl Backend for PipBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::PythonGlobal
    }

    fn is_available(&self) -> bool {
        self.pip.is_available()
    }

    fn query(&self) -> Result<Vec<PackageRef>> {
        let stdout = self.pip.run_checked(&self.pip.invocation(&[
            "list",
            "--outdated",
            "--format=json",
            "--disable-pip-version-check",
        ]))?;
        let entries = parse_outdated(&stdout)?;
        Ok(self
            .pip
            .package_refs(entries.iter().map(|e| e.name.as_str())))
    }

    fn apply(&self, packages: &[PackageRef]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let invocation = self
            .pip
            .invocation(&["install", "--upgrade", "--disable-pip-version-check", "--"])
            .with_args(name_args(packages))
            .streaming();
        self.pip.run_apply(&invocation)
    }
}

fn parse_outdated(stdout: &str) -> Result<Vec<OutdatedEntry>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(stdout)?)
}
