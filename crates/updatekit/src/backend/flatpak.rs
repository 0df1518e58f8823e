//! Flatpak applications.

use crate::backend::runner::CommandRunner;
use crate::backend::{Backend, Tool, name_args};
use crate::error::Result;
use crate::types::{BackendKind, PackageRef};
use std::sync::Arc;

/// Backend for Flatpak.
pub struct FlatpakBackend {
    flatpak: Tool,
}

impl FlatpakBackend {
    /// Create a flatpak backend using the given runner.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            flatpak: Tool::new(runner, "flatpak", BackendKind::DesktopSandbox),
        }
    }
}

impl Backend for FlatpakBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DesktopSandbox
    }

    fn is_available(&self) -> bool {
        self.flatpak.is_available()
    }

    fn query(&self) -> Result<Vec<PackageRef>> {
        let stdout = self.flatpak.run_checked(&self.flatpak.invocation(&[
            "remote-ls",
            "--updates",
            "--columns=application",
        ]))?;
        Ok(self.flatpak.package_refs(parse_updates(&stdout)))
    }

    fn has_refresh_step(&self) -> bool {
        true
    }

    fn refresh_metadata(&self) -> Result<()> {
        self.flatpak.run_checked(
            &self
                .flatpak
                .invocation(&["update", "--appstream", "--noninteractive"]),
        )?;
        Ok(())
    }

    fn apply(&self, packages: &[PackageRef]) -> Result<()> {
        if packages.is_empty() {
            return Ok(());
        }
        let invocation = self
            .flatpak
            .invocation(&["update", "-y", "--noninteractive", "--"])
            .with_args(name_args(packages))
            .streaming();
        self.flatpak.run_apply(&invocation)
    }

    fn apply_all(&self, _pending: &[PackageRef]) -> Result<()> {
        let invocation = self
            .flatpak
            .invocation(&["update", "-y", "--noninteractive"])
            .streaming();
        self.flatpak.run_apply(&invocation)
    }
}

/// Application ids from `flatpak remote-ls --updates --columns=application`.
fn parse_updates(stdout: &str) -> Vec<&str> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && *l != "Application ID" && *l != "Application")
        .collect()
}
