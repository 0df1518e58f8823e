//! Backend abstraction over package ecosystems.
//!
//! The [`Backend`] trait defines the capability set the orchestrator relies
//! on: listing pending updates, refreshing metadata, and applying a subset.
//! Concrete adapters drive the native CLI of each ecosystem through a
//! [`CommandRunner`], so tests can substitute a recording runner.

pub mod apt;
pub mod flatpak;
pub mod npm;
pub mod pip;
pub mod runner;
pub mod snap;

use crate::error::{Error, Result};
use crate::types::{BackendKind, PackageRef};
use runner::{CommandOutput, CommandRunner, Invocation};
use std::sync::Arc;

/// Backend trait for one package ecosystem.
pub trait Backend: Send + Sync {
    /// Which ecosystem this backend manages.
    fn kind(&self) -> BackendKind;

    /// Check if the backend's executable is installed.
    fn is_available(&self) -> bool;

    /// List pending updates. Never changes installed state.
    ///
    /// Fails with [`Error::BackendUnavailable`] when the executable is missing.
    fn query(&self) -> Result<Vec<PackageRef>>;

    /// Whether [`Backend::refresh_metadata`] does anything.
    fn has_refresh_step(&self) -> bool {
        false
    }

    /// Refresh the backend's view of the latest available versions.
    ///
    /// Backends without a separate refresh step fold it into `query`.
    fn refresh_metadata(&self) -> Result<()> {
        Ok(())
    }

    /// Install updates for exactly these packages.
    ///
    /// An empty slice succeeds without running anything.
    fn apply(&self, packages: &[PackageRef]) -> Result<()>;

    /// Install every pending update through the backend's own bulk path.
    ///
    /// `pending` is the list the caller just queried. Backends with a native
    /// bulk command ignore it; the rest install exactly that list.
    fn apply_all(&self, pending: &[PackageRef]) -> Result<()> {
        self.apply(pending)
    }
}

/// Create the five real backends in processing order.
pub fn default_backends(runner: Arc<dyn CommandRunner>) -> Vec<Box<dyn Backend>> {
    vec![
        Box::new(apt::AptBackend::new(runner.clone())),
        Box::new(snap::SnapBackend::new(runner.clone())),
        Box::new(flatpak::FlatpakBackend::new(runner.clone())),
        Box::new(npm::NpmBackend::new(runner.clone())),
        Box::new(pip::PipBackend::new(runner)),
    ]
}

/// One native executable driven by a backend.
///
/// Holds the shared plumbing every adapter needs: availability checks, runs
/// with captured output, and turning failures into categorized errors.
#[derive(Clone)]
pub(crate) struct Tool {
    runner: Arc<dyn CommandRunner>,
    program: &'static str,
    kind: BackendKind,
}

impl Tool {
    pub(crate) fn new(runner: Arc<dyn CommandRunner>, program: &'static str, kind: BackendKind) -> Self {
        Self {
            runner,
            program,
            kind,
        }
    }

    pub(crate) fn invocation(&self, args: &[&str]) -> Invocation {
        Invocation::new(self.program, args.iter().copied())
    }

    pub(crate) fn is_available(&self) -> bool {
        self.runner.program_exists(self.program)
    }

    pub(crate) fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(Error::BackendUnavailable { backend: self.kind })
        }
    }

    /// Run and return the output whatever the exit status.
    pub(crate) fn capture(&self, invocation: &Invocation) -> Result<CommandOutput> {
        self.ensure_available()?;
        self.runner.run(invocation)
    }

    /// Run and fail on a non-zero exit.
    pub(crate) fn run_checked(&self, invocation: &Invocation) -> Result<String> {
        let output = self.capture(invocation)?;
        if !output.success {
            return Err(Error::from_command_output(
                &invocation.program,
                &output.stderr_str(),
            ));
        }
        Ok(output.stdout_str())
    }

    /// Run an install step; failures become [`Error::ApplyFailed`].
    pub(crate) fn run_apply(&self, invocation: &Invocation) -> Result<()> {
        log::info!("{}: {}", self.kind, invocation.display());
        self.run_checked(invocation)
            .map(|_| ())
            .map_err(|e| match e {
                Error::BackendUnavailable { .. } => e,
                Error::CommandFailed { message, .. } => Error::ApplyFailed {
                    backend: self.kind,
                    message,
                },
                other => Error::ApplyFailed {
                    backend: self.kind,
                    message: other.to_string(),
                },
            })
    }

    /// Build package refs from raw names, dropping names that fail
    /// normalization.
    pub(crate) fn package_refs<'a, I>(&self, names: I) -> Vec<PackageRef>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .filter_map(|name| {
                let pkg = PackageRef::new(name, self.kind);
                if pkg.is_none() {
                    log::warn!("{}: ignoring malformed package name {:?}", self.kind, name);
                }
                pkg
            })
            .collect()
    }
}

/// Package names as discrete arguments.
pub(crate) fn name_args(packages: &[PackageRef]) -> Vec<String> {
    packages.iter().map(|p| p.name().to_string()).collect()
}
