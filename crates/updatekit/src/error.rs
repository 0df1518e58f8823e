//! Error types for update orchestration.
//!
//! Errors are categorized so the orchestrator can decide whether a failure
//! skips a backend, counts against the session, or aborts the whole
//! invocation. Each variant carries enough context to identify the backend
//! and operation that failed.

use crate::types::BackendKind;
use std::path::PathBuf;
use thiserror::Error;

/// Categories of errors, used to decide how a failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Backend executable not installed on this host
    Unavailable,
    /// Network-dependent operation that kept failing
    Transient,
    /// Another process owns the session or package-manager lock
    Lock,
    /// A backend failed while changing installed packages
    Apply,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether the failure only skips the backend without counting as an error.
    pub fn is_skippable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }

    /// Whether the failure aborts the whole invocation before any work.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Lock)
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Unavailable => "Nothing to do - the backend is skipped",
            Self::Transient => "Check your network connection and mirrors, then try again",
            Self::Lock => "Wait for the other update to finish and run again",
            Self::Apply => "Inspect the package manager output above and retry that tier",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while querying, refreshing or applying updates.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend executable is not present on this host
    #[error("{backend} is not available on this host")]
    BackendUnavailable {
        /// Backend whose executable was not found
        backend: BackendKind,
    },

    /// All retry attempts failed
    #[error("gave up after {attempts} attempts: {source}")]
    ExhaustedRetries {
        /// Number of attempts made
        attempts: u32,
        /// Error from the final attempt
        #[source]
        source: Box<Error>,
    },

    /// Another live process holds the session lock
    #[error("another update session is running (pid {pid})")]
    LockHeld {
        /// Process id recorded in the lock file
        pid: u32,
    },

    /// The host package manager's own lock is held by some other process
    #[error("package manager lock is held by another process: {}", resource.display())]
    ExternalLockHeld {
        /// Lock resource that was found busy
        resource: PathBuf,
    },

    /// Applying updates failed for a backend
    #[error("{backend} update failed: {message}")]
    ApplyFailed {
        /// Backend that failed
        backend: BackendKind,
        /// Description of the failure
        message: String,
    },

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// A bounded command did not finish in time
    #[error("{program} did not finish within {secs}s")]
    Timeout {
        /// Program that was killed
        program: String,
        /// Timeout that elapsed
        secs: u64,
    },

    /// Backend output could not be understood
    #[error("could not parse {backend} output: {message}")]
    Parse {
        /// Backend whose output was malformed
        backend: BackendKind,
        /// Description of the problem
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::BackendUnavailable { .. } => ErrorCategory::Unavailable,
            Error::ExhaustedRetries { .. } => ErrorCategory::Transient,
            Error::LockHeld { .. } | Error::ExternalLockHeld { .. } => ErrorCategory::Lock,
            Error::ApplyFailed { .. } => ErrorCategory::Apply,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error only means "skip the backend".
    pub fn is_skippable(&self) -> bool {
        self.category().is_skippable()
    }

    /// Whether this error aborts the invocation.
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }

    /// Create an error from a failed command's stderr.
    pub fn from_command_output(program: &str, stderr: &str) -> Self {
        let stderr = stderr.trim();
        let last_line = stderr.lines().last().unwrap_or_default();
        Error::CommandFailed {
            message: if last_line.is_empty() {
                format!("{program} exited with an error")
            } else {
                format!("{program}: {last_line}")
            },
            stderr: stderr.to_string(),
        }
    }
}

/// Result type for update operations.
pub type Result<T> = std::result::Result<T, Error>;
