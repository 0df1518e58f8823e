//! Session lock shared by all upkeep processes on a host.
//!
//! The lock is a small JSON record holding the owner's pid. A record whose
//! pid is no longer alive is stale and gets replaced. The liveness check and
//! the write are not atomic with respect to each other; two acquirers racing
//! on a stale record are separated only by the `create_new` open, which is
//! accepted for a single-host, low-concurrency tool.
//!
//! [`LockGuard`] removes the file on drop, which covers normal returns and
//! unwinding panics. Release builds abort on panic, and a killed process
//! never runs `Drop` either; in those cases the record is left behind and
//! the next acquirer replaces it once the pid is gone.

use crate::error::{Error, Result};
use crate::host::HostState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Contents of the lock file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Process holding the lock
    pub pid: u32,
    /// When the lock was taken
    pub acquired_at: DateTime<Utc>,
}

impl LockRecord {
    /// Record for the current process.
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }
}

/// Acquires and releases the session lock.
pub struct LockManager {
    path: PathBuf,
    host: Arc<dyn HostState>,
}

impl LockManager {
    /// Create a manager for the lock file at `path`.
    pub fn new(path: impl Into<PathBuf>, host: Arc<dyn HostState>) -> Self {
        Self {
            path: path.into(),
            host,
        }
    }

    /// Lock file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the lock for the current process.
    ///
    /// Fails with [`Error::ExternalLockHeld`] when the package manager's own
    /// lock is busy and with [`Error::LockHeld`] when a live process owns the
    /// record. The returned guard releases the lock when dropped.
    pub fn acquire(&self) -> Result<LockGuard<'_>> {
        if let Some(resource) = self.host.package_lock_holder() {
            return Err(Error::ExternalLockHeld { resource });
        }

        match self.holder() {
            Ok(Some(record)) => {
                if is_process_alive(record.pid) {
                    return Err(Error::LockHeld { pid: record.pid });
                }
                log::info!(
                    "Removing stale lock left by pid {} at {}",
                    record.pid,
                    record.acquired_at
                );
                self.release()?;
            }
            Ok(None) => {}
            Err(Error::Json(e)) => {
                log::warn!("Discarding unreadable lock {}: {}", self.path.display(), e);
                self.release()?;
            }
            Err(e) => return Err(e),
        }

        let record = LockRecord::current();
        self.write_record(&record)?;
        log::debug!("Acquired {} as pid {}", self.path.display(), record.pid);

        Ok(LockGuard {
            manager: self,
            record,
        })
    }

    /// Remove the lock file. Missing files are fine.
    pub fn release(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Current lock record, if any.
    pub fn holder(&self) -> Result<Option<LockRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write_record(&self, record: &LockRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                // Lost a race against another acquirer.
                let pid = self.holder().ok().flatten().map_or(0, |r| r.pid);
                return Err(Error::LockHeld { pid });
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(serde_json::to_string(record)?.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }
}

/// Scoped ownership of the session lock; releases on drop.
pub struct LockGuard<'a> {
    manager: &'a LockManager,
    record: LockRecord,
}

impl LockGuard<'_> {
    /// Record written when the lock was taken.
    pub fn record(&self) -> &LockRecord {
        &self.record
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        match self.manager.release() {
            Ok(()) => log::debug!("Released {}", self.manager.path.display()),
            Err(e) => log::warn!(
                "Failed to release lock {}: {}",
                self.manager.path.display(),
                e
            ),
        }
    }
}

/// Whether a process with this pid exists.
#[cfg(unix)]
pub fn is_process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    if pid <= 0 {
        return false;
    }

    // SAFETY: signal 0 performs only the existence and permission checks.
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }
    // EPERM: the process exists but belongs to someone else.
    io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: u32) -> bool {
    true
}
