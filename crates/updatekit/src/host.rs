//! Host state consulted by the engine but not owned by it.
//!
//! Two read-only indicators: whether the system package manager's own lock
//! is currently held by another process, and whether the host has flagged a
//! pending reboot.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// Default lock taken by apt/dpkg frontends.
pub const DEFAULT_PACKAGE_LOCK: &str = "/var/lib/dpkg/lock-frontend";

/// Default reboot-pending flag written by update-notifier.
pub const DEFAULT_REBOOT_FLAG: &str = "/var/run/reboot-required";

/// Read-only view of host state.
pub trait HostState: Send + Sync {
    /// Lock resource currently held by some other process, if any.
    fn package_lock_holder(&self) -> Option<PathBuf>;

    /// Whether the host reports that a reboot is pending.
    fn reboot_required(&self) -> bool;
}

/// Host state of a Debian-family Linux system.
#[derive(Debug, Clone)]
pub struct LinuxHost {
    package_lock: PathBuf,
    reboot_flag: PathBuf,
}

impl LinuxHost {
    /// Create a host view using explicit paths.
    pub fn new(package_lock: impl Into<PathBuf>, reboot_flag: impl Into<PathBuf>) -> Self {
        Self {
            package_lock: package_lock.into(),
            reboot_flag: reboot_flag.into(),
        }
    }
}

impl Default for LinuxHost {
    fn default() -> Self {
        Self::new(DEFAULT_PACKAGE_LOCK, DEFAULT_REBOOT_FLAG)
    }
}

impl HostState for LinuxHost {
    fn package_lock_holder(&self) -> Option<PathBuf> {
        match is_fcntl_locked(&self.package_lock) {
            Ok(true) => Some(self.package_lock.clone()),
            Ok(false) => None,
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                // Usually EACCES when not root; the package manager itself
                // will refuse later if the lock is really busy.
                log::debug!(
                    "Cannot probe {}: {}; assuming it is free",
                    self.package_lock.display(),
                    e
                );
                None
            }
        }
    }

    fn reboot_required(&self) -> bool {
        self.reboot_flag.exists()
    }
}

/// Check whether another process holds a POSIX record lock on `path`.
#[cfg(unix)]
fn is_fcntl_locked(path: &Path) -> io::Result<bool> {
    use std::os::fd::AsRawFd;

    let file = OpenOptions::new().read(true).open(path)?;

    // SAFETY: `flock` is a plain C struct; all-zero is a valid value.
    let mut probe: libc::flock = unsafe { std::mem::zeroed() };
    probe.l_type = libc::F_WRLCK as libc::c_short;
    probe.l_whence = libc::SEEK_SET as libc::c_short;
    probe.l_start = 0;
    probe.l_len = 0;

    // SAFETY: the fd is valid for the lifetime of `file` and `probe` is a
    // properly initialized flock struct.
    let rc = unsafe { libc::fcntl(file.as_raw_fd(), libc::F_GETLK, &mut probe) };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }

    Ok(probe.l_type != libc::F_UNLCK as libc::c_short)
}

#[cfg(not(unix))]
fn is_fcntl_locked(_path: &Path) -> io::Result<bool> {
    Ok(false)
}
