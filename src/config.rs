use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use updatekit::host::{DEFAULT_PACKAGE_LOCK, DEFAULT_REBOOT_FLAG};
use updatekit::{BackendKind, LinuxHost, RetryConfig};

use crate::paths;

// ============================================================================
// Config Structures
// ============================================================================

/// Contents of `config.toml`. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Session lock file (default: `<state dir>/upkeep.lock`)
    pub lock_file: Option<String>,

    /// Journal file (default: `<state dir>/upkeep.log`)
    pub journal_file: Option<String>,

    /// Upper bound for each backend query in `upkeep count`
    pub count_timeout_secs: u64,

    pub retry: RetrySection,
    pub host: HostSection,
    pub backends: BackendsSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    /// Attempts for each metadata refresh, including the first
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub delay_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostSection {
    /// Lock file owned by the system package manager
    pub package_lock: String,
    /// File whose presence means a reboot is pending
    pub reboot_flag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendsSection {
    /// Backends to leave alone, by name (apt, snap, flatpak, npm, pip)
    pub disabled: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lock_file: None,
            journal_file: None,
            count_timeout_secs: 30,
            retry: RetrySection::default(),
            host: HostSection::default(),
            backends: BackendsSection::default(),
        }
    }
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 2,
        }
    }
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            package_lock: DEFAULT_PACKAGE_LOCK.to_string(),
            reboot_flag: DEFAULT_REBOOT_FLAG.to_string(),
        }
    }
}

// ============================================================================
// Config Implementation
// ============================================================================

impl Config {
    /// Load config from `path`, or from the default location.
    ///
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (paths::config_file()?, false),
        };

        if !path.exists() {
            if explicit {
                bail!("Config file not found: {}", path.display());
            }
            log::debug!("Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML content.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.disabled_backends()?;
        if config.retry.max_attempts == 0 {
            bail!("retry.max_attempts must be at least 1");
        }
        Ok(config)
    }

    /// Resolved session lock path.
    pub fn lock_path(&self) -> Result<PathBuf> {
        match &self.lock_file {
            Some(p) => Ok(paths::expand(p)),
            None => Ok(paths::state_dir()?.join("upkeep.lock")),
        }
    }

    /// Resolved journal path.
    pub fn journal_path(&self) -> Result<PathBuf> {
        match &self.journal_file {
            Some(p) => Ok(paths::expand(p)),
            None => Ok(paths::state_dir()?.join("upkeep.log")),
        }
    }

    /// Retry policy for metadata refreshes.
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::fixed(
            self.retry.max_attempts,
            Duration::from_secs(self.retry.delay_secs),
        )
    }

    /// Timeout for each query made by `upkeep count`.
    pub fn count_timeout(&self) -> Duration {
        Duration::from_secs(self.count_timeout_secs)
    }

    /// Host state probe using the configured paths.
    pub fn host(&self) -> LinuxHost {
        LinuxHost::new(
            paths::expand(&self.host.package_lock),
            paths::expand(&self.host.reboot_flag),
        )
    }

    /// Backends named in `[backends] disabled`.
    pub fn disabled_backends(&self) -> Result<Vec<BackendKind>> {
        self.backends
            .disabled
            .iter()
            .map(|name| {
                BackendKind::from_name(name)
                    .with_context(|| format!("Unknown backend in [backends] disabled: '{name}'"))
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================
