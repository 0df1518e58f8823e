//! Append-only session journal.
//!
//! Each entry is one `[YYYY-MM-DD HH:MM:SS] message` line written with a
//! single append, so several upkeep processes can share the file.

use crate::error::Result;
use chrono::Local;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Destination for journal lines.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    path: Option<PathBuf>,
}

impl Journal {
    /// Journal appending to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Journal that drops every entry.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// File the journal writes to, if enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one entry.
    pub fn append(&self, message: &str) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let line = format_entry(&Local::now().format("%Y-%m-%d %H:%M:%S").to_string(), message);
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

/// Render one journal line; embedded newlines are folded so an entry stays
/// on a single line.
fn format_entry(timestamp: &str, message: &str) -> String {
    let message: String = message
        .trim_end()
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    format!("[{timestamp}] {message}\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_entry() {
        assert_eq!(
            format_entry("2024-05-01 10:00:00", "apply safe: started"),
            "[2024-05-01 10:00:00] apply safe: started\n"
        );
    }

    #[test]
    fn test_format_entry_folds_newlines() {
        assert_eq!(
            format_entry("t", "apt-get failed:\nE: broken\n"),
            "[t] apt-get failed: E: broken\n"
        );
    }

    #[test]
    fn test_append_creates_and_appends() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("state").join("upkeep.log");
        let journal = Journal::new(&path);

        journal.append("first").unwrap();
        journal.append("second").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("] first"));
        assert!(lines[1].ends_with("] second"));
    }

    #[test]
    fn test_disabled_journal() {
        let journal = Journal::disabled();
        assert!(journal.path().is_none());
        assert!(journal.append("ignored").is_ok());
    }

    #[test]
    fn test_append_reports_failure() {
        let tmp = TempDir::new().unwrap();
        // A directory cannot be opened for appending.
        let journal = Journal::new(tmp.path());
        assert!(journal.append("nope").is_err());
    }
}
