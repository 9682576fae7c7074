//! Input history for the line editor.
//!
//! Stores submitted lines, persists them to `~/.hackrepl/history` and lets
//! the editor walk back and forth through them with the arrow keys.

use std::fs;
use std::path::PathBuf;

use tracing::warn;

/// Maximum number of history entries
const HISTORY_LIMIT: usize = 1000;

/// A single history entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The submitted line
    pub line: String,
    /// Unix timestamp
    pub timestamp: u64,
}

/// Line history with a browsing cursor
pub struct History {
    /// All entries (newest last)
    entries: Vec<HistoryEntry>,
    /// File path for persistence
    file_path: Option<PathBuf>,
    /// Maximum entries
    max_entries: usize,
    /// Index being browsed; `None` when editing a fresh line
    cursor: Option<usize>,
    /// Line being typed before browsing started
    draft: String,
}

impl History {
    /// In-memory history, nothing is persisted
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            file_path: None,
            max_entries: HISTORY_LIMIT,
            cursor: None,
            draft: String::new(),
        }
    }

    /// History backed by `~/.hackrepl/history`
    pub fn persistent() -> Self {
        Self::with_file(crate::config::data_dir().map(|dir| dir.join("history")))
    }

    /// History backed by an explicit file
    pub fn with_file(file_path: Option<PathBuf>) -> Self {
        let mut history = Self {
            file_path,
            ..Self::new()
        };
        history.load();
        history
    }

    /// Load history from file
    fn load(&mut self) {
        let Some(ref path) = self.file_path else {
            return;
        };
        if !path.exists() {
            return;
        }
        match fs::read_to_string(path) {
            Ok(content) => {
                for line in content.lines() {
                    if let Some((ts_str, text)) = line.split_once(';') {
                        if let Ok(timestamp) = ts_str.parse::<u64>() {
                            self.entries.push(HistoryEntry {
                                line: text.to_string(),
                                timestamp,
                            });
                        }
                    }
                }
                let excess = self.entries.len().saturating_sub(self.max_entries);
                self.entries.drain(..excess);
            }
            Err(e) => warn!("Failed to read history {}: {}", path.display(), e),
        }
    }

    /// Save history to file
    fn save(&self) {
        if let Some(ref path) = self.file_path {
            let content: String = self
                .entries
                .iter()
                .map(|e| format!("{};{}", e.timestamp, e.line))
                .collect::<Vec<_>>()
                .join("\n");
            if let Err(e) = fs::write(path, content) {
                warn!("Failed to write history {}: {}", path.display(), e);
            }
        }
    }

    /// Add a submitted line and reset browsing
    pub fn add(&mut self, line: &str) {
        self.cursor = None;
        self.draft.clear();

        // Skip empty or whitespace-only lines
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }

        // Skip if same as last line (dedup consecutive)
        if let Some(last) = self.entries.last() {
            if last.line == trimmed {
                return;
            }
        }

        if Self::is_sensitive(trimmed) {
            return;
        }

        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        self.entries.push(HistoryEntry {
            line: trimmed.to_string(),
            timestamp,
        });

        while self.entries.len() > self.max_entries {
            self.entries.remove(0);
        }

        self.save();
    }

    /// Check if a line looks like it carries a secret
    fn is_sensitive(line: &str) -> bool {
        let lower = line.to_lowercase();
        let sensitive_patterns = [
            "password", "passwd", "secret", "token", "api_key", "apikey",
            "credential",
        ];
        sensitive_patterns.iter().any(|p| lower.contains(p))
    }

    /// Step to an older entry. `current` is the line being edited, kept as
    /// the draft when browsing starts.
    pub fn older(&mut self, current: &str) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let index = match self.cursor {
            None => {
                self.draft = current.to_string();
                self.entries.len() - 1
            }
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.cursor = Some(index);
        Some(&self.entries[index].line)
    }

    /// Step to a newer entry; past the newest returns the draft.
    pub fn newer(&mut self) -> Option<&str> {
        let index = self.cursor?;
        if index + 1 < self.entries.len() {
            self.cursor = Some(index + 1);
            Some(&self.entries[index + 1].line)
        } else {
            self.cursor = None;
            Some(&self.draft)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_skips_blank_duplicate_and_sensitive() {
        let mut history = History::new();
        history.add("echo hi");
        history.add("echo hi");
        history.add("   ");
        history.add("login --password=hunter2");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_browse_back_and_forth() {
        let mut history = History::new();
        history.add("one");
        history.add("two");

        assert_eq!(history.older("draft"), Some("two"));
        assert_eq!(history.older(""), Some("one"));
        assert_eq!(history.older(""), Some("one"));
        assert_eq!(history.newer(), Some("two"));
        assert_eq!(history.newer(), Some("draft"));
        assert_eq!(history.newer(), None);
    }

    #[test]
    fn test_persists_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");

        let mut history = History::with_file(Some(path.clone()));
        history.add("man echo");
        history.add("echo hi");

        let reloaded = History::with_file(Some(path));
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded.entries[1].line, "echo hi");
    }
}
