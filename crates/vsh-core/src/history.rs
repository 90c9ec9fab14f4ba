//! Command history: a bounded ring plus up/down navigation.
//!
//! Each user's history is mirrored to `~/.bash_history` as newline-delimited
//! raw command strings; the shell appends to the file, this type only keeps
//! the in-memory ring.

use crate::config::MAX_COMMAND_HISTORY;
use crate::utils::RingBuffer;

#[derive(Clone, Debug)]
pub struct CommandHistory {
    entries: RingBuffer<String>,
    /// Position while navigating with up/down; `None` when editing a new line.
    cursor: Option<usize>,
    /// Line being edited before navigation started.
    draft: String,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    pub fn new() -> Self {
        Self {
            entries: RingBuffer::new(MAX_COMMAND_HISTORY),
            cursor: None,
            draft: String::new(),
        }
    }

    /// Rebuild from a history file, keeping the newest entries.
    pub fn from_file(text: &str) -> Self {
        let mut history = Self::new();
        history
            .entries
            .extend(text.lines().filter(|l| !l.trim().is_empty()).map(str::to_string));
        history
    }

    pub fn from_entries(entries: impl IntoIterator<Item = String>) -> Self {
        let mut history = Self::new();
        history.entries.extend(entries);
        history
    }

    /// Record a submitted line and reset navigation.
    pub fn push(&mut self, line: &str) {
        if !line.trim().is_empty() {
            self.entries.push(line.to_string());
        }
        self.cursor = None;
        self.draft.clear();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.to_vec()
    }

    /// Move through history (`direction < 0` is older).
    ///
    /// `current` is the line being edited; it comes back when navigating
    /// past the newest entry.
    pub fn navigate(&mut self, direction: i32, current: &str) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let last = self.entries.len() - 1;

        let new_cursor = match self.cursor {
            None if direction < 0 => {
                self.draft = current.to_string();
                Some(last)
            }
            None => return None,
            Some(i) if direction < 0 => Some(i.saturating_sub(1)),
            Some(i) if direction > 0 && i < last => Some(i + 1),
            Some(_) if direction > 0 => None,
            other => other,
        };

        self.cursor = new_cursor;
        match new_cursor {
            Some(i) => self.entries.get(i).cloned(),
            None => Some(std::mem::take(&mut self.draft)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded() {
        let mut history = CommandHistory::new();
        for i in 0..MAX_COMMAND_HISTORY + 10 {
            history.push(&format!("cmd {}", i));
        }
        assert_eq!(history.len(), MAX_COMMAND_HISTORY);
        assert_eq!(history.iter().next(), Some("cmd 10"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let mut history = CommandHistory::new();
        history.push("   ");
        assert!(history.is_empty());

        let history = CommandHistory::from_file("ls\n\npwd\n");
        assert_eq!(history.to_vec(), vec!["ls", "pwd"]);
    }

    #[test]
    fn test_navigation_restores_draft() {
        let mut history = CommandHistory::from_entries(["ls".to_string(), "pwd".to_string()]);
        assert_eq!(history.navigate(-1, "ec").as_deref(), Some("pwd"));
        assert_eq!(history.navigate(-1, "").as_deref(), Some("ls"));
        assert_eq!(history.navigate(-1, "").as_deref(), Some("ls"));
        assert_eq!(history.navigate(1, "").as_deref(), Some("pwd"));
        assert_eq!(history.navigate(1, "").as_deref(), Some("ec"));
        assert_eq!(history.navigate(1, "ec"), None);
    }
}
