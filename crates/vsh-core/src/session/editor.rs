//! Line editor buffer.
//!
//! The cursor is a byte offset into `buffer` that always sits on a char
//! boundary.

use crate::error::FsError;
use crate::filesystem::VirtualFs;

#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    /// Absolute path of the edited file
    pub path: String,
    pub buffer: String,
    pub cursor: usize,
    pub dirty: bool,
    /// The file did not exist when the editor opened
    pub is_new: bool,
    /// The "save modified buffer?" question is open
    pub exit_prompt: bool,
}

impl EditorState {
    pub fn open(path: impl Into<String>, content: Option<&str>) -> Self {
        Self {
            path: path.into(),
            buffer: content.unwrap_or_default().to_string(),
            cursor: 0,
            dirty: false,
            is_new: content.is_none(),
            exit_prompt: false,
        }
    }

    pub fn insert(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.buffer.insert_str(self.cursor, text);
        self.cursor += text.len();
        self.dirty = true;
    }

    pub fn newline(&mut self) {
        self.insert("\n");
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        let Some((idx, _)) = self.buffer[..self.cursor].char_indices().next_back() else {
            return;
        };
        self.buffer.replace_range(idx..self.cursor, "");
        self.cursor = idx;
        self.dirty = true;
    }

    pub fn move_left(&mut self) {
        if let Some((idx, _)) = self.buffer[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(c) = self.buffer[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = self.buffer[..self.cursor].rfind('\n').map_or(0, |i| i + 1);
    }

    pub fn move_end(&mut self) {
        self.cursor += self.buffer[self.cursor..]
            .find('\n')
            .unwrap_or(self.buffer.len() - self.cursor);
    }

    /// Lines as the save message counts them (an empty buffer is one line).
    pub fn line_count(&self) -> usize {
        self.buffer.split('\n').count()
    }

    /// Write the buffer to the filesystem and clear the dirty flag.
    ///
    /// Returns the number of lines written.
    pub fn save(&mut self, fs: &mut VirtualFs) -> Result<usize, FsError> {
        if self.is_new && !fs.exists(&self.path) {
            fs.create(&self.path, false, Some(&self.buffer))?;
        } else {
            fs.write_file(&self.path, &self.buffer)?;
        }
        self.dirty = false;
        self.is_new = false;
        Ok(self.line_count())
    }

    /// Title bar: file name plus a modified marker.
    pub fn title(&self) -> String {
        let marker = if self.dirty { " [Modified]" } else { "" };
        format!("nano  {}{}", self.path, marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_backspace() {
        let mut ed = EditorState::open("/tmp/a.txt", None);
        assert!(ed.is_new);
        ed.insert("héllo");
        assert_eq!(ed.cursor, "héllo".len());
        ed.backspace();
        ed.backspace();
        assert_eq!(ed.buffer, "hél");
        ed.move_left();
        ed.backspace();
        assert_eq!(ed.buffer, "hl");
        assert!(ed.dirty);
    }

    #[test]
    fn test_backspace_at_start() {
        let mut ed = EditorState::open("/a", Some("x"));
        ed.backspace();
        assert_eq!(ed.buffer, "x");
        assert!(!ed.dirty);
    }

    #[test]
    fn test_home_end() {
        let mut ed = EditorState::open("/a", Some("one\ntwo"));
        ed.move_end();
        assert_eq!(ed.cursor, 3);
        ed.move_right();
        ed.move_right();
        ed.move_home();
        assert_eq!(ed.cursor, 4);
        ed.move_end();
        assert_eq!(ed.cursor, 7);
    }

    #[test]
    fn test_save_creates_then_overwrites() {
        let mut fs = VirtualFs::new();
        let mut ed = EditorState::open("/notes.txt", None);
        ed.insert("a");
        ed.newline();
        ed.insert("b");

        assert_eq!(ed.save(&mut fs).unwrap(), 2);
        assert_eq!(fs.read_file("/notes.txt").unwrap(), "a\nb");
        assert!(!ed.dirty);
        assert!(!ed.is_new);

        ed.insert("!");
        ed.save(&mut fs).unwrap();
        assert_eq!(fs.read_file("/notes.txt").unwrap(), "a\nb!");
    }

    #[test]
    fn test_save_missing_parent() {
        let mut fs = VirtualFs::new();
        let mut ed = EditorState::open("/nope/notes.txt", None);
        assert_eq!(ed.save(&mut fs), Err(FsError::NotFound));
    }
}
