//! Snapshot storage on the host filesystem.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use vsh_core::{Storage, StorageError};

/// Keeps the snapshot in a single JSON file.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-save leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {}", path.display(), err))
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    fn save(&mut self, snapshot: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        let temp = self.temp_path();
        fs::write(&temp, snapshot).map_err(|e| io_error(&temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| io_error(&self.path, e))?;
        log::debug!("snapshot saved to {} ({} bytes)", self.path.display(), snapshot.len());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
