use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Extracted, Member, check_kind, flatten, member_path, write_member};
use crate::error::{ArchiveError, FsError};
use crate::filesystem::VirtualFs;

const KIND: &str = "tar";

/// A tar-like member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TarEntry {
    File { content: String, size: usize },
    Directory,
}

/// Uncompressed archive document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TarArchive {
    #[serde(rename = "type", alias = "kind")]
    kind: String,
    pub created: String,
    pub files: BTreeMap<String, TarEntry>,
}

impl TarArchive {
    pub fn new(created: impl Into<String>) -> Self {
        Self {
            kind: KIND.to_string(),
            created: created.into(),
            files: BTreeMap::new(),
        }
    }

    /// Add `abs` (typed as `typed`) and everything below it.
    ///
    /// Returns the member names added, in order.
    pub fn add_path(&mut self, fs: &VirtualFs, abs: &str, typed: &str) -> Result<Vec<String>, FsError> {
        let mut added = Vec::new();
        for member in flatten(fs, abs, typed)? {
            let (key, entry) = match member {
                Member::File { key, content } => (
                    key,
                    TarEntry::File {
                        content: content.to_string(),
                        size: content.len(),
                    },
                ),
                Member::Directory { key } => (key, TarEntry::Directory),
            };
            added.push(key.clone());
            self.files.insert(key, entry);
        }
        Ok(added)
    }

    /// Decode an archive document.
    pub fn parse(text: &str) -> Result<Self, ArchiveError> {
        check_kind(text, KIND)?;
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ArchiveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Sum of file sizes.
    pub fn total_size(&self) -> usize {
        self.files
            .values()
            .map(|entry| match entry {
                TarEntry::File { size, .. } => *size,
                TarEntry::Directory => 0,
            })
            .sum()
    }

    /// Recreate every member below `base`.
    pub fn extract(&self, fs: &mut VirtualFs, base: &str) -> Vec<Extracted> {
        // BTreeMap iteration is already lexicographic.
        self.files
            .iter()
            .map(|(key, entry)| {
                let path = member_path(base, key);
                let result = match entry {
                    TarEntry::Directory => fs.create_dir_all(&path).map(|_| ()),
                    TarEntry::File { content, .. } => write_member(fs, &path, content),
                };
                match (result, entry) {
                    (Ok(()), TarEntry::Directory) => Extracted::Directory(key.clone()),
                    (Ok(()), TarEntry::File { .. }) => Extracted::File(key.clone()),
                    (Err(source), _) => Extracted::Failed {
                        path: key.clone(),
                        error: ArchiveError::Fs {
                            path: key.clone(),
                            source,
                        },
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fs() -> VirtualFs {
        let mut fs = VirtualFs::new();
        fs.create_dir_all("/home/user/notes/deep").unwrap();
        fs.write_file("/home/user/notes/a.txt", "alpha\n").unwrap();
        fs.write_file("/home/user/notes/deep/b.txt", "beta").unwrap();
        fs.write_file("/home/user/notes/empty", "").unwrap();
        fs
    }

    #[test]
    fn test_document_shape() {
        let fs = sample_fs();
        let mut archive = TarArchive::new("2024-01-01T00:00:00.000Z");
        archive
            .add_path(&fs, "/home/user/notes/a.txt", "notes/a.txt")
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&archive.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "tar");
        assert_eq!(json["files"]["notes/a.txt"]["type"], "file");
        assert_eq!(json["files"]["notes/a.txt"]["size"], 6);
    }

    #[test]
    fn test_extract_into_sibling_reproduces_tree() {
        let mut fs = sample_fs();
        let mut archive = TarArchive::new("now");
        let added = archive.add_path(&fs, "/home/user/notes", "notes").unwrap();
        assert_eq!(added.len(), 5);

        let text = archive.to_json().unwrap();
        let parsed = TarArchive::parse(&text).unwrap();

        fs.create_dir_all("/home/user/copy").unwrap();
        let results = parsed.extract(&mut fs, "/home/user/copy");
        assert!(results.iter().all(|r| !matches!(r, Extracted::Failed { .. })));

        let original: Vec<_> = fs
            .walk("/home/user/notes")
            .unwrap()
            .into_iter()
            .map(|(p, n)| (p, n.clone()))
            .collect();
        let restored: Vec<_> = fs
            .walk("/home/user/copy/notes")
            .unwrap()
            .into_iter()
            .map(|(p, n)| (p, n.clone()))
            .collect();
        assert_eq!(original, restored);
    }

    #[test]
    fn test_parse_rejects_other_kinds() {
        let err = TarArchive::parse(r#"{"type":"zip","created":"x","files":{}}"#).unwrap_err();
        assert_eq!(err.to_string(), "not a valid tar archive");

        let err = TarArchive::parse("{broken").unwrap_err();
        assert_eq!(err.to_string(), "invalid archive format");
    }

    #[test]
    fn test_extract_over_file_reports_failure() {
        let mut fs = sample_fs();
        let mut archive = TarArchive::new("now");
        archive.add_path(&fs, "/home/user/notes", "notes").unwrap();
        fs.write_file("/home/user/notes2", "blocker").unwrap();

        // Extracting at "/home/user" overwrites the same files in place
        let results = archive.extract(&mut fs, "/home/user");
        assert!(results.iter().all(|r| !matches!(r, Extracted::Failed { .. })));

        let results = archive.extract(&mut fs, "/home/user/notes2");
        assert!(results.iter().all(|r| matches!(r, Extracted::Failed { .. })));
    }

    #[test]
    fn test_total_size() {
        let fs = sample_fs();
        let mut archive = TarArchive::new("now");
        archive.add_path(&fs, "/home/user/notes", ".").unwrap();
        assert_eq!(archive.total_size(), 10);
    }
}
