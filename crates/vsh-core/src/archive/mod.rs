//! Archive containers over VFS subtrees.
//!
//! Both formats are JSON documents stored as ordinary file content:
//!
//! - [`TarArchive`] - plain entries `{type, content, size}` / `{type: "directory"}`
//! - [`ZipArchive`] - deflate-compressed, base64-encoded file payloads
//!
//! Member names are normalized relative paths. Extraction walks members in
//! lexicographic order so parents are created before their children.

mod tar;
mod zip;

pub use tar::{TarArchive, TarEntry};
pub use zip::{ZipArchive, ZipEntry, ZipReport};

use serde::Deserialize;

use crate::error::{ArchiveError, FsError};
use crate::filesystem::{self, VirtualFs};
use crate::models::Node;

/// Outcome of extracting one member.
#[derive(Debug)]
pub enum Extracted {
    Directory(String),
    File(String),
    Failed { path: String, error: ArchiveError },
}

/// A VFS node flattened into an archive member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Member<'a> {
    File { key: String, content: &'a str },
    Directory { key: String },
}

/// Flatten `abs` (typed by the user as `typed`) into members.
///
/// The member name is `typed` in normalized relative form; an empty name
/// (`.` or `/`) contributes only its children.
pub(crate) fn flatten<'a>(
    fs: &'a VirtualFs,
    abs: &str,
    typed: &str,
) -> Result<Vec<Member<'a>>, FsError> {
    let key = filesystem::normalize_relative(typed);
    let node = fs.resolve(abs).ok_or(FsError::NotFound)?;

    let mut members = Vec::new();
    match node {
        Node::File { content } => {
            let key = if key.is_empty() {
                filesystem::file_name(abs).to_string()
            } else {
                key
            };
            members.push(Member::File { key, content });
        }
        Node::Directory { .. } => {
            if !key.is_empty() {
                members.push(Member::Directory { key: key.clone() });
            }
            for (rel, child) in fs.walk(abs)? {
                let child_key = if key.is_empty() {
                    rel
                } else {
                    format!("{}/{}", key, rel)
                };
                members.push(match child {
                    Node::File { content } => Member::File {
                        key: child_key,
                        content,
                    },
                    Node::Directory { .. } => Member::Directory { key: child_key },
                });
            }
        }
    }
    Ok(members)
}

/// Absolute destination of a member below `base`.
pub(crate) fn member_path(base: &str, key: &str) -> String {
    VirtualFs::normalize_path(&filesystem::normalize_relative(key), base, base)
}

/// Write one extracted file, creating missing parents.
pub(crate) fn write_member(fs: &mut VirtualFs, path: &str, content: &str) -> Result<(), FsError> {
    fs.create_dir_all(&filesystem::parent_path(path))?;
    fs.write_file(path, content)
}

#[derive(Deserialize)]
struct Header {
    #[serde(rename = "type", alias = "kind")]
    kind: String,
}

/// Check the container tag before decoding the whole document.
pub(crate) fn check_kind(text: &str, expected: &'static str) -> Result<(), ArchiveError> {
    let header: Header = serde_json::from_str(text)?;
    if header.kind == expected {
        Ok(())
    } else {
        Err(ArchiveError::WrongKind(expected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fs() -> VirtualFs {
        let mut fs = VirtualFs::new();
        fs.create_dir_all("/w/notes/sub").unwrap();
        fs.write_file("/w/notes/a.txt", "alpha").unwrap();
        fs.write_file("/w/notes/sub/b.txt", "beta").unwrap();
        fs
    }

    #[test]
    fn test_flatten_directory() {
        let fs = sample_fs();
        let members = flatten(&fs, "/w/notes", "./notes/").unwrap();
        assert_eq!(
            members,
            vec![
                Member::Directory { key: "notes".into() },
                Member::File {
                    key: "notes/a.txt".into(),
                    content: "alpha"
                },
                Member::Directory {
                    key: "notes/sub".into()
                },
                Member::File {
                    key: "notes/sub/b.txt".into(),
                    content: "beta"
                },
            ]
        );
    }

    #[test]
    fn test_flatten_current_directory() {
        let fs = sample_fs();
        let members = flatten(&fs, "/w/notes", ".").unwrap();
        assert_eq!(members.len(), 3);
        assert!(matches!(&members[0], Member::File { key, .. } if key == "a.txt"));
    }

    #[test]
    fn test_member_path_stays_below_base() {
        assert_eq!(member_path("/tmp/out", "notes/a.txt"), "/tmp/out/notes/a.txt");
        assert_eq!(member_path("/tmp/out", "../../etc/passwd"), "/tmp/out/etc/passwd");
    }

    #[test]
    fn test_check_kind() {
        assert!(check_kind(r#"{"type":"tar","files":{}}"#, "tar").is_ok());
        assert!(check_kind(r#"{"kind":"tar"}"#, "tar").is_ok());
        assert!(matches!(
            check_kind(r#"{"type":"zip"}"#, "tar"),
            Err(ArchiveError::WrongKind("tar"))
        ));
        assert!(matches!(
            check_kind("not json", "tar"),
            Err(ArchiveError::Malformed(_))
        ));
    }
}
