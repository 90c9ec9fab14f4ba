use std::collections::BTreeMap;
use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};

use super::{Extracted, Member, check_kind, flatten, member_path, write_member};
use crate::error::{ArchiveError, FsError};
use crate::filesystem::VirtualFs;
use crate::utils::format::compression_ratio;

const KIND: &str = "zip";

/// A zip-like member.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ZipEntry {
    File {
        /// Base64 payload: deflated bytes when `actually_compressed`,
        /// otherwise the raw content.
        compressed: String,
        #[serde(rename = "originalSize")]
        original_size: usize,
        #[serde(rename = "compressedSize")]
        compressed_size: usize,
        #[serde(rename = "actuallyCompressed", default)]
        actually_compressed: bool,
    },
    Directory,
}

impl ZipEntry {
    /// Space saved for this member, in percent.
    pub fn ratio(&self) -> u32 {
        match self {
            ZipEntry::File {
                original_size,
                compressed_size,
                ..
            } => compression_ratio(*original_size, *compressed_size),
            ZipEntry::Directory => 0,
        }
    }
}

/// One line of `zip` output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZipReport {
    pub key: String,
    pub is_dir: bool,
    /// `None` when the member was stored uncompressed.
    pub ratio: Option<u32>,
}

/// Compressed archive document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZipArchive {
    #[serde(rename = "type", alias = "kind")]
    kind: String,
    pub created: String,
    #[serde(default)]
    pub compressed: bool,
    pub files: BTreeMap<String, ZipEntry>,
}

impl ZipArchive {
    pub fn new(created: impl Into<String>) -> Self {
        Self {
            kind: KIND.to_string(),
            created: created.into(),
            compressed: true,
            files: BTreeMap::new(),
        }
    }

    /// Add `abs` (typed as `typed`).
    ///
    /// Directories are only accepted with `recursive`.
    pub fn add_path(
        &mut self,
        fs: &VirtualFs,
        abs: &str,
        typed: &str,
        recursive: bool,
    ) -> Result<Vec<ZipReport>, ArchiveError> {
        if fs.is_directory(abs) && !recursive {
            return Err(ArchiveError::DirectoryNotRecursive(typed.to_string()));
        }
        let members = flatten(fs, abs, typed).map_err(|source| ArchiveError::Fs {
            path: typed.to_string(),
            source,
        })?;

        let mut reports = Vec::new();
        for member in members {
            let report = match member {
                Member::File { key, content } => {
                    let entry = encode(content)?;
                    let ratio = match &entry {
                        ZipEntry::File {
                            actually_compressed: true,
                            ..
                        } => Some(entry.ratio()),
                        _ => None,
                    };
                    self.files.insert(key.clone(), entry);
                    ZipReport {
                        key,
                        is_dir: false,
                        ratio,
                    }
                }
                Member::Directory { key } => {
                    self.files.insert(key.clone(), ZipEntry::Directory);
                    ZipReport {
                        key,
                        is_dir: true,
                        ratio: None,
                    }
                }
            };
            reports.push(report);
        }
        Ok(reports)
    }

    pub fn parse(text: &str) -> Result<Self, ArchiveError> {
        check_kind(text, KIND)?;
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ArchiveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of file members.
    pub fn file_count(&self) -> usize {
        self.files
            .values()
            .filter(|e| matches!(e, ZipEntry::File { .. }))
            .count()
    }

    /// Total (original, compressed) sizes of all file members.
    pub fn totals(&self) -> (usize, usize) {
        self.files.values().fold((0, 0), |(orig, comp), entry| match entry {
            ZipEntry::File {
                original_size,
                compressed_size,
                ..
            } => (orig + original_size, comp + compressed_size),
            ZipEntry::Directory => (orig, comp),
        })
    }

    /// Recreate every member below `base`.
    pub fn extract(&self, fs: &mut VirtualFs, base: &str) -> Vec<Extracted> {
        self.files
            .iter()
            .map(|(key, entry)| {
                let path = member_path(base, key);
                match entry {
                    ZipEntry::Directory => match fs.create_dir_all(&path) {
                        Ok(_) => Extracted::Directory(key.clone()),
                        Err(source) => failed(key, source),
                    },
                    ZipEntry::File { .. } => match decode(key, entry) {
                        Ok(content) => match write_member(fs, &path, &content) {
                            Ok(()) => Extracted::File(key.clone()),
                            Err(source) => failed(key, source),
                        },
                        Err(error) => Extracted::Failed {
                            path: key.clone(),
                            error,
                        },
                    },
                }
            })
            .collect()
    }
}

fn failed(key: &str, source: FsError) -> Extracted {
    Extracted::Failed {
        path: key.to_string(),
        error: ArchiveError::Fs {
            path: key.to_string(),
            source,
        },
    }
}

fn deflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn inflate(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Compress a file, keeping the raw bytes when deflate does not help.
fn encode(content: &str) -> Result<ZipEntry, ArchiveError> {
    let raw = content.as_bytes();
    let deflated = deflate(raw).map_err(|e| ArchiveError::Payload(e.to_string()))?;
    let actually_compressed = deflated.len() < raw.len();
    let payload = if actually_compressed { &deflated[..] } else { raw };

    Ok(ZipEntry::File {
        compressed: BASE64.encode(payload),
        original_size: raw.len(),
        compressed_size: payload.len(),
        actually_compressed,
    })
}

/// Reverse [`encode`]: base64-decode, then inflate.
///
/// A payload that does not inflate is taken as plain base64 text.
fn decode(key: &str, entry: &ZipEntry) -> Result<String, ArchiveError> {
    let ZipEntry::File {
        compressed,
        actually_compressed,
        ..
    } = entry
    else {
        return Ok(String::new());
    };

    let bytes = BASE64
        .decode(compressed.as_bytes())
        .map_err(|_| ArchiveError::Payload(key.to_string()))?;

    let plain = if *actually_compressed {
        inflate(&bytes).unwrap_or(bytes)
    } else {
        bytes
    };
    String::from_utf8(plain).map_err(|_| ArchiveError::Payload(key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_fs() -> VirtualFs {
        let mut fs = VirtualFs::new();
        fs.create_dir_all("/w/project/src").unwrap();
        fs.write_file("/w/project/big.txt", &"repeat me ".repeat(200)).unwrap();
        fs.write_file("/w/project/tiny", "x").unwrap();
        fs.write_file("/w/project/src/empty.rs", "").unwrap();
        fs.write_file("/w/project/src/uni.txt", "héllo wörld ✓").unwrap();
        fs
    }

    #[test]
    fn test_directory_requires_recursive() {
        let fs = sample_fs();
        let mut archive = ZipArchive::new("now");
        let err = archive
            .add_path(&fs, "/w/project", "project", false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "project: is a directory (use -r for recursive)"
        );
    }

    #[test]
    fn test_round_trip_bytes() {
        let mut fs = sample_fs();
        let mut archive = ZipArchive::new("now");
        archive.add_path(&fs, "/w/project", "project", true).unwrap();

        let parsed = ZipArchive::parse(&archive.to_json().unwrap()).unwrap();
        fs.create_dir_all("/out").unwrap();
        let results = parsed.extract(&mut fs, "/out");
        assert!(results.iter().all(|r| !matches!(r, Extracted::Failed { .. })));

        for file in ["big.txt", "tiny", "src/empty.rs", "src/uni.txt"] {
            let original = fs.read_file(&format!("/w/project/{}", file)).unwrap().to_string();
            let restored = fs.read_file(&format!("/out/project/{}", file)).unwrap();
            assert_eq!(original, restored, "{}", file);
        }
    }

    #[test]
    fn test_reports_and_ratios() {
        let fs = sample_fs();
        let mut archive = ZipArchive::new("now");
        let reports = archive.add_path(&fs, "/w/project", "project", true).unwrap();

        let big = reports.iter().find(|r| r.key == "project/big.txt").unwrap();
        assert!(big.ratio.unwrap() > 50);
        let tiny = reports.iter().find(|r| r.key == "project/tiny").unwrap();
        assert_eq!(tiny.ratio, None);
        assert!(reports.iter().any(|r| r.is_dir && r.key == "project/src"));

        assert_eq!(archive.file_count(), 4);
        let (orig, comp) = archive.totals();
        assert!(comp < orig);
    }

    #[test]
    fn test_plain_base64_fallback() {
        let entry = ZipEntry::File {
            compressed: BASE64.encode("not deflated"),
            original_size: 12,
            compressed_size: 12,
            actually_compressed: true,
        };
        assert_eq!(decode("f", &entry).unwrap(), "not deflated");

        let bad = ZipEntry::File {
            compressed: "%%%".to_string(),
            original_size: 1,
            compressed_size: 1,
            actually_compressed: false,
        };
        assert!(decode("f", &bad).is_err());
    }

    #[test]
    fn test_document_field_names() {
        let fs = sample_fs();
        let mut archive = ZipArchive::new("now");
        archive.add_path(&fs, "/w/project/tiny", "tiny", false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&archive.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "zip");
        assert_eq!(json["compressed"], true);
        assert_eq!(json["files"]["tiny"]["originalSize"], 1);
        assert_eq!(json["files"]["tiny"]["actuallyCompressed"], false);
    }
}
