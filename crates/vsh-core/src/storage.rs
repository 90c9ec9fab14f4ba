//! Durable session snapshots.
//!
//! The shell serializes itself into a [`Snapshot`] and hands the JSON text to
//! a [`Storage`] backend. Backends are best-effort: callers log failures and
//! keep the in-memory session untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::StorageError;
use crate::filesystem::VirtualFs;
use crate::models::{OutputLine, Settings, Stats};

// =============================================================================
// Snapshot Document
// =============================================================================

/// Serialized session.
///
/// `fileSystem`, `settings` and `version` are required; a document missing
/// any of them is rejected as a whole. Unknown fields are ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub file_system: VirtualFs,
    pub settings: Settings,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<Stats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_path: Option<String>,
    /// Name of the active user, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_history: Option<Vec<OutputLine>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_history: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_date: Option<String>,
}

impl Snapshot {
    pub fn parse(text: &str) -> Result<Self, StorageError> {
        serde_json::from_str(text).map_err(|e| StorageError::InvalidSnapshot(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Outcome of the saves made so far, reported by `storage-info`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageInfo {
    /// Backend description
    pub location: String,
    /// Size of the last snapshot written, in bytes
    pub bytes: usize,
    pub saves: u64,
    pub failures: u64,
    /// SHA-256 of the last snapshot written
    pub fingerprint: Option<String>,
}

impl StorageInfo {
    pub fn record_save(&mut self, snapshot: &str) {
        self.bytes = snapshot.len();
        self.saves += 1;
        self.fingerprint = Some(hex::encode(Sha256::digest(snapshot.as_bytes())));
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }
}

// =============================================================================
// Storage Backends
// =============================================================================

/// Where snapshots live between sessions.
///
/// Backends are `Send` so a host can share the [`Shell`](crate::Shell) with
/// input callbacks.
pub trait Storage: Send {
    /// The stored snapshot text, or `None` when nothing was saved yet.
    fn load(&self) -> Result<Option<String>, StorageError>;

    fn save(&mut self, snapshot: &str) -> Result<(), StorageError>;

    fn clear(&mut self) -> Result<(), StorageError>;

    /// Human-readable location, shown by `storage-info`.
    fn describe(&self) -> String;
}

/// Volatile storage; the default for tests and `--no-persist`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Option<String>,
    unavailable: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-filled with a snapshot text.
    pub fn with_data(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            unavailable: false,
        }
    }

    /// Storage whose every operation fails.
    pub fn unavailable() -> Self {
        Self {
            data: None,
            unavailable: true,
        }
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable);
        }
        Ok(self.data.clone())
    }

    fn save(&mut self, snapshot: &str) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable);
        }
        self.data = Some(snapshot.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        if self.unavailable {
            return Err(StorageError::Unavailable);
        }
        self.data = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SNAPSHOT_VERSION;

    fn snapshot() -> Snapshot {
        let settings = Settings::default();
        Snapshot {
            file_system: VirtualFs::seeded(&settings.users),
            settings,
            version: SNAPSHOT_VERSION.to_string(),
            stats: None,
            current_path: Some("/home/user".into()),
            current_user: Some("user".into()),
            aliases: None,
            output_history: Some(vec![OutputLine::text("hi")]),
            command_history: None,
            export_date: None,
        }
    }

    #[test]
    fn test_snapshot_json_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&snapshot().to_json().unwrap()).unwrap();
        assert!(json["fileSystem"]["/"]["children"]["home"].is_object());
        assert_eq!(json["settings"]["currentUser"], 1001);
        assert_eq!(json["settings"]["users"][0]["UID"], 0);
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["outputHistory"][0]["kind"], "text");
        assert!(json.get("stats").is_none());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let original = snapshot();
        let parsed = Snapshot::parse(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_missing_required_field_rejected() {
        for field in ["fileSystem", "settings", "version"] {
            let mut json: serde_json::Value =
                serde_json::from_str(&snapshot().to_json().unwrap()).unwrap();
            assert!(json.as_object_mut().unwrap().remove(field).is_some());
            let result = Snapshot::parse(&json.to_string());
            assert!(
                matches!(result, Err(StorageError::InvalidSnapshot(_))),
                "accepted snapshot without {}",
                field
            );
        }
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let mut json: serde_json::Value =
            serde_json::from_str(&snapshot().to_json().unwrap()).unwrap();
        json["settings"]["users"][0]["permissions"] = serde_json::json!({"/": "rwx"});
        json["theme"] = serde_json::json!("dark");
        assert!(Snapshot::parse(&json.to_string()).is_ok());
    }

    #[test]
    fn test_memory_storage() {
        let mut storage = MemoryStorage::new();
        assert_eq!(storage.load().unwrap(), None);
        storage.save("{}").unwrap();
        assert_eq!(storage.load().unwrap().as_deref(), Some("{}"));
        storage.clear().unwrap();
        assert_eq!(storage.data(), None);

        let mut broken = MemoryStorage::unavailable();
        assert!(matches!(broken.save("{}"), Err(StorageError::Unavailable)));
    }

    #[test]
    fn test_storage_info_counts() {
        let mut info = StorageInfo::default();
        info.record_save("abc");
        info.record_failure();
        assert_eq!(info.bytes, 3);
        assert_eq!(info.saves, 1);
        assert_eq!(info.failures, 1);
        assert_eq!(
            info.fingerprint.as_deref(),
            Some("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }
}
