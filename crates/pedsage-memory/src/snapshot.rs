//! Persisted form of the memory state.
//!
//! The whole state is one JSON document stored under a single key:
//!
//! ```json
//! {
//!   "version": 1,
//!   "memories": [["<id>", { ...MemoryEntry }], ...],
//!   "conversations": [["<session id>", { ...ConversationMemory }], ...],
//!   "current_session_id": "<session id>" | null
//! }
//! ```
//!
//! Pairs are kept in insertion order. Timestamps are RFC 3339 strings.

use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, MemoryResult};
use crate::types::{ConversationMemory, MemoryEntry};

/// Highest snapshot format this build reads and the one it writes.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    /// Absent in blobs written before versioning; read as 0.
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub memories: Vec<(String, MemoryEntry)>,
    #[serde(default)]
    pub conversations: Vec<(String, ConversationMemory)>,
    #[serde(default)]
    pub current_session_id: Option<String>,
}

impl MemorySnapshot {
    pub fn to_json(&self) -> MemoryResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a blob, rejecting formats newer than [`SNAPSHOT_VERSION`].
    pub fn from_json(raw: &str) -> MemoryResult<Self> {
        let snapshot: Self = serde_json::from_str(raw)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(MemoryError::UnsupportedSnapshot {
                found: snapshot.version,
                supported: SNAPSHOT_VERSION,
            });
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryCategory;
    use chrono::{TimeZone, Utc};

    #[test]
    fn layout_uses_id_pairs_and_rfc3339_timestamps() {
        let when = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        let entry = MemoryEntry::new("fever plan", MemoryCategory::MedicalFact, 0.8)
            .with_timestamp(when);
        let snapshot = MemorySnapshot {
            version: SNAPSHOT_VERSION,
            memories: vec![(entry.id.clone(), entry.clone())],
            conversations: Vec::new(),
            current_session_id: None,
        };

        let value: serde_json::Value =
            serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["memories"][0][0], entry.id.as_str());
        assert_eq!(value["memories"][0][1]["timestamp"], "2026-03-01T08:30:00Z");
        assert_eq!(value["memories"][0][1]["category"], "medical_fact");
        assert!(value["current_session_id"].is_null());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let snapshot = MemorySnapshot::from_json("{}").unwrap();
        assert_eq!(snapshot, MemorySnapshot::default());
    }

    #[test]
    fn newer_versions_are_rejected() {
        let err = MemorySnapshot::from_json(r#"{"version": 99}"#).unwrap_err();
        assert!(matches!(
            err,
            MemoryError::UnsupportedSnapshot { found: 99, supported: SNAPSHOT_VERSION }
        ));
    }

    #[test]
    fn garbage_is_a_snapshot_error() {
        let err = MemorySnapshot::from_json("not json").unwrap_err();
        assert!(matches!(err, MemoryError::Snapshot(_)));
    }
}
