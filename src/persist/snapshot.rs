//! Snapshot interchange format.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::{
    record::MacroValue,
    types::{KeyString, MissionName},
};

/// Malformed snapshot text, with the parser's diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid snapshot: {message}")]
pub struct ImportFormatError {
    /// Parser diagnostic.
    pub message: String,
}

impl From<serde_json::Error> for ImportFormatError {
    fn from(value: serde_json::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

/// Full registry state as persisted, exported and imported.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySnapshot {
    /// Stored macros, in insertion order.
    #[serde(default)]
    pub macros: IndexMap<KeyString, MacroValue>,
    /// Mission name to macro key links.
    #[serde(default)]
    pub missions: IndexMap<MissionName, KeyString>,
    /// Time of the last successful save, if known.
    ///
    /// Unparseable values read as unknown rather than failing the snapshot.
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Borrowed snapshot, serialized without copying the maps.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView<'a> {
    /// Stored macros.
    pub macros: &'a IndexMap<KeyString, MacroValue>,
    /// Mission links.
    pub missions: &'a IndexMap<MissionName, KeyString>,
    /// Save stamp to write, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
}

impl SnapshotView<'_> {
    /// Compact encoding used for the storage blob.
    pub fn to_blob(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Indented encoding used for download/copy.
    pub fn to_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(|s| s.parse::<DateTime<Utc>>().ok()))
}

impl RegistrySnapshot {
    /// True when the snapshot holds no macros and no links.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty() && self.missions.is_empty()
    }

    /// Borrowed view of this snapshot.
    pub fn view(&self) -> SnapshotView<'_> {
        SnapshotView {
            macros: &self.macros,
            missions: &self.missions,
            saved_at: self.saved_at,
        }
    }

    /// Compact encoding used for the storage blob.
    pub fn to_blob(&self) -> serde_json::Result<String> {
        self.view().to_blob()
    }

    /// Indented encoding used for download/copy.
    pub fn to_pretty(&self) -> serde_json::Result<String> {
        self.view().to_pretty()
    }

    /// Value equality on the data, ignoring `saved_at`.
    pub fn same_data(&self, other: &Self) -> bool {
        self.macros == other.macros && self.missions == other.missions
    }
}

/// Parses snapshot text. Missing `macros`/`missions` default to empty.
pub fn parse_snapshot(raw: &str) -> Result<RegistrySnapshot, ImportFormatError> {
    Ok(serde_json::from_str(raw)?)
}
