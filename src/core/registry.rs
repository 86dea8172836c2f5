use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::{
    core::{
        missions::MissionLinkTable,
        store::{KeyMigration, MacroListing, MacroRow, MacroStore},
    },
    key::{self, KeyFields, KeyFormatError, MacroKey},
    params::ValidationError,
    persist::{
        memory::MemoryBlobStore,
        snapshot::{parse_snapshot, ImportFormatError, RegistrySnapshot, SnapshotView},
        BlobStore, CacheInfo, PersistResult, Persistence, DEFAULT_BLOB_NAME,
    },
    query::{self, RowFilter, SortState},
    record::MacroRecord,
    types::{KeyString, MissionName, Notice},
};

/// Registry behavior knobs.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Name of the snapshot blob in the storage medium.
    pub blob_name: String,
    /// Write the snapshot after every mutation.
    pub autosave: bool,
    /// Rewrite legacy and grade-suffixed keys to canonical form at load.
    pub normalize_keys_on_load: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            blob_name: DEFAULT_BLOB_NAME.to_string(),
            autosave: true,
            normalize_keys_on_load: false,
        }
    }
}

/// Result of an exact-key delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    /// Key the delete was asked for.
    pub key: KeyString,
    /// Removed record, `None` when nothing was stored at `key`.
    pub removed: Option<MacroRecord>,
    /// Missions unlinked by the cascade.
    pub unlinked: Vec<MissionName>,
}

/// What [`Registry::save_macro`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAction {
    /// Stored under the canonical key.
    Stored {
        /// Canonical key written.
        key: KeyString,
    },
    /// Blank text deletes instead of storing.
    Deleted(Deletion),
}

/// Detail pane contents for one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDetail {
    /// Key as requested.
    pub key: KeyString,
    /// Stored key the read landed on.
    pub resolved_key: KeyString,
    /// Fields decoded from `key`.
    pub fields: KeyFields,
    /// Record the read resolved to.
    pub record: MacroRecord,
    /// Missions linked to exactly `key`.
    pub linked_missions: Vec<MissionName>,
}

/// Mission table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionRow {
    /// Mission name.
    pub name: MissionName,
    /// Linked macro key, as stored in the link.
    pub macro_key: KeyString,
    /// Decoded target fields, when the target exists and decodes.
    pub fields: Option<KeyFields>,
    /// Food of the target, empty when missing.
    pub food: String,
    /// Memo of the target, empty when missing.
    pub memo: String,
    /// True when the target resolves to a stored macro.
    pub found: bool,
}

/// Parsed import waiting for a confirm decision. Dropping it cancels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingImport {
    snapshot: RegistrySnapshot,
}

impl PendingImport {
    /// Parsed snapshot.
    pub fn snapshot(&self) -> &RegistrySnapshot {
        &self.snapshot
    }

    /// Macros the import would install.
    pub fn macro_count(&self) -> usize {
        self.snapshot.macros.len()
    }

    /// Mission links the import would install.
    pub fn mission_count(&self) -> usize {
        self.snapshot.missions.len()
    }
}

/// The macro registry: records, mission links and their persistence.
///
/// Every mutation writes the full snapshot through to the storage medium.
/// A failed write never rolls back the in-memory change; it is reported as
/// [`Notice::AutosaveFailed`].
pub struct Registry {
    macros: MacroStore,
    missions: MissionLinkTable,
    saved_at: Option<DateTime<Utc>>,
    persistence: Persistence,
    config: RegistryConfig,
    notices: Vec<Notice>,
}

impl Registry {
    /// Restores the registry from `medium`. Never fails; problems become notices.
    pub fn load(medium: Box<dyn BlobStore>, config: RegistryConfig) -> Self {
        let persistence = Persistence::new(medium, config.blob_name.clone());
        let (snapshot, notice) = persistence.load();

        let mut registry = Self {
            macros: MacroStore::from_map(snapshot.macros),
            missions: MissionLinkTable::from_map(snapshot.missions),
            saved_at: snapshot.saved_at,
            persistence,
            config,
            notices: Vec::new(),
        };
        registry.notices.extend(notice);

        if !registry.macros.is_empty() {
            info!(
                macros = registry.macros.len(),
                missions = registry.missions.len(),
                "restored cached registry"
            );
            registry.notices.push(Notice::Restored {
                macros: registry.macros.len(),
                missions: registry.missions.len(),
            });
        }

        if registry.config.normalize_keys_on_load {
            registry.migrate_legacy_keys();
        }

        registry
    }

    /// Empty registry over a fresh in-memory medium.
    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryBlobStore::new()), RegistryConfig::default())
    }

    /// Active configuration.
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Record store.
    pub fn macros(&self) -> &MacroStore {
        &self.macros
    }

    /// Mission links.
    pub fn missions(&self) -> &MissionLinkTable {
        &self.missions
    }

    /// Time of the last successful save, if known.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    /// Takes every queued notice.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Fuzzy read: verbatim key first, then historical spellings.
    pub fn get_macro(&self, key: &str) -> Option<MacroRecord> {
        self.macros.get(key)
    }

    /// Upserts at exactly `key`; callers pass the canonical encoding.
    pub fn set_macro(&mut self, key: impl Into<KeyString>, record: MacroRecord) {
        self.macros.set(key, record);
        self.write_through();
    }

    /// Stores `record` under the canonical encoding of `key`.
    ///
    /// Text and memo are trimmed. Blank text deletes the macro instead.
    pub fn save_macro(&mut self, key: &MacroKey, record: MacroRecord) -> SaveAction {
        let encoded = key.encode();
        let text = record.text.trim();
        if text.is_empty() {
            return SaveAction::Deleted(self.delete_macro(&encoded));
        }

        let record = MacroRecord {
            text: text.to_string(),
            memo: record.memo.trim().to_string(),
            ..record
        };
        self.set_macro(encoded.clone(), record);
        SaveAction::Stored { key: encoded }
    }

    /// Rewrites the memo of the macro `key` reads from, storing at `key`.
    /// Returns false when no macro resolves.
    pub fn update_memo(&mut self, key: &str, memo: impl Into<String>) -> bool {
        let Some(record) = self.macros.get(key) else {
            return false;
        };
        self.set_macro(
            key,
            MacroRecord {
                memo: memo.into(),
                ..record
            },
        );
        true
    }

    /// Removes exactly `key` and every mission linked to exactly `key`.
    ///
    /// Links to other spellings of the same logical key are kept. Nothing
    /// happens when `key` itself is not stored.
    pub fn delete_macro(&mut self, key: &str) -> Deletion {
        let Some(removed) = self.macros.remove(key) else {
            return Deletion {
                key: key.to_string(),
                removed: None,
                unlinked: Vec::new(),
            };
        };

        let unlinked = self.missions.remove_targeting(key);
        self.write_through();
        Deletion {
            key: key.to_string(),
            removed: Some(removed.to_record()),
            unlinked,
        }
    }

    /// Links a mission to `macro_key`, replacing any earlier link.
    pub fn link_mission(
        &mut self,
        name: &str,
        macro_key: impl Into<KeyString>,
    ) -> Result<Option<KeyString>, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyMissionName);
        }
        let prev = self.missions.link(name, macro_key);
        self.write_through();
        Ok(prev)
    }

    /// Removes a mission link. Saves only when a link was removed.
    pub fn unlink_mission(&mut self, name: &str) -> Option<KeyString> {
        let prev = self.missions.unlink(name)?;
        self.write_through();
        Some(prev)
    }

    /// Number of missions linked to exactly `macro_key`.
    pub fn count_links(&self, macro_key: &str) -> usize {
        self.missions.count_for(macro_key)
    }

    /// Listing without queuing notices for skipped keys.
    pub fn listing(&self) -> MacroListing {
        self.macros.list(&self.missions)
    }

    /// Listing rows; undecodable keys are skipped and queued as notices.
    pub fn list(&mut self) -> Vec<MacroRow> {
        let listing = self.macros.list(&self.missions);
        self.notices.extend(
            listing
                .skipped
                .into_iter()
                .map(|err| Notice::UndecodableKey { key: err.key }),
        );
        listing.rows
    }

    /// Filtered and sorted listing rows.
    pub fn rows(&mut self, filter: &RowFilter, sort: &SortState) -> Vec<MacroRow> {
        let rows = self.list();
        query::arrange(rows, filter, sort)
    }

    /// Detail view of `key`; `Ok(None)` when nothing resolves.
    pub fn macro_detail(&self, key: &str) -> Result<Option<MacroDetail>, KeyFormatError> {
        let fields = key::decode(key)?;
        let Some(resolved) = self.macros.resolve(key) else {
            return Ok(None);
        };
        let Some(record) = self.macros.get(resolved) else {
            return Ok(None);
        };

        Ok(Some(MacroDetail {
            key: key.to_string(),
            resolved_key: resolved.to_string(),
            fields,
            record,
            linked_missions: self
                .missions
                .missions_for(key)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }))
    }

    /// Mission rows matching `query` by name, ordered by name.
    pub fn mission_rows(&self, query: &str) -> Vec<MissionRow> {
        self.missions
            .search(query)
            .into_iter()
            .map(|(name, macro_key)| {
                let record = self.macros.get(macro_key);
                let fields = record
                    .as_ref()
                    .and_then(|_| key::decode(macro_key).ok());
                let (food, memo) = record
                    .as_ref()
                    .map(|r| (r.food.clone(), r.memo.clone()))
                    .unwrap_or_default();
                MissionRow {
                    name: name.to_string(),
                    macro_key: macro_key.to_string(),
                    fields,
                    food,
                    memo,
                    found: record.is_some(),
                }
            })
            .collect()
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            macros: self.macros.as_map().clone(),
            missions: self.missions.as_map().clone(),
            saved_at: self.saved_at,
        }
    }

    fn view(&self) -> SnapshotView<'_> {
        SnapshotView {
            macros: self.macros.as_map(),
            missions: self.missions.as_map(),
            saved_at: self.saved_at,
        }
    }

    /// Indented snapshot text for download or copy.
    pub fn export_snapshot(&self) -> PersistResult<String> {
        Ok(self.view().to_pretty()?)
    }

    /// Parses `raw` without touching any registry.
    pub fn stage_import(raw: &str) -> Result<PendingImport, ImportFormatError> {
        Ok(PendingImport {
            snapshot: parse_snapshot(raw)?,
        })
    }

    /// Replaces the whole registry with a staged import and persists it.
    pub fn commit_import(&mut self, pending: PendingImport) {
        let snapshot = pending.snapshot;
        info!(
            macros = snapshot.macros.len(),
            missions = snapshot.missions.len(),
            "replacing registry from import"
        );
        self.macros = MacroStore::from_map(snapshot.macros);
        self.missions = MissionLinkTable::from_map(snapshot.missions);
        self.saved_at = snapshot.saved_at;
        self.write_through();
    }

    /// Parses and applies `raw`. On error the registry is unchanged.
    pub fn import_snapshot(&mut self, raw: &str) -> Result<(), ImportFormatError> {
        let pending = Self::stage_import(raw)?;
        self.commit_import(pending);
        Ok(())
    }

    /// Renames legacy and grade-suffixed keys to canonical form and
    /// retargets the links that pointed at them.
    pub fn migrate_legacy_keys(&mut self) -> KeyMigration {
        let migration = self.macros.normalize_keys();

        for (old, canonical) in &migration.renamed {
            self.missions.retarget(old, canonical);
        }
        for (kept, canonical) in &migration.conflicts {
            warn!(key = %kept, %canonical, "canonical key already stored, leaving legacy key");
            self.notices.push(Notice::MigrationConflict {
                key: kept.clone(),
                canonical: canonical.clone(),
            });
        }

        if !migration.renamed.is_empty() {
            info!(renamed = migration.renamed.len(), "normalized legacy macro keys");
            self.write_through();
        }
        migration
    }

    /// Removes the stored blob, then empties the registry.
    ///
    /// When the blob cannot be removed the registry is left as it was.
    pub fn clear(&mut self) -> bool {
        match self.persistence.clear() {
            Ok(()) => {
                self.macros.clear();
                self.missions = MissionLinkTable::new();
                self.saved_at = None;
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to remove stored snapshot");
                self.notices.push(Notice::ClearFailed {
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    /// Summary of what the medium currently holds.
    pub fn cache_info(&self) -> Option<CacheInfo> {
        self.persistence.inspect().unwrap_or_else(|err| {
            warn!(error = %err, "failed to inspect stored snapshot");
            None
        })
    }

    /// Writes the snapshot now, regardless of `autosave`.
    pub fn save(&mut self) -> bool {
        let view = SnapshotView {
            macros: self.macros.as_map(),
            missions: self.missions.as_map(),
            saved_at: self.saved_at,
        };
        match self.persistence.save(view) {
            Ok(saved_at) => {
                self.saved_at = Some(saved_at);
                true
            }
            Err(err) => {
                warn!(error = %err, "autosave failed");
                self.notices.push(Notice::AutosaveFailed {
                    reason: err.to_string(),
                });
                false
            }
        }
    }

    fn write_through(&mut self) -> bool {
        if !self.config.autosave {
            return true;
        }
        self.save()
    }
}
