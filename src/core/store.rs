use hashbrown::HashSet;
use indexmap::IndexMap;
use tracing::warn;

use crate::{
    core::missions::MissionLinkTable,
    key::{self, KeyFormatError},
    record::{MacroRecord, MacroValue},
    types::KeyString,
};

/// One listing row per decodable stored key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroRow {
    /// Stored key.
    pub key: KeyString,
    /// Decoded progress, `None` when not a number.
    pub progress: Option<u32>,
    /// Decoded max quality, `None` when not a number.
    pub max_quality: Option<u32>,
    /// Decoded initial quality, `None` when not a number.
    pub initial_quality: Option<u32>,
    /// Decoded durability, `None` when not a number.
    pub durability: Option<u32>,
    /// Food buff, empty for legacy values.
    pub food: String,
    /// Memo, empty for legacy values.
    pub memo: String,
    /// Master potion flag.
    pub master_potion: bool,
    /// Missions linked to exactly this key.
    pub mission_count: usize,
}

/// Listing result: decodable rows plus the keys that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroListing {
    /// Rows in storage order.
    pub rows: Vec<MacroRow>,
    /// Keys that failed to decode, in storage order.
    pub skipped: Vec<KeyFormatError>,
}

/// Outcome of [`MacroStore::normalize_keys`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMigration {
    /// `(old, canonical)` pairs that were renamed.
    pub renamed: Vec<(KeyString, KeyString)>,
    /// `(kept, canonical)` pairs left alone because the canonical key was taken.
    pub conflicts: Vec<(KeyString, KeyString)>,
}

/// Authoritative key to macro map.
///
/// Writes and deletes use the exact key string. Reads fall back to the
/// historical spellings of the same logical key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MacroStore {
    macros: IndexMap<KeyString, MacroValue>,
}

impl MacroStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing key to value map.
    pub fn from_map(macros: IndexMap<KeyString, MacroValue>) -> Self {
        Self { macros }
    }

    /// Stored values in insertion order.
    pub fn as_map(&self) -> &IndexMap<KeyString, MacroValue> {
        &self.macros
    }

    /// Consumes the store, returning the map.
    pub fn into_map(self) -> IndexMap<KeyString, MacroValue> {
        self.macros
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// True when `key` is stored verbatim.
    pub fn contains_exact(&self, key: &str) -> bool {
        self.macros.contains_key(key)
    }

    /// Value stored verbatim at `key`.
    pub fn get_exact(&self, key: &str) -> Option<&MacroValue> {
        self.macros.get(key)
    }

    /// Stored key that a read of `key` lands on.
    ///
    /// Tries `key` verbatim, then the ten historical spellings of its
    /// decoded fields. Keys with non-numeric fields only match verbatim.
    pub fn resolve(&self, key: &str) -> Option<&str> {
        if let Some((stored, _)) = self.macros.get_key_value(key) {
            return Some(stored.as_str());
        }

        let parsed = key::decode(key).ok()?.to_key()?;
        key::lookup_variants(&parsed)
            .into_iter()
            .find_map(|variant| self.macros.get_key_value(&variant))
            .map(|(stored, _)| stored.as_str())
    }

    /// Record at the key a read of `key` resolves to.
    pub fn get(&self, key: &str) -> Option<MacroRecord> {
        let stored = self.resolve(key)?;
        self.macros.get(stored).map(MacroValue::to_record)
    }

    /// Upserts at exactly `key`. Returns the replaced value, if any.
    pub fn set(&mut self, key: impl Into<KeyString>, record: MacroRecord) -> Option<MacroValue> {
        self.macros.insert(key.into(), MacroValue::Structured(record))
    }

    /// Removes exactly `key`. Mission links are left to the caller.
    pub fn remove(&mut self, key: &str) -> Option<MacroValue> {
        self.macros.shift_remove(key)
    }

    /// Removes every macro.
    pub fn clear(&mut self) {
        self.macros.clear();
    }

    /// One row per decodable key, with link counts from `links`.
    pub fn list(&self, links: &MissionLinkTable) -> MacroListing {
        let counts = links.counts();
        let mut listing = MacroListing::default();

        for (key, value) in &self.macros {
            let fields = match key::decode(key) {
                Ok(fields) => fields,
                Err(err) => {
                    warn!(key = %key, "skipping undecodable macro key");
                    listing.skipped.push(err);
                    continue;
                }
            };

            let (food, memo, master_potion) = match value {
                MacroValue::Legacy(_) => (String::new(), String::new(), false),
                MacroValue::Structured(rec) => (rec.food.clone(), rec.memo.clone(), rec.master_potion),
            };

            listing.rows.push(MacroRow {
                key: key.clone(),
                progress: fields.progress,
                max_quality: fields.max_quality,
                initial_quality: fields.initial_quality,
                durability: fields.durability,
                food,
                memo,
                master_potion,
                mission_count: counts.get(key.as_str()).copied().unwrap_or(0),
            });
        }

        listing
    }

    /// Renames every numeric non-canonical key to its canonical spelling.
    ///
    /// Storage order is kept. A key whose canonical spelling is already
    /// stored, or was claimed by an earlier variant, stays as it is.
    pub fn normalize_keys(&mut self) -> KeyMigration {
        let original: HashSet<KeyString> = self.macros.keys().cloned().collect();
        let mut claimed: HashSet<KeyString> = HashSet::new();
        let mut migration = KeyMigration::default();
        let mut out = IndexMap::with_capacity(self.macros.len());

        for (stored, value) in std::mem::take(&mut self.macros) {
            match key::canonical_form(&stored).filter(|c| *c != stored) {
                Some(canonical) if !original.contains(&canonical) && !claimed.contains(&canonical) => {
                    claimed.insert(canonical.clone());
                    migration.renamed.push((stored, canonical.clone()));
                    out.insert(canonical, value);
                }
                Some(canonical) => {
                    migration.conflicts.push((stored.clone(), canonical));
                    out.insert(stored, value);
                }
                None => {
                    out.insert(stored, value);
                }
            }
        }

        self.macros = out;
        migration
    }
}
