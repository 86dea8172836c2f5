use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::types::{KeyString, MissionName};

/// Mission name to macro key links.
///
/// Targets are soft references: nothing checks that the key exists, and
/// every key comparison here is strict string equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionLinkTable {
    links: IndexMap<MissionName, KeyString>,
}

impl MissionLinkTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing link map.
    pub fn from_map(links: IndexMap<MissionName, KeyString>) -> Self {
        Self { links }
    }

    /// Links in insertion order.
    pub fn as_map(&self) -> &IndexMap<MissionName, KeyString> {
        &self.links
    }

    /// Consumes the table, returning the link map.
    pub fn into_map(self) -> IndexMap<MissionName, KeyString> {
        self.links
    }

    /// Links `name` to `macro_key`, replacing any previous target.
    /// Returns the previous target.
    pub fn link(&mut self, name: impl Into<MissionName>, macro_key: impl Into<KeyString>) -> Option<KeyString> {
        self.links.insert(name.into(), macro_key.into())
    }

    /// Removes the link for `name`, returning its target.
    pub fn unlink(&mut self, name: &str) -> Option<KeyString> {
        self.links.shift_remove(name)
    }

    /// Target of `name`, if linked.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.links.get(name).map(String::as_str)
    }

    /// Number of links.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// True when no mission is linked.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Number of missions linked to exactly `macro_key`.
    pub fn count_for(&self, macro_key: &str) -> usize {
        self.links.values().filter(|k| *k == macro_key).count()
    }

    /// Link counts for every target in one pass.
    pub fn counts(&self) -> HashMap<&str, usize> {
        let mut out = HashMap::new();
        for key in self.links.values() {
            *out.entry(key.as_str()).or_insert(0) += 1;
        }
        out
    }

    /// Names of missions linked to exactly `macro_key`, in link order.
    pub fn missions_for(&self, macro_key: &str) -> Vec<&str> {
        self.links
            .iter()
            .filter(|(_, k)| *k == macro_key)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Removes every link targeting exactly `macro_key`; returns the removed names.
    pub fn remove_targeting(&mut self, macro_key: &str) -> Vec<MissionName> {
        let removed: Vec<MissionName> = self
            .links
            .iter()
            .filter(|(_, k)| *k == macro_key)
            .map(|(name, _)| name.clone())
            .collect();
        self.links.retain(|_, k| k.as_str() != macro_key);
        removed
    }

    /// Points every link at `from` to `to`.
    pub fn retarget(&mut self, from: &str, to: &str) -> usize {
        let mut changed = 0;
        for key in self.links.values_mut() {
            if key.as_str() == from {
                *key = to.to_string();
                changed += 1;
            }
        }
        changed
    }

    /// Case-insensitive substring search on mission names, ordered by name.
    /// A blank query matches every link.
    pub fn search(&self, query: &str) -> Vec<(&str, &str)> {
        let needle = query.trim().to_lowercase();
        let mut out: Vec<(&str, &str)> = self
            .links
            .iter()
            .filter(|(name, _)| needle.is_empty() || name.to_lowercase().contains(&needle))
            .map(|(name, key)| (name.as_str(), key.as_str()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0));
        out
    }
}
