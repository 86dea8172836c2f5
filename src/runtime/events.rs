//! Runtime event stream payloads.

use crate::types::{KeyString, MissionName, Notice};

/// Events emitted from the single-writer runtime loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A macro was stored.
    MacroSaved {
        /// Exact key written.
        key: KeyString,
    },
    /// A macro was deleted.
    MacroDeleted {
        /// Exact key removed.
        key: KeyString,
        /// Missions removed by the cascade.
        unlinked: Vec<MissionName>,
    },
    /// A mission was linked or relinked.
    MissionLinked {
        /// Mission name.
        name: MissionName,
        /// Target key.
        key: KeyString,
    },
    /// A mission link was removed.
    MissionUnlinked {
        /// Mission name.
        name: MissionName,
    },
    /// The registry was replaced by an import.
    Imported {
        /// Imported macro count.
        macros: usize,
        /// Imported mission count.
        missions: usize,
    },
    /// Legacy keys were rewritten to canonical form.
    KeysNormalized {
        /// Number of renamed keys.
        renamed: usize,
    },
    /// The registry and its stored blob were cleared.
    Cleared,
    /// A non-fatal notice from the registry.
    Notice(Notice),
}
