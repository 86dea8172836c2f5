//! Shared aliases and the non-fatal notice model.

/// Stored macro key string, exactly as written.
pub type KeyString = String;
/// Mission name.
pub type MissionName = String;

/// Non-fatal condition surfaced to the presentation layer.
///
/// Every notice is also logged through `tracing`; the registry queues them
/// until the caller drains them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A stored key could not be decoded and was left out of a listing.
    UndecodableKey {
        /// Offending key.
        key: KeyString,
    },
    /// Writing the snapshot to the storage medium failed.
    AutosaveFailed {
        /// Underlying error text.
        reason: String,
    },
    /// The stored snapshot could not be read; the registry started empty.
    LoadFallback {
        /// Underlying error text.
        reason: String,
    },
    /// A cached snapshot was restored at startup.
    Restored {
        /// Number of macros restored.
        macros: usize,
        /// Number of mission links restored.
        missions: usize,
    },
    /// Removing the stored blob failed; the registry was left untouched.
    ClearFailed {
        /// Underlying error text.
        reason: String,
    },
    /// Key normalization found a canonical key already taken.
    MigrationConflict {
        /// Key left in place.
        key: KeyString,
        /// Canonical key that was already present.
        canonical: KeyString,
    },
}
