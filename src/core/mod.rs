//! In-memory registry state.

/// Mission name to macro key links.
pub mod missions;
/// Registry aggregate with write-through persistence.
pub mod registry;
/// Macro record store with fuzzy key resolution.
pub mod store;
