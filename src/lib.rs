//! Local registry of crafting macros keyed by crafting parameters, with
//! mission links and snapshot persistence.
//!
//! # Examples
//!
//! In-memory usage with [`core::registry::Registry`]:
//! ```
//! use craftmacro::{core::registry::Registry, key, record::MacroRecord};
//!
//! let mut registry = Registry::in_memory();
//! let k = key::encode(10, 20, 0, 5);
//! registry.set_macro(k.clone(), MacroRecord::from_text("/ac Reflect <wait.3>"));
//! registry.link_mission("Ocean survey", k.clone()).expect("link");
//!
//! // Grade-suffixed and legacy spellings resolve to the same macro on read.
//! assert!(registry.get_macro("10-20-0-5-A급").is_some());
//!
//! // Deleting cascades to links that target the exact key.
//! let deletion = registry.delete_macro(&k);
//! assert_eq!(deletion.unlinked, vec!["Ocean survey".to_string()]);
//! ```
//!
//! Runtime usage with a SQLite medium:
//! ```no_run
//! use craftmacro::{
//!     core::registry::{Registry, RegistryConfig},
//!     key::MacroKey,
//!     persist::sqlite::SqliteBlobStore,
//!     record::MacroRecord,
//!     runtime::handle::{spawn_registry, RuntimeConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let medium = SqliteBlobStore::open("macros.db").expect("open sqlite");
//! let registry = Registry::load(Box::new(medium), RegistryConfig::default());
//! let handle = spawn_registry(registry, RuntimeConfig::default());
//! let key = MacroKey { progress: 10, max_quality: 20, initial_quality: 0, durability: 5 };
//! handle.save(key, MacroRecord::from_text("/ac Reflect <wait.3>")).await.expect("save");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![warn(missing_docs)]

/// Registry state: record store, mission links and the aggregate.
pub mod core;
/// Composite macro key codec.
pub mod key;
/// Crafting-parameter input validation.
pub mod params;
/// Snapshot persistence and storage media.
pub mod persist;
/// Listing sort and filter.
pub mod query;
/// Macro record shapes.
pub mod record;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Shared aliases and notices.
pub mod types;
