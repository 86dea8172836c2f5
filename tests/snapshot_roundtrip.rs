use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tempfile::TempDir;

use craftmacro::{
    core::registry::{Registry, RegistryConfig},
    persist::{
        memory::MemoryBlobStore,
        snapshot::parse_snapshot,
        sqlite::SqliteBlobStore,
        BlobStore, PersistError, PersistResult, DEFAULT_BLOB_NAME,
    },
    record::{MacroRecord, MacroValue},
    types::Notice,
};

/// Medium whose writes and removals fail while `failing` is set.
struct FlakyStore {
    inner: MemoryBlobStore,
    failing: Arc<AtomicBool>,
}

impl BlobStore for FlakyStore {
    fn get(&self, name: &str) -> PersistResult<Option<String>> {
        self.inner.get(name)
    }

    fn set(&mut self, name: &str, value: &str) -> PersistResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistError::Message("quota exceeded".to_string()));
        }
        self.inner.set(name, value)
    }

    fn remove(&mut self, name: &str) -> PersistResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistError::Message("storage locked".to_string()));
        }
        self.inner.remove(name)
    }
}

fn populated() -> Registry {
    let mut registry = Registry::in_memory();
    registry.set_macro(
        "10-20-0-5",
        MacroRecord {
            text: "action1\naction2".to_string(),
            food: "food".to_string(),
            memo: "memo".to_string(),
            master_potion: true,
        },
    );
    registry.set_macro("11-20-0-5-A급", MacroRecord::from_text("graded"));
    registry.link_mission("alpha", "10-20-0-5").unwrap();
    registry.link_mission("beta", "11-20-0-5-A급").unwrap();
    registry
}

#[test]
fn export_then_import_reproduces_registry() {
    let original = populated();
    let exported = original.export_snapshot().unwrap();

    let mut other = Registry::in_memory();
    other.set_macro("99-99-0-9", MacroRecord::from_text("replaced"));
    other.import_snapshot(&exported).unwrap();

    assert!(other.snapshot().same_data(&original.snapshot()));
    assert_eq!(other.get_macro("99-99-0-9"), None);
    assert_eq!(other.get_macro("11-20-0-5").unwrap().text, "graded");
}

#[test]
fn legacy_values_survive_round_trip_verbatim() {
    let raw = r#"{"macros":{"10-20-5":"old text","10-20-0-5":{"text":"new"}},"missions":{"m":"10-20-5"}}"#;
    let mut registry = Registry::in_memory();
    registry.import_snapshot(raw).unwrap();

    assert_eq!(
        registry.macros().get_exact("10-20-5"),
        Some(&MacroValue::Legacy("old text".to_string()))
    );
    assert!(registry.macros().get_exact("10-20-0-5").is_some_and(|v| !v.is_legacy()));
    assert_eq!(registry.get_macro("10-20-0-5").unwrap(), MacroRecord::from_text("new"));

    let exported = registry.export_snapshot().unwrap();
    let reparsed = parse_snapshot(&exported).unwrap();
    assert!(reparsed.same_data(&registry.snapshot()));
    assert!(exported.contains("\"10-20-5\": \"old text\""));
}

#[test]
fn malformed_import_leaves_registry_untouched() {
    let mut registry = populated();
    let before = registry.snapshot();

    let err = registry.import_snapshot("{not json").unwrap_err();
    assert!(!err.message.is_empty());
    assert_eq!(registry.snapshot(), before);
}

#[test]
fn staged_import_mutates_nothing_until_committed() {
    let mut registry = populated();
    let before = registry.snapshot();

    let pending = Registry::stage_import(r#"{"macros":{},"missions":{}}"#).unwrap();
    assert_eq!(pending.macro_count(), 0);
    assert_eq!(registry.snapshot(), before);

    drop(pending);
    assert_eq!(registry.snapshot(), before);

    let pending = Registry::stage_import(r#"{"macros":{},"missions":{}}"#).unwrap();
    registry.commit_import(pending);
    assert!(registry.macros().is_empty());
    assert!(registry.missions().is_empty());
}

#[test]
fn missing_blob_loads_empty_without_notice() {
    let mut registry = Registry::load(Box::new(MemoryBlobStore::new()), RegistryConfig::default());
    assert!(registry.macros().is_empty());
    assert!(registry.drain_notices().is_empty());
    assert_eq!(registry.cache_info(), None);
}

#[test]
fn corrupt_blob_loads_empty_with_notice() {
    let medium = MemoryBlobStore::with_blob(DEFAULT_BLOB_NAME, "{\"macros\": [");
    let mut registry = Registry::load(Box::new(medium), RegistryConfig::default());
    assert!(registry.macros().is_empty());
    assert!(matches!(
        registry.drain_notices().as_slice(),
        [Notice::LoadFallback { .. }]
    ));
}

#[test]
fn stored_blob_is_restored_at_load() {
    let raw = r#"{"macros":{"10-20-0-5":"text"},"missions":{"m":"10-20-0-5"},"savedAt":"2024-05-01T12:00:00.000Z"}"#;
    let medium = MemoryBlobStore::with_blob(DEFAULT_BLOB_NAME, raw);
    let mut registry = Registry::load(Box::new(medium), RegistryConfig::default());

    assert_eq!(registry.get_macro("10-20-0-5").unwrap().text, "text");
    assert!(registry.saved_at().is_some());
    assert_eq!(
        registry.drain_notices(),
        vec![Notice::Restored {
            macros: 1,
            missions: 1
        }]
    );

    let info = registry.cache_info().unwrap();
    assert_eq!((info.macros, info.missions, info.size), (1, 1, raw.len()));
}

#[test]
fn unparseable_saved_at_does_not_discard_the_blob() {
    let raw = r#"{"macros":{"10-20-0-5":"text"},"missions":{"m":"10-20-0-5"},"savedAt":"5/1/2024, 12:00:00 PM"}"#;
    let medium = MemoryBlobStore::with_blob(DEFAULT_BLOB_NAME, raw);
    let mut registry = Registry::load(Box::new(medium), RegistryConfig::default());

    assert_eq!(registry.get_macro("10-20-0-5").unwrap().text, "text");
    assert_eq!(registry.saved_at(), None);
    assert!(matches!(
        registry.drain_notices().as_slice(),
        [Notice::Restored { macros: 1, missions: 1 }]
    ));

    let mut other = Registry::in_memory();
    other.import_snapshot(raw).unwrap();
    assert_eq!(other.missions().get("m"), Some("10-20-0-5"));

    let numeric = r#"{"macros":{"1-2-0-3":"x"},"savedAt":1714564800000}"#;
    let snapshot = parse_snapshot(numeric).unwrap();
    assert_eq!(snapshot.saved_at, None);
    assert_eq!(snapshot.macros.len(), 1);
}

#[test]
fn null_record_fields_read_as_defaults() {
    let raw = r#"{"macros":{"10-20-0-5":{"text":"a","food":null,"memo":"m","masterPotion":null}},"missions":{}}"#;
    let mut registry = Registry::in_memory();
    registry.import_snapshot(raw).unwrap();

    assert_eq!(
        registry.get_macro("10-20-0-5").unwrap(),
        MacroRecord {
            text: "a".to_string(),
            food: String::new(),
            memo: "m".to_string(),
            master_potion: false,
        }
    );

    let medium = MemoryBlobStore::with_blob(DEFAULT_BLOB_NAME, raw);
    let registry = Registry::load(Box::new(medium), RegistryConfig::default());
    assert_eq!(registry.macros().len(), 1);
}

#[test]
fn written_blob_carries_the_save_stamp() {
    let mut registry = populated();
    assert!(registry.save());

    let blob = registry.export_snapshot().unwrap();
    let parsed = parse_snapshot(&blob).unwrap();
    assert!(parsed.same_data(&registry.snapshot()));
    assert_eq!(parsed.saved_at, registry.saved_at());

    let info = registry.cache_info().unwrap();
    assert_eq!(info.saved_at, registry.saved_at());
    assert_eq!(info.macros, registry.macros().len());
}

#[test]
fn failed_clear_keeps_registry_intact() {
    let failing = Arc::new(AtomicBool::new(false));
    let medium = FlakyStore {
        inner: MemoryBlobStore::new(),
        failing: Arc::clone(&failing),
    };
    let mut registry = Registry::load(Box::new(medium), RegistryConfig::default());
    registry.set_macro("10-20-0-5", MacroRecord::from_text("kept"));
    registry.link_mission("m", "10-20-0-5").unwrap();
    let before = registry.snapshot();

    failing.store(true, Ordering::SeqCst);
    assert!(!registry.clear());
    assert_eq!(registry.snapshot(), before);
    assert_eq!(registry.cache_info().unwrap().macros, 1);
    assert!(matches!(
        registry.drain_notices().as_slice(),
        [Notice::ClearFailed { reason }] if reason == "storage locked"
    ));

    failing.store(false, Ordering::SeqCst);
    assert!(registry.clear());
    assert!(registry.macros().is_empty());
    assert_eq!(registry.cache_info(), None);
}

#[test]
fn normalize_on_load_rewrites_legacy_keys() {
    let raw = r#"{"macros":{"10-20-5-B급":"text"},"missions":{"m":"10-20-5-B급"}}"#;
    let medium = MemoryBlobStore::with_blob(DEFAULT_BLOB_NAME, raw);
    let config = RegistryConfig {
        normalize_keys_on_load: true,
        ..RegistryConfig::default()
    };
    let registry = Registry::load(Box::new(medium), config);

    assert!(registry.macros().contains_exact("10-20-0-5"));
    assert_eq!(registry.missions().get("m"), Some("10-20-0-5"));
}

#[test]
fn failed_autosave_keeps_memory_state_and_reports() {
    let failing = Arc::new(AtomicBool::new(true));
    let medium = FlakyStore {
        inner: MemoryBlobStore::new(),
        failing: Arc::clone(&failing),
    };
    let mut registry = Registry::load(Box::new(medium), RegistryConfig::default());

    registry.set_macro("10-20-0-5", MacroRecord::from_text("kept"));
    assert_eq!(registry.get_macro("10-20-0-5").unwrap().text, "kept");
    assert_eq!(registry.saved_at(), None);
    assert!(matches!(
        registry.drain_notices().as_slice(),
        [Notice::AutosaveFailed { reason }] if reason == "quota exceeded"
    ));

    failing.store(false, Ordering::SeqCst);
    assert!(registry.save());
    assert!(registry.saved_at().is_some());
    assert_eq!(registry.cache_info().unwrap().macros, 1);
}

#[test]
fn sqlite_medium_persists_across_reopen() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("macros.db");

    {
        let medium = SqliteBlobStore::open(&db_path).expect("open sqlite");
        let mut registry = Registry::load(Box::new(medium), RegistryConfig::default());
        registry.set_macro("10-20-0-5", MacroRecord::from_text("persisted"));
        registry.link_mission("m", "10-20-0-5").unwrap();
    }

    let medium = SqliteBlobStore::open(&db_path).expect("reopen");
    assert!(medium.updated_ms(DEFAULT_BLOB_NAME).expect("updated").is_some());
    let mut registry = Registry::load(Box::new(medium), RegistryConfig::default());
    assert_eq!(registry.get_macro("10-20-0-5").unwrap().text, "persisted");
    assert_eq!(registry.count_links("10-20-0-5"), 1);

    assert!(registry.clear());
    assert!(registry.macros().is_empty());
    assert_eq!(registry.cache_info(), None);
}
