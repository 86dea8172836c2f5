use std::collections::BTreeMap;

use proptest::prelude::*;

use craftmacro::{
    core::registry::Registry,
    key::{self, Grade},
    record::MacroRecord,
};

#[derive(Debug, Clone)]
enum Action {
    Set { key_idx: u8, text: u8 },
    Link { mission_idx: u8, key_idx: u8 },
    Unlink { mission_idx: u8 },
    Delete { key_idx: u8 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..12, 0u8..8).prop_map(|(key_idx, text)| Action::Set { key_idx, text }),
        (0u8..10, 0u8..12).prop_map(|(mission_idx, key_idx)| Action::Link { mission_idx, key_idx }),
        (0u8..10).prop_map(|mission_idx| Action::Unlink { mission_idx }),
        (0u8..12).prop_map(|key_idx| Action::Delete { key_idx }),
    ]
}

/// Twelve key spellings covering three logical macros.
fn key_for(idx: u8) -> String {
    let logical = u32::from(idx % 3);
    let base = key::encode(100 + logical, 200, 0, 40);
    match idx / 3 {
        0 => base,
        1 => format!("{base}{}", Grade::A.suffix()),
        2 => format!("{}-200-40", 100 + logical),
        _ => format!("{}-200-40{}", 100 + logical, Grade::D.suffix()),
    }
}

fn mission_for(idx: u8) -> String {
    format!("mission-{idx}")
}

proptest! {
    #[test]
    fn registry_matches_exact_key_model(actions in prop::collection::vec(action_strategy(), 1..120)) {
        let mut registry = Registry::in_memory();
        let mut macros = BTreeMap::<String, String>::new();
        let mut links = BTreeMap::<String, String>::new();

        for action in actions {
            match action {
                Action::Set { key_idx, text } => {
                    let k = key_for(key_idx);
                    let text = format!("text-{text}");
                    registry.set_macro(k.clone(), MacroRecord::from_text(text.clone()));
                    macros.insert(k, text);
                }
                Action::Link { mission_idx, key_idx } => {
                    let name = mission_for(mission_idx);
                    let k = key_for(key_idx);
                    registry.link_mission(&name, k.clone()).unwrap();
                    links.insert(name, k);
                }
                Action::Unlink { mission_idx } => {
                    let name = mission_for(mission_idx);
                    prop_assert_eq!(registry.unlink_mission(&name), links.remove(&name));
                }
                Action::Delete { key_idx } => {
                    let k = key_for(key_idx);
                    let deletion = registry.delete_macro(&k);
                    if macros.remove(&k).is_some() {
                        let before = links.len();
                        links.retain(|_, target| *target != k);
                        prop_assert_eq!(deletion.unlinked.len(), before - links.len());
                        prop_assert_eq!(registry.missions().count_for(&k), 0);
                    } else {
                        prop_assert!(deletion.removed.is_none());
                        prop_assert!(deletion.unlinked.is_empty());
                    }
                }
            }

            prop_assert_eq!(registry.macros().len(), macros.len());
            prop_assert_eq!(registry.missions().len(), links.len());
            for (k, text) in &macros {
                prop_assert_eq!(registry.macros().get_exact(k).map(|v| v.text()), Some(text.as_str()));
            }
            for (name, target) in &links {
                prop_assert_eq!(registry.missions().get(name), Some(target.as_str()));
            }
        }

        let exported = registry.export_snapshot().unwrap();
        let mut restored = Registry::in_memory();
        restored.import_snapshot(&exported).unwrap();
        prop_assert!(restored.snapshot().same_data(&registry.snapshot()));
    }

    #[test]
    fn fuzzy_read_finds_any_single_spelling(idx in 0u8..12, text in "[a-z]{1,12}") {
        let mut registry = Registry::in_memory();
        registry.set_macro(key_for(idx), MacroRecord::from_text(text.clone()));

        let canonical = key::encode(100 + u32::from(idx % 3), 200, 0, 40);
        prop_assert_eq!(registry.get_macro(&canonical).map(|r| r.text), Some(text));
    }
}
