use picker_core::{
    KvRepository, LoadOutcome, MemoryKvRepository, Store, StoreConfig, CURRENT_VERSION,
};
use serde_json::{json, Value};

const KEY: &str = "rsp:data";

fn stored_json(repo: &MemoryKvRepository) -> Value {
    let raw = repo.get_item(KEY).unwrap().expect("record should be persisted");
    serde_json::from_str(&raw).unwrap()
}

#[test]
fn first_load_creates_single_default_group() {
    let repo = MemoryKvRepository::new();
    let store = Store::new(&repo, StoreConfig::default());

    let (root, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Fresh);
    assert_eq!(root.version, CURRENT_VERSION);
    assert_eq!(root.groups.len(), 1);

    let group = root.current_group().expect("current group should resolve");
    assert_eq!(group.title, "Default Group");
    assert_eq!(group.cycles, 1);
    assert!(group.students.is_empty());
    assert!(group.history.is_empty());

    let persisted = stored_json(&repo);
    assert_eq!(persisted["currentGroupId"], json!(root.current_group_id));
}

#[test]
fn load_is_idempotent_once_fresh_root_exists() {
    let repo = MemoryKvRepository::new();
    let store = Store::new(&repo, StoreConfig::default());

    let first = store.load().unwrap();
    let (second, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Current);
    assert_eq!(first, second);
}

#[test]
fn flat_version_one_record_migrates_into_one_group() {
    let repo = MemoryKvRepository::with_item(
        KEY,
        r#"{"students":[{"id":"a","name":"Al","picks":[]}],"history":[]}"#,
    );
    let store = Store::new(&repo, StoreConfig::default());

    let (root, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Migrated);
    assert_eq!(root.version, CURRENT_VERSION);
    assert_eq!(root.groups.len(), 1);

    let group = root.current_group().unwrap();
    assert_eq!(group.cycles, 1);
    assert_eq!(group.title, "Default Group");
    assert_eq!(group.students.len(), 1);
    assert_eq!(group.students[0].id, "a");
    assert_eq!(group.students[0].name, "Al");

    let persisted = stored_json(&repo);
    assert_eq!(persisted["version"], 5);
    assert!(persisted.get("students").is_none());
}

#[test]
fn explicit_version_one_keeps_history() {
    let repo = MemoryKvRepository::with_item(
        KEY,
        r#"{"version":1,"students":[{"id":"a","name":"Al","picks":[10]}],
            "history":[{"id":"a","name":"Al","timestamp":10}]}"#,
    );
    let store = Store::new(&repo, StoreConfig::default());

    let group = store.current_group().unwrap().unwrap();
    assert_eq!(group.students[0].picks, vec![10]);
    assert_eq!(group.history.len(), 1);
    assert_eq!(group.history[0].timestamp, 10);
}

#[test]
fn version_three_group_without_cycles_gets_one_cycle() {
    let raw = json!({
        "groups": {
            "g1": {
                "id": "g1",
                "title": "Period 3",
                "students": [{"id": "s1", "name": "Bea", "picks": [5, 6]}],
                "history": [{"id": "s1", "name": "Bea", "timestamp": 6}]
            },
            "g2": {"id": "g2", "title": "Period 4", "cycles": 3, "students": [], "history": []}
        },
        "currentGroupId": "g1",
        "version": 3
    });
    let repo = MemoryKvRepository::with_item(KEY, raw.to_string());
    let store = Store::new(&repo, StoreConfig::default());

    let (root, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Migrated);
    assert_eq!(root.version, CURRENT_VERSION);
    assert_eq!(root.current_group_id, "g1");

    let migrated = &root.groups["g1"];
    assert_eq!(migrated.cycles, 1);
    assert_eq!(migrated.title, "Period 3");
    assert_eq!(migrated.students[0].picks, vec![5, 6]);
    assert_eq!(migrated.history[0].name, "Bea");
    assert_eq!(root.groups["g2"].cycles, 3);

    assert_eq!(stored_json(&repo)["groups"]["g1"]["cycles"], 1);
}

#[test]
fn version_two_and_four_groups_without_cycles_get_one_cycle() {
    for version in [2, 4] {
        let raw = json!({
            "groups": {
                "g1": {"id": "g1", "title": "Art", "students": [], "history": []},
                "g2": {"id": "g2", "title": "Math", "cycles": 2, "students": [], "history": []}
            },
            "currentGroupId": "g2",
            "version": version
        });
        let repo = MemoryKvRepository::with_item(KEY, raw.to_string());
        let store = Store::new(&repo, StoreConfig::default());

        let (root, outcome) = store.load_with_outcome().unwrap();
        assert_eq!(outcome, LoadOutcome::Migrated, "version {version}");
        assert_eq!(root.version, CURRENT_VERSION);
        assert_eq!(root.groups["g1"].cycles, 1);
        assert_eq!(root.groups["g2"].cycles, 2);
        assert_eq!(root.current_group_id, "g2");

        let persisted = stored_json(&repo);
        assert_eq!(persisted["version"], 5);
        assert_eq!(persisted["groups"]["g1"]["cycles"], 1);
    }
}

#[test]
fn version_zero_is_wrapped_like_a_flat_record() {
    let repo = MemoryKvRepository::with_item(
        KEY,
        r#"{"version":0,"students":[{"id":"z","name":"Zoe","picks":[]}],"history":[]}"#,
    );
    let store = Store::new(&repo, StoreConfig::default());

    let (root, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Migrated);
    assert_eq!(root.version, CURRENT_VERSION);
    let group = root.current_group().unwrap();
    assert_eq!(group.title, "Default Group");
    assert_eq!(group.cycles, 1);
    assert_eq!(group.students[0].name, "Zoe");
}

#[test]
fn newer_version_is_preserved_without_rewrite() {
    let raw = json!({
        "groups": {"g1": {"id": "g1", "title": "Later", "cycles": 2, "students": [], "history": []}},
        "currentGroupId": "g1",
        "version": 7
    })
    .to_string();
    let repo = MemoryKvRepository::with_item(KEY, raw.clone());
    let store = Store::new(&repo, StoreConfig::default());

    let (root, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Current);
    assert_eq!(root.version, 7);
    assert_eq!(root.groups["g1"].title, "Later");
    assert_eq!(repo.get_item(KEY).unwrap(), Some(raw));
}

#[test]
fn current_version_group_with_invalid_cycles_is_clamped_not_reset() {
    for bad_cycles in [json!(-1), json!(null), json!(1.5)] {
        let raw = json!({
            "groups": {
                "g1": {
                    "id": "g1",
                    "title": "Period 1",
                    "cycles": bad_cycles,
                    "students": [{"id": "s", "name": "Ann", "picks": [1]}],
                    "history": [{"id": "s", "name": "Ann", "timestamp": 1}]
                }
            },
            "currentGroupId": "g1",
            "version": 5
        });
        let repo = MemoryKvRepository::with_item(KEY, raw.to_string());
        let store = Store::new(&repo, StoreConfig::default());

        let (root, outcome) = store.load_with_outcome().unwrap();
        assert_eq!(outcome, LoadOutcome::Repaired, "cycles {bad_cycles}");
        assert_eq!(root.current_group_id, "g1");
        let group = &root.groups["g1"];
        assert_eq!(group.cycles, 1);
        assert_eq!(group.students[0].name, "Ann");
        assert_eq!(group.history.len(), 1);

        assert_eq!(stored_json(&repo)["groups"]["g1"]["cycles"], 1);
    }
}

#[test]
fn unmodeled_fields_survive_migration_rewrite() {
    let raw = json!({
        "groups": {
            "g1": {
                "id": "g1",
                "title": "P1",
                "color": "red",
                "students": [{"id": "s", "name": "Ann", "picks": [], "seat": 4}],
                "history": []
            }
        },
        "currentGroupId": "g1",
        "version": 3,
        "theme": "dark"
    });
    let repo = MemoryKvRepository::with_item(KEY, raw.to_string());
    let store = Store::new(&repo, StoreConfig::default());

    let (_, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Migrated);

    let persisted = stored_json(&repo);
    assert_eq!(persisted["theme"], "dark");
    assert_eq!(persisted["groups"]["g1"]["color"], "red");
    assert_eq!(persisted["groups"]["g1"]["students"][0]["seat"], 4);
    assert_eq!(persisted["groups"]["g1"]["cycles"], 1);
    assert_eq!(persisted["version"], 5);

    assert!(store.rename_group("g1", "P2").unwrap());
    let persisted = stored_json(&repo);
    assert_eq!(persisted["theme"], "dark");
    assert_eq!(persisted["groups"]["g1"]["color"], "red");
}

#[test]
fn stale_current_group_id_is_repaired() {
    let raw = json!({
        "groups": {"g1": {"id": "g1", "title": "Only", "cycles": 2, "students": [], "history": []}},
        "currentGroupId": "gone",
        "version": 5
    });
    let repo = MemoryKvRepository::with_item(KEY, raw.to_string());
    let store = Store::new(&repo, StoreConfig::default());

    let (root, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Repaired);
    assert_eq!(root.current_group_id, "g1");
    assert_eq!(stored_json(&repo)["currentGroupId"], "g1");
}

#[test]
fn missing_groups_are_replaced_by_default_group() {
    let repo = MemoryKvRepository::with_item(KEY, r#"{"version":4}"#);
    let store = Store::new(&repo, StoreConfig::default());

    let root = store.load().unwrap();
    assert_eq!(root.groups.len(), 1);
    assert!(root.current_group().is_some());
}

#[test]
fn corrupt_record_resets_and_persists_fresh_root() {
    let repo = MemoryKvRepository::with_item(KEY, "{definitely not json");
    let store = Store::new(&repo, StoreConfig::default());

    let (root, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Reset);
    assert_eq!(root.groups.len(), 1);
    assert_eq!(root.current_group().unwrap().title, "Default Group");

    let persisted = stored_json(&repo);
    assert_eq!(persisted["version"], 5);
}

#[test]
fn wrongly_typed_record_resets() {
    let repo = MemoryKvRepository::with_item(
        KEY,
        r#"{"groups":{"g":{"id":"g","students":"nope"}},"currentGroupId":"g","version":5}"#,
    );
    let store = Store::new(&repo, StoreConfig::default());

    let (_, outcome) = store.load_with_outcome().unwrap();
    assert_eq!(outcome, LoadOutcome::Reset);
}

#[test]
fn custom_storage_key_and_title_are_honored() {
    let repo = MemoryKvRepository::new();
    let config = StoreConfig {
        storage_key: "picker:test".to_string(),
        default_group_title: "Homeroom".to_string(),
        ..StoreConfig::default()
    };
    let store = Store::new(&repo, config);

    let group = store.current_group().unwrap().unwrap();
    assert_eq!(group.title, "Homeroom");
    assert!(repo.get_item("picker:test").unwrap().is_some());
    assert!(repo.get_item(KEY).unwrap().is_none());
}
