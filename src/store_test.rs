use super::*;

fn sample() -> PersistedToken {
    PersistedToken { auth_token: "tok-abc".into(), token_expiry: 1_700_000_000_000 }
}

// =============================================================================
// FileTokenStore
// =============================================================================

#[test]
fn file_store_missing_file_loads_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path());
    assert_eq!(store.load(), None);
}

#[test]
fn file_store_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(&dir.path().join("nested").join("state"));
    store.save(&sample()).unwrap();
    assert_eq!(store.load(), Some(sample()));
}

#[test]
fn file_store_uses_stable_key_names() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path());
    store.save(&sample()).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(raw["auth_token"], "tok-abc");
    assert_eq!(raw["token_expiry"], 1_700_000_000_000_u64);
}

#[test]
fn file_store_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path());
    store.save(&sample()).unwrap();
    let newer = PersistedToken { auth_token: "tok-new".into(), token_expiry: 5 };
    store.save(&newer).unwrap();
    assert_eq!(store.load(), Some(newer));
}

#[test]
fn file_store_clear_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path());
    store.save(&sample()).unwrap();
    store.clear().unwrap();
    store.clear().unwrap();
    assert_eq!(store.load(), None);
    assert!(!store.path().exists());
}

#[test]
fn file_store_corrupt_file_loads_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path());
    fs::write(store.path(), "{ not json").unwrap();
    assert_eq!(store.load(), None);
}

#[test]
fn file_store_half_written_pair_loads_none() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path());
    fs::write(store.path(), r#"{"auth_token":"tok"}"#).unwrap();
    assert_eq!(store.load(), None);
}

#[cfg(unix)]
#[test]
fn file_store_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;
    let dir = tempfile::tempdir().unwrap();
    let store = FileTokenStore::new(dir.path());
    store.save(&sample()).unwrap();
    let mode = fs::metadata(store.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

// =============================================================================
// MemoryTokenStore
// =============================================================================

#[test]
fn memory_store_round_trip_and_clear() {
    let store = MemoryTokenStore::new();
    assert_eq!(store.load(), None);
    store.save(&sample()).unwrap();
    assert_eq!(store.load(), Some(sample()));
    store.clear().unwrap();
    assert_eq!(store.load(), None);
}

#[test]
fn memory_store_seeded() {
    let store = MemoryTokenStore::with_token(sample());
    assert_eq!(store.load(), Some(sample()));
}
