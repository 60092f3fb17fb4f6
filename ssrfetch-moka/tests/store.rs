//! Tests for the Moka cache store.

use pretty_assertions::assert_eq;
use serde_json::json;
use ssrfetch_core::{
    ApiResponse, CacheEntry, CacheStore, DependencyKey, ErrorEnvelope, RequestDescriptor,
    ResponseEnvelope,
};
use ssrfetch_moka::{EvictionPolicy, MokaStore, MokaStoreBuilder};

fn make_key(id: u32) -> DependencyKey {
    RequestDescriptor::from(format!("/items/{id}")).key().unwrap()
}

fn make_entry(id: u32) -> CacheEntry {
    CacheEntry::success(ApiResponse::Single(ResponseEnvelope::ok(json!({ "id": id }))))
}

#[test]
fn test_set_get_has_delete() {
    let store = MokaStore::default();
    let key = make_key(1);

    assert!(!store.has(&key));
    assert!(store.get(&key).is_none());

    store.set(&key, make_entry(1));
    assert!(store.has(&key));
    assert_eq!(store.get(&key), Some(make_entry(1)));

    store.delete(&key);
    assert!(!store.has(&key));
}

#[test]
fn test_reset_clears_everything() {
    let store = MokaStore::builder().max_entries(100).build();
    for i in 0..10 {
        store.set(&make_key(i), make_entry(i));
    }
    assert_eq!(store.len(), 10);

    store.reset();

    assert!(store.is_empty());
    assert!(store.dump().is_empty());
    assert!(!store.has(&make_key(3)));
}

#[test]
fn test_unsettled_entry_is_a_miss_for_get_settled() {
    let store = MokaStore::default();
    let key = make_key(1);
    store.set(&key, CacheEntry::default());

    assert!(store.has(&key));
    assert!(store.get_settled(&key).is_none());
}

#[test]
fn test_dump_load_round_trip() {
    let source = MokaStore::default();
    source.set(&make_key(1), make_entry(1));
    source.set(&make_key(2), make_entry(2));
    source.set(
        &make_key(3),
        CacheEntry::failure(ErrorEnvelope::from_response(ResponseEnvelope::with_status(
            404,
            json!({"msg": "missing"}),
        ))),
    );

    let dump = source.dump();
    assert_eq!(dump.len(), 3);
    assert!(dump.iter().all(|entry| entry.expiry == 0));

    // Through JSON, as a hydration payload would travel.
    let wire = serde_json::to_string(&dump).unwrap();
    let target = MokaStore::default();
    target.load(serde_json::from_str(&wire).unwrap());

    assert_eq!(target.dump(), dump);
    for i in 1..=3 {
        assert_eq!(target.get(&make_key(i)), source.get(&make_key(i)));
    }
}

#[test]
fn test_dump_is_sorted_by_key() {
    let store = MokaStore::default();
    for i in [5, 1, 3] {
        store.set(&make_key(i), make_entry(i));
    }
    let keys: Vec<DependencyKey> = store.dump().into_iter().map(|e| e.key).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn test_max_entries_eviction() {
    let store = MokaStoreBuilder::default()
        .max_entries(3)
        .eviction_policy(EvictionPolicy::lru())
        .build();

    for i in 1..=3 {
        store.set(&make_key(i), make_entry(i));
    }
    store.cache().run_pending_tasks();
    for i in 1..=3 {
        assert!(store.has(&make_key(i)), "entry {i} should fit");
    }

    store.set(&make_key(4), make_entry(4));
    store.cache().run_pending_tasks();

    assert!(store.has(&make_key(4)), "newest entry should be kept");
    let remaining = (1..=4).filter(|i| store.has(&make_key(*i))).count();
    assert_eq!(remaining, 3, "should have exactly 3 entries after eviction");
}

#[test]
fn test_max_bytes_eviction() {
    let store = MokaStore::builder().label("bytes").max_bytes(600).build();

    for i in 1..=20 {
        store.set(&make_key(i), make_entry(i));
    }
    store.cache().run_pending_tasks();

    let remaining = (1..=20).filter(|i| store.has(&make_key(*i))).count();
    assert!(remaining < 20, "byte budget should evict entries, kept {remaining}");
    assert!(remaining > 0);
}
