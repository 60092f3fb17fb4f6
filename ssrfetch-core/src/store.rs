//! Cache store contract.
//!
//! A [`CacheStore`] is a capacity-bounded key/value store of
//! [`CacheEntry`] values. The engine only relies on the operations below;
//! eviction is entirely the store's business. Entries never expire by time,
//! so the expiry field of a [`DumpEntry`] is always `0`.
//!
//! The store API is synchronous on purpose: render callbacks read it while
//! producing markup, and those callbacks cannot suspend.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::entry::CacheEntry;
use crate::key::DependencyKey;

/// One serialized store entry, as found in hydration payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpEntry {
    /// Dependency key.
    #[serde(rename = "k")]
    pub key: DependencyKey,
    /// Stored entry.
    #[serde(rename = "v")]
    pub value: CacheEntry,
    /// Expiry, always `0` (never).
    #[serde(rename = "e", default)]
    pub expiry: u64,
}

impl DumpEntry {
    /// Creates a dump entry that never expires.
    pub fn new(key: DependencyKey, value: CacheEntry) -> Self {
        Self {
            key,
            value,
            expiry: 0,
        }
    }
}

/// Capacity-bounded store of settled dependency outcomes.
pub trait CacheStore: Send + Sync {
    /// Returns the entry stored under `key`.
    fn get(&self, key: &DependencyKey) -> Option<CacheEntry>;

    /// Stores `entry` under `key`, replacing any previous entry.
    fn set(&self, key: &DependencyKey, entry: CacheEntry);

    /// Whether an entry is stored under `key`.
    fn has(&self, key: &DependencyKey) -> bool {
        self.get(key).is_some()
    }

    /// Removes the entry stored under `key`.
    fn delete(&self, key: &DependencyKey);

    /// Removes every entry.
    fn reset(&self);

    /// Serializes the store contents.
    fn dump(&self) -> Vec<DumpEntry>;

    /// Restores entries produced by [`CacheStore::dump`].
    fn load(&self, entries: Vec<DumpEntry>) {
        for entry in entries {
            self.set(&entry.key, entry.value);
        }
    }

    /// Returns a settled entry, treating unsettled ones as a miss.
    fn get_settled(&self, key: &DependencyKey) -> Option<CacheEntry> {
        self.get(key).filter(CacheEntry::is_settled)
    }
}

impl<T> CacheStore for Arc<T>
where
    T: CacheStore + ?Sized,
{
    fn get(&self, key: &DependencyKey) -> Option<CacheEntry> {
        self.as_ref().get(key)
    }

    fn set(&self, key: &DependencyKey, entry: CacheEntry) {
        self.as_ref().set(key, entry)
    }

    fn has(&self, key: &DependencyKey) -> bool {
        self.as_ref().has(key)
    }

    fn delete(&self, key: &DependencyKey) {
        self.as_ref().delete(key)
    }

    fn reset(&self) {
        self.as_ref().reset()
    }

    fn dump(&self) -> Vec<DumpEntry> {
        self.as_ref().dump()
    }

    fn load(&self, entries: Vec<DumpEntry>) {
        self.as_ref().load(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{ApiResponse, ResponseEnvelope};
    use serde_json::json;

    #[test]
    fn test_dump_entry_wire_format() {
        let entry = DumpEntry::new(
            DependencyKey::from(r#"{"url":"/a"}"#),
            CacheEntry::success(ApiResponse::Single(ResponseEnvelope::ok(json!({"foo": 1})))),
        );
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["k"], r#"{"url":"/a"}"#);
        assert_eq!(value["e"], 0);
        assert_eq!(value["v"]["response"]["data"]["foo"], 1);
        assert!(value["v"].get("error").is_none());

        let back: DumpEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
