//! Moka store implementation.

use moka::sync::Cache;
use smol_str::SmolStr;
use ssrfetch_core::{CacheEntry, CacheStore, DependencyKey, DumpEntry};
use tracing::trace;

/// Entry capacity used by [`MokaStore::default`].
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// In-memory cache store powered by Moka.
///
/// Reads are lock-free and writes use fine-grained locking, so one store can
/// back many sessions on a multi-threaded server. Cloning is cheap and clones
/// share the same underlying cache.
///
/// # Caveats
///
/// - Data is **not persisted**; hydration is the only way entries leave the
///   process.
/// - Capacity enforcement is **eventually consistent**: Moka applies
///   evictions in batches, so the entry count may briefly exceed the bound.
/// - [`dump`](CacheStore::dump) is ordered by key, not by recency.
#[derive(Clone)]
pub struct MokaStore {
    /// The underlying Moka cache instance.
    pub cache: Cache<DependencyKey, CacheEntry>,
    /// Label identifying this store in logs.
    pub label: SmolStr,
}

impl std::fmt::Debug for MokaStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaStore")
            .field("label", &self.label)
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

impl MokaStore {
    /// Creates a new builder for `MokaStore`.
    pub fn builder() -> crate::builder::MokaStoreBuilder<crate::builder::NoCapacity> {
        crate::builder::MokaStoreBuilder::new()
    }

    /// Returns the underlying Moka cache.
    pub fn cache(&self) -> &Cache<DependencyKey, CacheEntry> {
        &self.cache
    }

    /// Returns the number of entries currently readable from the store.
    pub fn len(&self) -> usize {
        self.cache.iter().count()
    }

    /// Whether the store holds no readable entries.
    pub fn is_empty(&self) -> bool {
        self.cache.iter().next().is_none()
    }
}

impl Default for MokaStore {
    fn default() -> Self {
        Self::builder().max_entries(DEFAULT_MAX_ENTRIES).build()
    }
}

impl CacheStore for MokaStore {
    fn get(&self, key: &DependencyKey) -> Option<CacheEntry> {
        self.cache.get(key)
    }

    fn set(&self, key: &DependencyKey, entry: CacheEntry) {
        trace!(store = %self.label, %key, "store entry");
        self.cache.insert(key.clone(), entry);
    }

    fn has(&self, key: &DependencyKey) -> bool {
        self.cache.contains_key(key)
    }

    fn delete(&self, key: &DependencyKey) {
        self.cache.invalidate(key);
    }

    fn reset(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks();
    }

    fn dump(&self) -> Vec<DumpEntry> {
        let mut entries: Vec<DumpEntry> = self
            .cache
            .iter()
            .map(|(key, value)| DumpEntry::new(key.as_ref().clone(), value))
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }
}
