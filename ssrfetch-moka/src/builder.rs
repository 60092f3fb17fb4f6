//! Builder for configuring [`MokaStore`].

use moka::policy::EvictionPolicy;
use moka::sync::{Cache, CacheBuilder};
use smol_str::SmolStr;
use ssrfetch_core::{CacheEntry, DependencyKey};

use crate::store::MokaStore;

/// Fixed per-entry overhead counted by the byte weigher.
const ENTRY_OVERHEAD: usize = 64;

/// Marker type: capacity has not been configured yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapacity;

/// Marker type: entry-count capacity has been configured.
#[derive(Debug, Clone, Copy)]
pub struct EntryCapacity(pub(crate) u64);

/// Marker type: byte-based capacity has been configured.
#[derive(Debug, Clone, Copy)]
pub struct ByteCapacity(pub(crate) u64);

/// Builder for creating and configuring a [`MokaStore`].
///
/// Capacity must be configured with exactly one of
/// [`max_entries`](Self::max_entries) or [`max_bytes`](Self::max_bytes)
/// before `build()` becomes available.
///
/// ```
/// use ssrfetch_moka::{EvictionPolicy, MokaStore};
///
/// let store = MokaStore::builder()
///     .label("pages")
///     .max_bytes(8 * 1024 * 1024)
///     .eviction_policy(EvictionPolicy::lru())
///     .build();
/// # let _ = store;
/// ```
pub struct MokaStoreBuilder<Cap> {
    capacity: Cap,
    label: SmolStr,
    eviction_policy: Option<EvictionPolicy>,
}

impl MokaStoreBuilder<NoCapacity> {
    /// Creates a new builder with no capacity configured.
    pub fn new() -> Self {
        Self {
            capacity: NoCapacity,
            label: SmolStr::new_static("moka"),
            eviction_policy: None,
        }
    }

    /// Sets the maximum number of entries the store can hold.
    pub fn max_entries(self, capacity: u64) -> MokaStoreBuilder<EntryCapacity> {
        MokaStoreBuilder {
            capacity: EntryCapacity(capacity),
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }

    /// Sets an approximate memory budget in bytes.
    ///
    /// An entry weighs the length of its key plus the length of its JSON
    /// encoding plus a fixed overhead.
    pub fn max_bytes(self, bytes: u64) -> MokaStoreBuilder<ByteCapacity> {
        MokaStoreBuilder {
            capacity: ByteCapacity(bytes),
            label: self.label,
            eviction_policy: self.eviction_policy,
        }
    }
}

impl Default for MokaStoreBuilder<NoCapacity> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Cap> MokaStoreBuilder<Cap> {
    /// Sets a label identifying this store in logs.
    ///
    /// # Default
    ///
    /// `"moka"`
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the eviction policy.
    ///
    /// # Default
    ///
    /// [`EvictionPolicy::lru()`]. TinyLFU may refuse to admit a fresh entry,
    /// which would make a just-fetched dependency miss on the next render.
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.eviction_policy = Some(policy);
        self
    }
}

impl MokaStoreBuilder<EntryCapacity> {
    /// Builds the [`MokaStore`] with entry-count based capacity.
    pub fn build(self) -> MokaStore {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        let cache: Cache<DependencyKey, CacheEntry> = CacheBuilder::new(self.capacity.0)
            .name(&self.label)
            .eviction_policy(policy)
            .build();
        MokaStore {
            cache,
            label: self.label,
        }
    }
}

impl MokaStoreBuilder<ByteCapacity> {
    /// Builds the [`MokaStore`] with byte-based capacity.
    pub fn build(self) -> MokaStore {
        let policy = self.eviction_policy.unwrap_or_else(EvictionPolicy::lru);
        let cache: Cache<DependencyKey, CacheEntry> = CacheBuilder::new(self.capacity.0)
            .name(&self.label)
            .weigher(byte_weigher)
            .eviction_policy(policy)
            .build();
        MokaStore {
            cache,
            label: self.label,
        }
    }
}

fn byte_weigher(key: &DependencyKey, value: &CacheEntry) -> u32 {
    let encoded = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
    (key.as_str().len() + encoded + ENTRY_OVERHEAD).min(u32::MAX as usize) as u32
}
