#![warn(missing_docs)]
//! # ssrfetch-moka
//!
//! A [`CacheStore`](ssrfetch_core::CacheStore) backed by Moka's synchronous
//! cache. Capacity is bounded either by entry count or by an approximate
//! byte budget; eviction defaults to least-recently-used. Entries never
//! expire by time.
//!
//! ```
//! use ssrfetch_core::{CacheStore, DependencyKey};
//! use ssrfetch_moka::MokaStore;
//!
//! let store = MokaStore::builder().max_entries(1_000).build();
//! assert!(!store.has(&DependencyKey::from(r#"{"url":"/a"}"#)));
//! ```

mod builder;
mod store;

pub use builder::{ByteCapacity, EntryCapacity, MokaStoreBuilder, NoCapacity};
pub use moka::policy::EvictionPolicy;
pub use store::{DEFAULT_MAX_ENTRIES, MokaStore};
