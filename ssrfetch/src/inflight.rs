//! In-flight request slots.
//!
//! Every cache-eligible request registers a [`SharedFetch`] under its
//! dependency key. Later requests for the same key clone the handle and await
//! it instead of calling the HTTP client again, so all of them observe the
//! outcome of the single upstream call.

use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use ssrfetch_core::{ApiResponse, DependencyKey, FetchError};

/// Cloneable handle to the outcome of one upstream call.
pub type SharedFetch = Shared<BoxFuture<'static, Result<ApiResponse, FetchError>>>;

/// Table of outstanding requests, one slot per dependency key.
#[derive(Default)]
pub struct InFlight {
    slots: DashMap<DependencyKey, SharedFetch>,
}

impl InFlight {
    /// Returns a handle to the request outstanding for `key`.
    pub fn get(&self, key: &DependencyKey) -> Option<SharedFetch> {
        self.slots.get(key).map(|slot| slot.value().clone())
    }

    /// Registers `fetch` as the outstanding request for `key`.
    pub fn register(&self, key: DependencyKey, fetch: SharedFetch) {
        self.slots.insert(key, fetch);
    }

    /// Releases the slot of `key`.
    pub fn clear(&self, key: &DependencyKey) {
        self.slots.remove(key);
    }

    /// Number of outstanding requests.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no request is outstanding.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl std::fmt::Debug for InFlight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InFlight")
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use ssrfetch_core::ResponseEnvelope;

    #[tokio::test]
    async fn test_joiners_share_one_outcome() {
        let in_flight = InFlight::default();
        let key = DependencyKey::from("k");
        let fetch: SharedFetch = async {
            Ok(ApiResponse::Single(ResponseEnvelope::ok(serde_json::json!(1))))
        }
        .boxed()
        .shared();
        in_flight.register(key.clone(), fetch);

        let first = in_flight.get(&key).unwrap();
        let second = in_flight.get(&key).unwrap();
        let (first, second) = futures::join!(first, second);
        assert_eq!(first.unwrap(), second.unwrap());

        in_flight.clear(&key);
        assert!(in_flight.is_empty());
    }
}
