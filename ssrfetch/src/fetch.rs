//! Fetch orchestration.
//!
//! [`fetch_api`] settles one dependency and reports the transitions through a
//! dispatch callback. It takes exactly one of these paths:
//!
//! 1. **cache**: a settled entry exists and the request is cache-eligible.
//!    Only `REQUEST_END` is dispatched, with `from_cache` set.
//! 2. **join**: another request for the same key is in flight. Dispatches
//!    `REQUEST_START`, awaits the shared outcome, dispatches `REQUEST_END`.
//! 3. **upstream**: calls the HTTP client. Cache-eligible requests publish
//!    their in-flight slot so concurrent requests can join them.
//!
//! A forced revalidation always goes upstream and never publishes a slot.
//!
//! Once settled, a cache-eligible outcome is persisted unless the key already
//! has an entry, and the in-flight slot of the key is released.

use futures::FutureExt;
use ssrfetch_core::{ApiResponse, CacheEntry, FetchError, RequestDescriptor, execute};
use tracing::debug;

use crate::inflight::SharedFetch;
use crate::metrics::{FetchOutcome, record_fetch};
use crate::session::Session;
use crate::state::{Action, RequestOptions};

/// Settles the dependency described by `descriptor`.
///
/// Structured HTTP failures settle the state with an error and return `Ok`.
/// Failures without a response settle the state with an error as well, are
/// never cached, and are returned to the caller.
///
/// Any HTTP-level failure counts as structured here, including an error
/// status with an empty body. The server render loop is stricter: it only
/// caches failures whose response carries data and aborts on the others.
///
/// The cache and the in-flight table use [`RequestOptions::request_key`],
/// the dispatched transitions carry the state key.
pub async fn fetch_api<D>(
    session: &Session,
    descriptor: &RequestDescriptor,
    options: &RequestOptions,
    mut dispatch: D,
    revalidate: bool,
) -> Result<(), FetchError>
where
    D: FnMut(Action),
{
    if !descriptor.is_valid() {
        return Ok(());
    }

    let key = options.request_key();
    let eligible = options.is_cache_eligible();
    let cache = session.cache();
    let shareable = eligible && !revalidate;

    if shareable && let Some(entry) = cache.get_settled(key) {
        if session.debug() {
            debug!(key = %key, "cache hit");
        }
        record_fetch(FetchOutcome::Hit);
        dispatch(Action::RequestEnd {
            response: entry.response,
            error: entry.error,
            from_cache: true,
        });
        return Ok(());
    }

    let joined = if shareable {
        session.in_flight().get(key)
    } else {
        None
    };

    dispatch(Action::RequestStart);
    let outcome = match joined {
        Some(fetch) => {
            if session.debug() {
                debug!(key = %key, "join");
            }
            record_fetch(FetchOutcome::Joined);
            fetch.await
        }
        None => {
            if session.debug() {
                debug!(key = %key, revalidate, "fetch");
            }
            record_fetch(FetchOutcome::Upstream);
            let fetch = upstream(session, descriptor);
            if shareable {
                session.in_flight().register(key.clone(), fetch.clone());
            }
            fetch.await
        }
    };

    if eligible {
        let entry = match &outcome {
            Ok(response) => Some(CacheEntry::success(response.clone())),
            Err(FetchError::Http(error)) => Some(CacheEntry::failure(error.clone())),
            Err(_) => None,
        };
        if let Some(entry) = entry
            && !cache.has(key)
        {
            cache.set(key, entry);
        }
        session.in_flight().clear(key);
    }

    match outcome {
        Ok(response) => {
            dispatch(Action::RequestEnd {
                response: Some(response),
                error: None,
                from_cache: false,
            });
            Ok(())
        }
        Err(FetchError::Http(error)) => {
            dispatch(Action::RequestEnd {
                response: None,
                error: Some(error),
                from_cache: false,
            });
            Ok(())
        }
        Err(error) => {
            dispatch(Action::RequestEnd {
                response: None,
                error: Some(error.to_envelope()),
                from_cache: false,
            });
            Err(error)
        }
    }
}

/// Starts executing `descriptor` as a future that any number of requests can
/// await.
fn upstream(session: &Session, descriptor: &RequestDescriptor) -> SharedFetch {
    let client = session.client().cloned();
    let descriptor = descriptor.clone();
    async move {
        let client = client?;
        execute(client.as_ref(), &descriptor).await
    }
    .boxed()
    .shared()
}

/// Executes `descriptor` without dispatching any transition.
///
/// Used by the server render loop, which writes outcomes straight into the
/// cache.
pub(crate) async fn execute_once(
    session: &Session,
    descriptor: &RequestDescriptor,
) -> Result<ApiResponse, FetchError> {
    let client = session.client()?;
    record_fetch(FetchOutcome::Upstream);
    execute(client.as_ref(), descriptor).await
}
