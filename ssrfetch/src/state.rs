//! Request state machine.
//!
//! One [`RequestState`] tracks one consumer's dependency through
//! `idle -> loading -> settled`. It only changes through [`reduce`], which
//! applies one of two [`Action`]s and returns a new shared state. Anything
//! else leaves the very same `Arc` in place, so callers can skip work with
//! [`Arc::ptr_eq`].

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use ssrfetch_core::{ApiResponse, DependencyKey, ErrorEnvelope, RequestDescriptor};

use crate::config::Settings;

/// Maps raw response data to what the consumer exposes.
///
/// Receives the response data (an array for composite dependencies) and the
/// state being settled.
pub type Projection = Arc<dyn Fn(Value, &RequestState) -> Value + Send + Sync>;

/// Lifecycle state of one dependency.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestState {
    /// A request is outstanding.
    pub loading: bool,
    /// The last settlement came from the cache.
    pub from_cache: bool,
    /// Dependency the state belongs to.
    pub key: DependencyKey,
    /// Failure of the last settlement.
    pub error: Option<ErrorEnvelope>,
    /// Projected response data of the last successful settlement.
    pub data: Option<Value>,
    /// Raw response of the last settlement.
    pub response: Option<ApiResponse>,
    /// Caller-supplied values carried along with the state.
    pub dependencies: Option<Value>,
    /// Data before the last settlement.
    pub prev_data: Option<Value>,
    /// State before the last settlement, without its own history.
    pub prev_state: Option<Arc<RequestState>>,
}

impl RequestState {
    /// Whether the state holds a settlement.
    pub fn is_settled(&self) -> bool {
        !self.loading && (self.response.is_some() || self.error.is_some())
    }
}

/// State transition.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// A request for the dependency started.
    RequestStart,
    /// The dependency settled.
    RequestEnd {
        /// Successful response.
        #[serde(default)]
        response: Option<ApiResponse>,
        /// Failure.
        #[serde(default)]
        error: Option<ErrorEnvelope>,
        /// Settlement served from the cache.
        #[serde(default, rename = "fromCache")]
        from_cache: bool,
    },
    /// Any other transition; leaves the state untouched.
    #[serde(other)]
    Unknown,
}

/// Per-request options resolved against the session settings.
#[derive(Clone, Default)]
pub struct RequestOptions {
    /// Dependency key of the request.
    pub key: DependencyKey,
    /// Effective cache eligibility, `Some(false)` opts out.
    pub use_cache: Option<bool>,
    /// The consumer switched to this dependency from another one.
    pub key_changed: bool,
    /// Keep the current state and its history even when it belongs to
    /// another key.
    pub keep_state: bool,
    /// Key the request is cached and shared under, when it differs from
    /// the state key.
    pub request_key: Option<DependencyKey>,
    /// Data projection.
    pub projection: Option<Projection>,
    /// Values copied into the settled state.
    pub dependencies: Option<Value>,
}

impl std::fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptions")
            .field("key", &self.key)
            .field("use_cache", &self.use_cache)
            .field("key_changed", &self.key_changed)
            .field("keep_state", &self.keep_state)
            .field("request_key", &self.request_key)
            .field("projection", &self.projection.as_ref().map(|_| "..."))
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

impl RequestOptions {
    /// Resolves options for `descriptor`, applying the session's cache rules
    /// over the caller's own `use_cache` choice.
    pub fn resolve(
        settings: &Settings,
        descriptor: &RequestDescriptor,
        key: DependencyKey,
        use_cache: Option<bool>,
    ) -> Self {
        let use_cache = settings.cache_eligibility(descriptor, &key, use_cache);
        Self {
            key,
            use_cache,
            ..Self::default()
        }
    }

    /// Whether the request may be served from, joined through and persisted
    /// to the cache.
    pub fn is_cache_eligible(&self) -> bool {
        self.use_cache != Some(false)
    }

    /// Key used for the cache and the in-flight table.
    pub fn request_key(&self) -> &DependencyKey {
        self.request_key.as_ref().unwrap_or(&self.key)
    }
}

/// Applies `action` to `state`.
pub fn reduce(
    state: &Arc<RequestState>,
    action: &Action,
    options: &RequestOptions,
) -> Arc<RequestState> {
    match action {
        Action::RequestStart => {
            let mut next = if options.keep_state || state.key == options.key {
                RequestState::clone(state)
            } else {
                RequestState::default()
            };
            next.loading = true;
            next.error = None;
            next.from_cache = false;
            next.key = options.key.clone();
            Arc::new(next)
        }
        Action::RequestEnd {
            response,
            error,
            from_cache,
        } => {
            let mut previous = RequestState::clone(state);
            previous.prev_state = None;

            // A settlement without a start can land on another key's state.
            let foreign =
                !options.keep_state && !state.key.is_empty() && state.key != options.key;
            let mut next = previous.clone();
            if options.key_changed || foreign {
                next.prev_data = None;
                next.prev_state = None;
            } else {
                next.prev_data = previous.data.clone();
                next.prev_state = Some(Arc::new(previous));
            }
            next.loading = false;
            next.response = response.clone();
            next.error = error.clone();
            next.dependencies = options.dependencies.clone();
            next.from_cache = *from_cache;
            next.key = options.key.clone();
            next.data = match (&next.error, &next.response) {
                (None, Some(response)) => {
                    let data = response.data();
                    Some(match &options.projection {
                        Some(projection) => projection(data, &next),
                        None => data,
                    })
                }
                _ => None,
            };
            Arc::new(next)
        }
        Action::Unknown => Arc::clone(state),
    }
}
