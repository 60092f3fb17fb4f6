//! Declaring side of a dependency.
//!
//! A [`Consumer`] is what a component keeps across renders. Each render
//! calls [`Consumer::declare`] with the current descriptor. During a server
//! render this primes the state from the cache or collects the dependency
//! for the render loop. On the client it tells the caller whether a fetch
//! is due, which is then run with [`Consumer::request`]. Paginating
//! consumers fetch further pages with [`Consumer::request_with`], which
//! keeps the state and its history under the declared key.
//!
//! State changes are published on a [`tokio::sync::watch`] channel, see
//! [`Consumer::subscribe`].

use std::sync::Arc;

use serde_json::Value;
use ssrfetch_core::{DependencyKey, FetchError, KeyError, RequestDescriptor};
use tokio::sync::watch;
use tracing::debug;

use crate::fetch::fetch_api;
use crate::session::Session;
use crate::state::{Action, Projection, RequestOptions, RequestState, reduce};

/// Decides on re-renders whether the dependency should be requested again.
pub type ShouldRequestFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Options of a consumer.
#[derive(Clone, Default)]
pub struct ConsumerOptions {
    /// `Some(false)` opts out of the cache, subject to session settings.
    pub use_cache: Option<bool>,
    /// Declares nothing and never fetches.
    pub skip: bool,
    /// Maps response data to the exposed data.
    pub projection: Option<Projection>,
    /// Values copied into every settled state.
    pub dependencies: Option<Value>,
    /// Re-render refetch predicate.
    pub should_request: Option<ShouldRequestFn>,
    /// Watched values; a change between declarations makes a fetch due.
    pub watch: Option<Value>,
}

impl std::fmt::Debug for ConsumerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsumerOptions")
            .field("use_cache", &self.use_cache)
            .field("skip", &self.skip)
            .field("dependencies", &self.dependencies)
            .field("watch", &self.watch)
            .finish_non_exhaustive()
    }
}

impl ConsumerOptions {
    /// Sets the per-consumer cache choice.
    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = Some(use_cache);
        self
    }

    /// Skips the dependency.
    pub fn skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    /// Sets the data projection.
    pub fn projection<F>(mut self, projection: F) -> Self
    where
        F: Fn(Value, &RequestState) -> Value + Send + Sync + 'static,
    {
        self.projection = Some(Arc::new(projection));
        self
    }

    /// Sets the values copied into settled states.
    pub fn dependencies(mut self, dependencies: impl Into<Value>) -> Self {
        self.dependencies = Some(dependencies.into());
        self
    }

    /// Sets the re-render refetch predicate.
    pub fn should_request<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.should_request = Some(Arc::new(predicate));
        self
    }

    /// Sets the watched values.
    pub fn watch(mut self, values: impl Into<Value>) -> Self {
        self.watch = Some(values.into());
        self
    }
}

/// Result of one declaration.
#[derive(Debug, Clone)]
pub struct Declaration {
    /// Data of the current state.
    pub data: Option<Value>,
    /// Current state.
    pub state: Arc<RequestState>,
    /// A client-side request should be started.
    pub should_fetch: bool,
}

/// One component's hold on a dependency.
pub struct Consumer {
    options: ConsumerOptions,
    descriptor: Option<RequestDescriptor>,
    key: DependencyKey,
    is_init: bool,
    has_fed: bool,
    key_changed: bool,
    watched: Option<Value>,
    state: watch::Sender<Arc<RequestState>>,
}

impl std::fmt::Debug for Consumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Consumer")
            .field("key", &self.key)
            .field("is_init", &self.is_init)
            .field("has_fed", &self.has_fed)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl Default for Consumer {
    fn default() -> Self {
        Consumer::new(ConsumerOptions::default())
    }
}

impl Consumer {
    /// Creates an idle consumer.
    pub fn new(options: ConsumerOptions) -> Self {
        let (state, _) = watch::channel(Arc::new(RequestState::default()));
        Self {
            options,
            descriptor: None,
            key: DependencyKey::default(),
            is_init: false,
            has_fed: false,
            key_changed: false,
            watched: None,
            state,
        }
    }

    /// Declares the dependency for the current render.
    ///
    /// Returns `None` for an invalid descriptor, which never touches the
    /// cache nor the network.
    pub fn declare(
        &mut self,
        session: &Session,
        descriptor: impl Into<RequestDescriptor>,
    ) -> Result<Option<Declaration>, KeyError> {
        let descriptor = descriptor.into();
        let key = descriptor.key()?;
        let settings = session.settings();

        self.key_changed = self.is_init && self.key != key;
        if self.key_changed {
            if settings.clear_last_cache_when_config_changes {
                session.cache().delete(&self.key);
            }
            self.has_fed = false;
        }
        self.key = key.clone();
        self.descriptor = Some(descriptor.clone());

        let valid = descriptor.is_valid();
        let first = !self.is_init;
        let watch_changed = !first && self.watched != self.options.watch;
        self.watched = self.options.watch.clone();
        if valid && first && !self.options.skip {
            self.prime(session, &descriptor, &key);
        }
        self.is_init = true;

        if !valid {
            return Ok(None);
        }

        let state = self.state();
        let rerequest = self
            .options
            .should_request
            .as_ref()
            .is_some_and(|predicate| predicate());
        let should_fetch = !self.options.skip
            && !session.is_ssr()
            && !self.has_fed
            && (first || self.key_changed || watch_changed || (rerequest && !state.loading));

        Ok(Some(Declaration {
            data: state.data.clone(),
            state,
            should_fetch,
        }))
    }

    fn prime(&mut self, session: &Session, descriptor: &RequestDescriptor, key: &DependencyKey) {
        let options = self.request_options(session, descriptor, key.clone());
        let cached = session.cache().get_settled(key);
        match cached {
            Some(entry)
                if !self.has_fed && (session.is_ssr() || options.is_cache_eligible()) =>
            {
                let from_cache = !session.is_ssr();
                if from_cache {
                    self.has_fed = true;
                }
                if session.debug() {
                    debug!(key = %key, "feed");
                }
                self.publish(
                    &Action::RequestEnd {
                        response: entry.response,
                        error: entry.error,
                        from_cache,
                    },
                    &options,
                );
            }
            _ if session.is_ssr() => session.collect(descriptor.clone(), key.clone()),
            _ => {}
        }
    }

    fn request_options(
        &self,
        session: &Session,
        descriptor: &RequestDescriptor,
        key: DependencyKey,
    ) -> RequestOptions {
        RequestOptions {
            key_changed: self.key_changed,
            projection: self.options.projection.clone(),
            dependencies: self.options.dependencies.clone(),
            ..RequestOptions::resolve(session.settings(), descriptor, key, self.options.use_cache)
        }
    }

    // The projection runs outside the channel lock, it may read the state.
    fn publish(&self, action: &Action, options: &RequestOptions) {
        loop {
            let current = self.state();
            let next = reduce(&current, action, options);
            if Arc::ptr_eq(&next, &current) {
                return;
            }
            let applied = self.state.send_if_modified(move |state| {
                if Arc::ptr_eq(state, &current) {
                    *state = next;
                    true
                } else {
                    false
                }
            });
            if applied {
                return;
            }
        }
    }

    /// Requests the declared dependency.
    ///
    /// A `revalidate` request ignores the cache and is not shared with
    /// concurrent requests.
    pub async fn request(&self, session: &Session, revalidate: bool) -> Result<(), FetchError> {
        let Some(descriptor) = self.descriptor.clone() else {
            return Ok(());
        };
        self.request_with(session, descriptor, false, revalidate).await
    }

    /// Requests `descriptor` on behalf of the declared dependency.
    ///
    /// The settlement is published under the declared key, so the next
    /// page of a list lands in the same state with the current page as
    /// `prev_data`. The response is cached and shared under the key of
    /// `descriptor` itself. With `keep_state`, the current state and its
    /// history are kept even when they belong to another key.
    pub async fn request_with(
        &self,
        session: &Session,
        descriptor: impl Into<RequestDescriptor>,
        keep_state: bool,
        revalidate: bool,
    ) -> Result<(), FetchError> {
        if self.options.skip {
            return Ok(());
        }
        let descriptor = descriptor.into();
        let request_key = descriptor.key()?;
        let key = if self.key.is_empty() {
            request_key.clone()
        } else {
            self.key.clone()
        };
        let options = RequestOptions {
            key,
            keep_state,
            request_key: Some(request_key.clone()),
            ..self.request_options(session, &descriptor, request_key)
        };
        fetch_api(
            session,
            &descriptor,
            &options,
            |action| self.publish(&action, &options),
            revalidate,
        )
        .await
    }

    /// Requests the declared dependency again, bypassing the cache.
    pub async fn refresh(&self, session: &Session) -> Result<(), FetchError> {
        self.request(session, true).await
    }

    /// Current state.
    pub fn state(&self) -> Arc<RequestState> {
        self.state.borrow().clone()
    }

    /// Current data.
    pub fn data(&self) -> Option<Value> {
        self.state.borrow().data.clone()
    }

    /// Replaces the watched values for the next declaration.
    pub fn watch(&mut self, values: impl Into<Value>) -> &mut Self {
        self.options.watch = Some(values.into());
        self
    }

    /// Dependency key of the last declaration.
    pub fn key(&self) -> &DependencyKey {
        &self.key
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RequestState>> {
        self.state.subscribe()
    }
}
