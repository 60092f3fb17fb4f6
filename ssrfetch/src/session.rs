//! Per-render session context.
//!
//! A [`Session`] is built once per render root. It owns the effective
//! [`Settings`], the table of in-flight requests and, when rendering on the
//! server, the [`SsrCollection`] that render callbacks fill with unmet
//! dependencies. It is passed explicitly to every consumer, there is no
//! ambient state shared between concurrent server renders.
//!
//! ```
//! use ssrfetch::{CustomSettings, Session};
//!
//! let session = Session::builder()
//!     .settings(CustomSettings::default().max_requests(10))
//!     .ssr(true)
//!     .build();
//! assert!(session.is_ssr());
//! assert_eq!(session.settings().max_requests, 10);
//!
//! // Configuring a configured session hands it back unchanged.
//! let same = Session::configure(session.clone());
//! assert!(same.ptr_eq(&session));
//! ```

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ssrfetch_core::{CacheStore, DependencyKey, FetchError, HttpClient, RequestDescriptor};
use tracing::debug;

use crate::config::{CustomSettings, Settings};
use crate::inflight::InFlight;

/// A dependency declared during a server render that the cache could not
/// satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDependency {
    /// Declared descriptor.
    pub descriptor: RequestDescriptor,
    /// Its dependency key.
    pub key: DependencyKey,
}

/// Dependencies collected by render passes.
#[derive(Debug, Default)]
pub struct SsrCollection {
    pending: Vec<PendingDependency>,
    seen: HashSet<DependencyKey>,
}

struct SessionInner {
    settings: Settings,
    is_ssr: bool,
    collection: Option<Mutex<SsrCollection>>,
    in_flight: InFlight,
}

/// Shared handle to a render session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.inner.settings)
            .field("is_ssr", &self.inner.is_ssr)
            .field("in_flight", &self.inner.in_flight)
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::builder().build()
    }
}

impl Session {
    /// Creates a session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// Builds a session from anything that describes one.
    ///
    /// Passing an existing [`Session`] returns it as is.
    pub fn configure(config: impl IntoSession) -> Session {
        config.into_session()
    }

    /// Effective settings.
    pub fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    /// Whether this session renders on the server.
    pub fn is_ssr(&self) -> bool {
        self.inner.is_ssr
    }

    /// Whether diagnostics are enabled.
    pub fn debug(&self) -> bool {
        self.inner.settings.debug
    }

    /// The cache store.
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.inner.settings.cache
    }

    /// The HTTP client, or [`FetchError::NoClient`] when none is configured.
    pub fn client(&self) -> Result<&Arc<dyn HttpClient>, FetchError> {
        self.inner.settings.client.as_ref().ok_or(FetchError::NoClient)
    }

    /// Empties the cache store.
    pub fn clear_cache(&self) {
        self.inner.settings.cache.reset();
    }

    /// Outstanding requests.
    pub fn in_flight(&self) -> &InFlight {
        &self.inner.in_flight
    }

    /// Whether both handles point to the same session.
    pub fn ptr_eq(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn collection(&self) -> Option<MutexGuard<'_, SsrCollection>> {
        self.inner
            .collection
            .as_ref()
            .map(|collection| collection.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Records a dependency a render pass could not satisfy.
    ///
    /// A key already pending in this pass is not queued twice. Outside of a
    /// server render this does nothing.
    pub fn collect(&self, descriptor: RequestDescriptor, key: DependencyKey) {
        let debug = self.debug();
        let Some(mut collection) = self.collection() else {
            return;
        };
        if collection.seen.insert(key.clone()) && debug {
            debug!(key = %key, "collect");
        }
        if collection.pending.iter().all(|pending| pending.key != key) {
            collection.pending.push(PendingDependency { descriptor, key });
        }
    }

    /// Drains the pending list.
    pub fn take_pending(&self) -> Vec<PendingDependency> {
        self.collection()
            .map(|mut collection| std::mem::take(&mut collection.pending))
            .unwrap_or_default()
    }

    /// Keys currently pending, in discovery order.
    pub fn pending(&self) -> Vec<DependencyKey> {
        self.collection()
            .map(|collection| {
                collection
                    .pending
                    .iter()
                    .map(|pending| pending.key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Clears both the pending list and the seen set.
    pub fn reset_collection(&self) {
        if let Some(mut collection) = self.collection() {
            collection.pending.clear();
            collection.seen.clear();
        }
    }

    /// Clears the set of keys seen in the current pass.
    pub fn clear_seen(&self) {
        if let Some(mut collection) = self.collection() {
            collection.seen.clear();
        }
    }
}

/// Builder for [`Session`].
#[derive(Debug, Default)]
pub struct SessionBuilder {
    settings: CustomSettings,
    ssr: Option<bool>,
}

impl SessionBuilder {
    /// Sets caller overrides.
    pub fn settings(mut self, settings: CustomSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Forces server or client mode instead of asking the `is_ssr` predicate.
    pub fn ssr(mut self, ssr: bool) -> Self {
        self.ssr = Some(ssr);
        self
    }

    /// Builds the session.
    pub fn build(self) -> Session {
        let settings = Settings::merge(self.settings);
        let is_ssr = self.ssr.unwrap_or_else(|| (settings.is_ssr)());
        Session {
            inner: Arc::new(SessionInner {
                collection: is_ssr.then(|| Mutex::new(SsrCollection::default())),
                settings,
                is_ssr,
                in_flight: InFlight::default(),
            }),
        }
    }
}

/// Conversion into a configured [`Session`].
pub trait IntoSession {
    /// Performs the conversion.
    fn into_session(self) -> Session;
}

impl IntoSession for Session {
    fn into_session(self) -> Session {
        self
    }
}

impl IntoSession for SessionBuilder {
    fn into_session(self) -> Session {
        self.build()
    }
}

impl IntoSession for CustomSettings {
    fn into_session(self) -> Session {
        Session::builder().settings(self).build()
    }
}
