//! Request-state synchronization for server-rendered UIs.
//!
//! Components declare HTTP data dependencies through a [`Consumer`]. Each
//! unique dependency is executed once, shared between concurrent consumers
//! and cached. During a server render, dependencies are collected on the
//! [`Session`] instead of being fetched, and [`inject_ssr_html`] renders
//! repeatedly until every declared dependency is resolved, then ships the
//! cache to the client as a hydration script.
//!
//! # Example
//!
//! ```rust,ignore
//! use ssrfetch::{Consumer, CustomSettings, Session, inject_ssr_html};
//! use ssrfetch_reqwest::ReqwestClient;
//!
//! let session = Session::builder()
//!     .settings(CustomSettings::default().client(ReqwestClient::new()))
//!     .ssr(true)
//!     .build();
//!
//! let render = std::sync::Arc::new(|session: &Session| {
//!     let mut user = Consumer::default();
//!     match user.declare(session, "https://api.example.com/user").ok().flatten() {
//!         Some(declaration) => match declaration.data {
//!             Some(data) => format!("<p>{}</p>", data["name"]),
//!             None => "<p>loading</p>".to_string(),
//!         },
//!         None => String::new(),
//!     }
//! });
//!
//! let html = inject_ssr_html(&session, Some(render)).await?;
//! ```
//!
//! # Crates
//!
//! - `ssrfetch-core`: descriptors, keys, envelopes and the store/client contracts
//! - `ssrfetch-moka`: the default capacity-bounded store
//! - `ssrfetch-reqwest`: an HTTP client over `reqwest`
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Session settings and their YAML/JSON loading.
pub mod config;

/// Declaring side of a dependency.
pub mod consumer;

/// Error types of the engine.
///
/// [`SsrError`] aborts a server render, [`ConfigError`] rejects a settings
/// document. Request failures are [`FetchError`]s.
pub mod error;

/// Fetch orchestration: cache, join or upstream.
pub mod fetch;

/// Server to client cache transfer.
pub mod hydration;

/// Table of outstanding requests.
pub mod inflight;

/// Metrics collection.
///
/// With the `metrics` feature enabled, counters are recorded for upstream
/// calls, cache hits, in-flight joins and SSR passes.
pub mod metrics;

/// Per-render session context.
pub mod session;

/// Server render resolution loop.
pub mod ssr;

/// Request state machine.
pub mod state;

pub use config::{CustomSettings, Settings};
pub use consumer::{Consumer, ConsumerOptions, Declaration};
pub use error::{ConfigError, SsrError};
pub use fetch::fetch_api;
pub use hydration::{HydrationGlobals, load_api_cache};
pub use session::{IntoSession, PendingDependency, Session, SessionBuilder};
pub use ssr::{feed_requests, inject_ssr_html};
pub use state::{Action, RequestOptions, RequestState, reduce};

pub use ssrfetch_core::{
    ApiResponse, CacheEntry, CacheStore, ClientError, DependencyKey, DumpEntry, ErrorEnvelope,
    FetchError, HttpClient, KeyError, Method, RequestConfig, RequestDescriptor, ResponseEnvelope,
};
pub use ssrfetch_moka::MokaStore;
