//! Session settings.
//!
//! [`Settings`] is the effective, immutable configuration of a
//! [`Session`](crate::Session). It is produced by merging a
//! [`CustomSettings`] over the defaults: every `Some` value overrides the
//! default, `None` and empty strings leave the default in place.
//!
//! The plain-data part of [`CustomSettings`] can be loaded from YAML or JSON,
//! callbacks and instances are set in code:
//!
//! ```
//! use ssrfetch::config::{CustomSettings, Settings};
//!
//! let custom = CustomSettings::from_yaml(
//!     r#"
//!     max_requests: 20
//!     client_cache_var: __PAGE_DATA__
//!     debug: true
//!     "#,
//! )
//! .unwrap()
//! .render_ssr(|_session| "<main></main>".to_string());
//!
//! let settings = Settings::merge(custom);
//! assert_eq!(settings.max_requests, 20);
//! assert_eq!(settings.client_cache_var, "__PAGE_DATA__");
//! assert!(settings.use_cache_data);
//! ```

use std::sync::Arc;

use serde::Deserialize;
use ssrfetch_core::{CacheStore, DependencyKey, HttpClient, RequestDescriptor};
use ssrfetch_moka::MokaStore;

use crate::error::ConfigError;
use crate::session::Session;

/// Name of the client-side global carrying the hydration payload.
pub const DEFAULT_CLIENT_CACHE_VAR: &str = "__USE_API_CACHE__";

/// Default ceiling of SSR resolution iterations.
pub const DEFAULT_MAX_REQUESTS: u32 = 50;

/// Render engine hook: produces markup for the current cache contents and
/// declares unmet dependencies on the session it is given.
pub type RenderFn = Arc<dyn Fn(&Session) -> String + Send + Sync>;

/// Predicate deciding whether the process renders on the server.
pub type IsSsrFn = Arc<dyn Fn() -> bool + Send + Sync>;

/// Fine-grained cache exclusion: `Some(false)` excludes a dependency from the
/// cache, anything else keeps it.
pub type ShouldUseApiCacheFn =
    Arc<dyn Fn(&RequestDescriptor, &DependencyKey) -> Option<bool> + Send + Sync>;

/// Effective settings of a session.
#[derive(Clone)]
pub struct Settings {
    /// Store of settled dependency outcomes.
    pub cache: Arc<dyn CacheStore>,
    /// HTTP collaborator executing dependencies.
    pub client: Option<Arc<dyn HttpClient>>,
    /// Name of the client-side global carrying the hydration payload.
    pub client_cache_var: String,
    /// Ceiling of SSR resolution iterations.
    pub max_requests: u32,
    /// Whether server renders ship the cache contents to the client.
    pub use_cache_data: bool,
    /// Makes every dependency cache-eligible, whatever the per-call options.
    pub always_use_cache: bool,
    /// Deletes a consumer's previous entry when its dependency changes.
    pub clear_last_cache_when_config_changes: bool,
    /// Removes the hydration global once it has been loaded.
    pub delete_after_loading: bool,
    /// Emits per-dependency diagnostics.
    pub debug: bool,
    /// Cache exclusion predicate.
    pub should_use_api_cache: ShouldUseApiCacheFn,
    /// Server rendering detection.
    pub is_ssr: IsSsrFn,
    /// Render engine hook used by [`inject_ssr_html`](crate::ssr::inject_ssr_html).
    pub render_ssr: RenderFn,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache: Arc::new(MokaStore::default()),
            client: None,
            client_cache_var: DEFAULT_CLIENT_CACHE_VAR.to_string(),
            max_requests: DEFAULT_MAX_REQUESTS,
            use_cache_data: true,
            always_use_cache: false,
            clear_last_cache_when_config_changes: false,
            delete_after_loading: true,
            debug: false,
            should_use_api_cache: Arc::new(|_, _| None),
            is_ssr: Arc::new(|| !cfg!(target_arch = "wasm32")),
            render_ssr: Arc::new(|_| String::new()),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("cache", &"...")
            .field("client", &self.client.as_ref().map(|_| "..."))
            .field("client_cache_var", &self.client_cache_var)
            .field("max_requests", &self.max_requests)
            .field("use_cache_data", &self.use_cache_data)
            .field("always_use_cache", &self.always_use_cache)
            .field(
                "clear_last_cache_when_config_changes",
                &self.clear_last_cache_when_config_changes,
            )
            .field("delete_after_loading", &self.delete_after_loading)
            .field("debug", &self.debug)
            .finish()
    }
}

impl Settings {
    /// Merges `custom` over the default settings.
    pub fn merge(custom: CustomSettings) -> Self {
        let mut settings = Self::default();
        let CustomSettings {
            cache,
            client,
            client_cache_var,
            max_requests,
            use_cache_data,
            always_use_cache,
            clear_last_cache_when_config_changes,
            delete_after_loading,
            debug,
            should_use_api_cache,
            is_ssr,
            render_ssr,
        } = custom;

        if let Some(cache) = cache {
            settings.cache = cache;
        }
        if client.is_some() {
            settings.client = client;
        }
        if let Some(var) = client_cache_var.filter(|var| !var.is_empty()) {
            settings.client_cache_var = var;
        }
        if let Some(max_requests) = max_requests {
            settings.max_requests = max_requests;
        }
        if let Some(flag) = use_cache_data {
            settings.use_cache_data = flag;
        }
        if let Some(flag) = always_use_cache {
            settings.always_use_cache = flag;
        }
        if let Some(flag) = clear_last_cache_when_config_changes {
            settings.clear_last_cache_when_config_changes = flag;
        }
        if let Some(flag) = delete_after_loading {
            settings.delete_after_loading = flag;
        }
        if let Some(flag) = debug {
            settings.debug = flag;
        }
        if let Some(predicate) = should_use_api_cache {
            settings.should_use_api_cache = predicate;
        }
        if let Some(predicate) = is_ssr {
            settings.is_ssr = predicate;
        }
        if let Some(render) = render_ssr {
            settings.render_ssr = render;
        }
        settings
    }

    /// Whether `descriptor` may be served from and persisted to the cache,
    /// given the caller's own `use_cache` option.
    pub fn cache_eligibility(
        &self,
        descriptor: &RequestDescriptor,
        key: &DependencyKey,
        use_cache: Option<bool>,
    ) -> Option<bool> {
        if self.always_use_cache {
            Some(true)
        } else if (self.should_use_api_cache)(descriptor, key) == Some(false) {
            Some(false)
        } else {
            use_cache
        }
    }
}

/// Caller-supplied overrides of [`Settings`].
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct CustomSettings {
    /// Cache store override.
    #[serde(skip)]
    pub cache: Option<Arc<dyn CacheStore>>,
    /// HTTP client override.
    #[serde(skip)]
    pub client: Option<Arc<dyn HttpClient>>,
    /// Hydration global name.
    pub client_cache_var: Option<String>,
    /// SSR iteration ceiling.
    pub max_requests: Option<u32>,
    /// Ship cache contents on hydration.
    pub use_cache_data: Option<bool>,
    /// Force cache eligibility.
    pub always_use_cache: Option<bool>,
    /// Drop the previous entry on dependency change.
    pub clear_last_cache_when_config_changes: Option<bool>,
    /// Remove the hydration global once loaded.
    pub delete_after_loading: Option<bool>,
    /// Per-dependency diagnostics.
    pub debug: Option<bool>,
    /// Cache exclusion predicate.
    #[serde(skip)]
    pub should_use_api_cache: Option<ShouldUseApiCacheFn>,
    /// Server rendering detection.
    #[serde(skip)]
    pub is_ssr: Option<IsSsrFn>,
    /// Render engine hook.
    #[serde(skip)]
    pub render_ssr: Option<RenderFn>,
}

impl std::fmt::Debug for CustomSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomSettings")
            .field("client_cache_var", &self.client_cache_var)
            .field("max_requests", &self.max_requests)
            .field("use_cache_data", &self.use_cache_data)
            .field("always_use_cache", &self.always_use_cache)
            .field(
                "clear_last_cache_when_config_changes",
                &self.clear_last_cache_when_config_changes,
            )
            .field("delete_after_loading", &self.delete_after_loading)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl CustomSettings {
    /// Loads overrides from a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_saphyr::from_str(yaml).map_err(|err| ConfigError::Yaml(err.to_string()))
    }

    /// Loads overrides from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the cache store.
    pub fn cache<S>(mut self, cache: S) -> Self
    where
        S: CacheStore + 'static,
    {
        self.cache = Some(Arc::new(cache));
        self
    }

    /// Sets the HTTP client.
    pub fn client<C>(mut self, client: C) -> Self
    where
        C: HttpClient + 'static,
    {
        self.client = Some(Arc::new(client));
        self
    }

    /// Sets the SSR iteration ceiling.
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = Some(max_requests);
        self
    }

    /// Sets the cache exclusion predicate.
    pub fn should_use_api_cache<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&RequestDescriptor, &DependencyKey) -> Option<bool> + Send + Sync + 'static,
    {
        self.should_use_api_cache = Some(Arc::new(predicate));
        self
    }

    /// Sets the server rendering detection predicate.
    pub fn is_ssr<F>(mut self, predicate: F) -> Self
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.is_ssr = Some(Arc::new(predicate));
        self
    }

    /// Sets the render engine hook.
    pub fn render_ssr<F>(mut self, render: F) -> Self
    where
        F: Fn(&Session) -> String + Send + Sync + 'static,
    {
        self.render_ssr = Some(Arc::new(render));
        self
    }
}
