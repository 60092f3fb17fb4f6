//! Metrics declaration and recording helpers.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Fetch orchestration

    /// Track number of HTTP client invocations.
    pub static ref UPSTREAM_CALLS: &'static str = {
        metrics::describe_counter!(
            "ssrfetch_upstream_calls_total",
            "Total number of dependencies executed through the HTTP client."
        );
        "ssrfetch_upstream_calls_total"
    };
    /// Track number of dependencies served from a settled cache entry.
    pub static ref CACHE_HITS: &'static str = {
        metrics::describe_counter!(
            "ssrfetch_cache_hits_total",
            "Total number of dependencies served from the cache."
        );
        "ssrfetch_cache_hits_total"
    };
    /// Track number of requests joining an in-flight request.
    pub static ref IN_FLIGHT_JOINS: &'static str = {
        metrics::describe_counter!(
            "ssrfetch_in_flight_joins_total",
            "Total number of requests that joined an in-flight request."
        );
        "ssrfetch_in_flight_joins_total"
    };

    // Server rendering

    /// Track number of SSR resolution iterations.
    pub static ref SSR_ITERATIONS: &'static str = {
        metrics::describe_counter!(
            "ssrfetch_ssr_iterations_total",
            "Total number of render passes driven by SSR resolution."
        );
        "ssrfetch_ssr_iterations_total"
    };
    /// Track number of SSR passes that hit the iteration ceiling.
    pub static ref SSR_OVERRUNS: &'static str = {
        metrics::describe_counter!(
            "ssrfetch_ssr_overruns_total",
            "Total number of SSR passes stopped by the iteration ceiling."
        );
        "ssrfetch_ssr_overruns_total"
    };
}

/// How a dependency request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Served from a settled cache entry.
    Hit,
    /// Joined an in-flight request.
    Joined,
    /// Executed through the HTTP client.
    Upstream,
}

/// Records how a dependency request was satisfied.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_fetch(outcome: FetchOutcome) {
    let counter = match outcome {
        FetchOutcome::Hit => *CACHE_HITS,
        FetchOutcome::Joined => *IN_FLIGHT_JOINS,
        FetchOutcome::Upstream => *UPSTREAM_CALLS,
    };
    metrics::counter!(counter).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_fetch(_outcome: FetchOutcome) {}

/// Records one SSR render iteration.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_ssr_pass() {
    metrics::counter!(*SSR_ITERATIONS).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_ssr_pass() {}

/// Records a render loop stopped by the request ceiling.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_ssr_overrun() {
    metrics::counter!(*SSR_OVERRUNS).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_ssr_overrun() {}
