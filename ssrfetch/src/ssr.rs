//! Server render resolution.
//!
//! The render callback is opaque: it produces markup from whatever the cache
//! holds and declares, on the session, every dependency it could not
//! satisfy. A dependency may only show up once an earlier one has data, so
//! the dependency graph is discovered by rendering again after each
//! resolution until nothing is pending.
//!
//! Dependencies are resolved one at a time, in discovery order. Resolving
//! all pending dependencies at once would assume they are independent.

use ssrfetch_core::{CacheEntry, DependencyKey};
use tracing::{Instrument, debug, info_span, warn};

use crate::config::RenderFn;
use crate::error::SsrError;
use crate::fetch::execute_once;
use crate::hydration;
use crate::metrics::{record_ssr_overrun, record_ssr_pass};
use crate::session::Session;

/// Resolves the dependencies collected by a render pass.
///
/// `html` is the markup of the render that filled the collection. Each
/// iteration resolves the first pending dependency, then renders again.
/// When `max_requests` iterations did not reach a fixed point, the last
/// markup is returned and the overrun is logged.
///
/// A dependency failing without a structured response aborts the pass. An
/// error status whose body is empty counts as unstructured here.
pub async fn feed_requests(
    session: &Session,
    render: &(dyn Fn(&Session) -> String + Send + Sync),
    html: String,
    max_requests: u32,
) -> Result<String, SsrError> {
    let mut html = html;
    let mut remaining = max_requests;
    let cache = session.cache();

    loop {
        let pending = session.take_pending();
        let Some(first) = pending.first() else {
            if session.debug() {
                debug!(executed = max_requests - remaining, "dependencies resolved");
            }
            session.clear_seen();
            return Ok(html);
        };

        if remaining == 0 {
            let keys: Vec<&DependencyKey> = pending.iter().map(|pending| &pending.key).collect();
            warn!(
                pending = ?keys,
                iterations = max_requests,
                "render did not settle within the request ceiling"
            );
            record_ssr_overrun();
            session.clear_seen();
            return Ok(html);
        }

        if cache.get_settled(&first.key).is_none() {
            if session.debug() {
                debug!(key = %first.key, "fetch");
            }
            let entry = match execute_once(session, &first.descriptor).await {
                Ok(response) => CacheEntry::success(response),
                Err(error) => match error.structured() {
                    Some(structured) => CacheEntry::failure(structured.clone()),
                    None => return Err(error.into()),
                },
            };
            cache.set(&first.key, entry);
        }

        html = render(session);
        record_ssr_pass();
        remaining -= 1;
    }
}

/// Renders `session` to final markup.
///
/// Starts from an empty cache, renders with `render` (or the configured
/// render hook), resolves every declared dependency and, when the session
/// ships cache data, appends the hydration script.
pub async fn inject_ssr_html(
    session: &Session,
    render: Option<RenderFn>,
) -> Result<String, SsrError> {
    let settings = session.settings();
    let render = render.unwrap_or_else(|| settings.render_ssr.clone());
    let span = info_span!("ssr_render", max_requests = settings.max_requests);

    async move {
        session.clear_cache();
        session.reset_collection();

        let html = render(session);
        let html = feed_requests(session, render.as_ref(), html, settings.max_requests).await?;
        if !settings.use_cache_data {
            return Ok(html);
        }

        let script =
            hydration::render_script(&settings.client_cache_var, &hydration::payload(session))?;
        Ok(html + &script)
    }
    .instrument(span)
    .await
}
