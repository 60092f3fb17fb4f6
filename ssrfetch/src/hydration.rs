//! Cache transfer from server to client.
//!
//! The server appends an assignment of the cache dump to a global variable:
//!
//! ```text
//! <script>window.__USE_API_CACHE__ = [{"k":"{\"url\":\"/a\"}","v":{...},"e":0}]</script>
//! ```
//!
//! Every `<` inside the JSON is written as `\u003c` so that no string in the
//! payload can close the script element. The client reads the global back
//! into its own store before its first render.

use std::collections::HashMap;

use serde_json::{Map, Value};
use ssrfetch_core::{DumpEntry, RequestDescriptor};

use crate::error::SsrError;
use crate::session::Session;

/// Cache entries the session ships to the client.
///
/// Entries excluded by the `should_use_api_cache` predicate stay on the
/// server.
pub fn payload(session: &Session) -> Vec<DumpEntry> {
    let predicate = &session.settings().should_use_api_cache;
    session
        .cache()
        .dump()
        .into_iter()
        .filter(|entry| match RequestDescriptor::from_key(&entry.key) {
            Ok(descriptor) => predicate(&descriptor, &entry.key) != Some(false),
            Err(_) => true,
        })
        .collect()
}

/// Renders the hydration script assigning `entries` to `window.{var}`.
pub fn render_script(var: &str, entries: &[DumpEntry]) -> Result<String, SsrError> {
    let json = serde_json::to_string(entries).map_err(SsrError::Encode)?;
    Ok(format!(
        "<script>window.{var} = {}</script>",
        json.replace('<', "\\u003c")
    ))
}

/// Extracts the payload assigned to `window.{var}` from rendered markup.
pub fn parse_script(var: &str, html: &str) -> Result<Option<Vec<DumpEntry>>, SsrError> {
    let prefix = format!("<script>window.{var} = ");
    let Some(start) = html.find(&prefix).map(|at| at + prefix.len()) else {
        return Ok(None);
    };
    let Some(len) = html[start..].find("</script>") else {
        return Ok(None);
    };
    serde_json::from_str(&html[start..start + len])
        .map(Some)
        .map_err(SsrError::Decode)
}

/// Client-side global variables.
pub trait HydrationGlobals {
    /// Returns the global named `name`.
    fn get_global(&self, name: &str) -> Option<&Value>;

    /// Removes the global named `name`.
    fn remove_global(&mut self, name: &str);
}

impl HydrationGlobals for HashMap<String, Value> {
    fn get_global(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }

    fn remove_global(&mut self, name: &str) {
        self.remove(name);
    }
}

impl HydrationGlobals for Map<String, Value> {
    fn get_global(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }

    fn remove_global(&mut self, name: &str) {
        self.remove(name);
    }
}

/// Loads the hydration payload found in `globals` into the session cache.
///
/// Returns the number of loaded entries. A missing global, or one that is
/// not a list, loads nothing.
pub fn load_api_cache<G>(session: &Session, globals: &mut G) -> Result<usize, SsrError>
where
    G: HydrationGlobals + ?Sized,
{
    let settings = session.settings();
    let var = settings.client_cache_var.as_str();
    let entries: Vec<DumpEntry> = match globals.get_global(var) {
        Some(value @ Value::Array(_)) => {
            serde_json::from_value(value.clone()).map_err(SsrError::Decode)?
        }
        _ => return Ok(0),
    };

    let loaded = entries.len();
    session.cache().load(entries);
    if settings.delete_after_loading {
        globals.remove_global(var);
    }
    Ok(loaded)
}
