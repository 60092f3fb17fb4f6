//! Dependency keys.
//!
//! A [`DependencyKey`] is the canonical JSON serialization of a
//! [`RequestDescriptor`]. Object keys are sorted recursively before
//! serialization, so two descriptors built by different call sites with a
//! different field order still collide on the same key:
//!
//! ```
//! use serde_json::json;
//! use ssrfetch_core::{RequestConfig, RequestDescriptor};
//!
//! let a = RequestDescriptor::from(
//!     RequestConfig::new("/search").body(json!({"q": "rust", "page": 1})),
//! );
//! let b = RequestDescriptor::from(
//!     RequestConfig::new("/search").body(json!({"page": 1, "q": "rust"})),
//! );
//! assert_eq!(a.key().unwrap(), b.key().unwrap());
//! assert_eq!(
//!     a.key().unwrap().as_str(),
//!     r#"{"body":{"page":1,"q":"rust"},"url":"/search"}"#,
//! );
//! ```
//!
//! ## Performance
//!
//! [`DependencyKey`] uses `Arc<str>` internally, cloning a key only bumps a
//! reference count. Keys are cloned into the cache store, the in-flight table
//! and every request state.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::descriptor::RequestDescriptor;
use crate::error::KeyError;

/// Canonical identity of a data dependency.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DependencyKey {
    inner: Arc<str>,
}

impl DependencyKey {
    /// Derives the key of `descriptor`.
    pub fn derive(descriptor: &RequestDescriptor) -> Result<Self, KeyError> {
        let value = serde_json::to_value(descriptor).map_err(KeyError::Serialize)?;
        let canonical = canonicalize(value);
        let encoded = serde_json::to_string(&canonical).map_err(KeyError::Serialize)?;
        Ok(Self::from(encoded))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Whether this is the empty key carried by an idle request state.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for DependencyKey {
    fn default() -> Self {
        Self::from("")
    }
}

impl From<String> for DependencyKey {
    fn from(value: String) -> Self {
        Self {
            inner: Arc::from(value),
        }
    }
}

impl From<&str> for DependencyKey {
    fn from(value: &str) -> Self {
        Self {
            inner: Arc::from(value),
        }
    }
}

impl Borrow<str> for DependencyKey {
    fn borrow(&self) -> &str {
        &self.inner
    }
}

impl AsRef<str> for DependencyKey {
    fn as_ref(&self) -> &str {
        &self.inner
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl fmt::Debug for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DependencyKey({})", self.inner)
    }
}

impl Serialize for DependencyKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.inner)
    }
}

impl<'de> Deserialize<'de> for DependencyKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Rebuilds every object in `value` with its keys in sorted order.
///
/// Array order is significant and kept as is.
fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            let mut sorted = Map::with_capacity(entries.len());
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}
