//! Request descriptors.
//!
//! A [`RequestDescriptor`] is what a consumer declares as its data
//! dependency: either one [`RequestConfig`] or an ordered list of them. A
//! list is a single composite dependency: it is keyed, fetched, cached and
//! settled as one unit.
//!
//! ```
//! use ssrfetch_core::{Method, RequestConfig, RequestDescriptor};
//!
//! let single = RequestDescriptor::from("/users");
//! assert!(single.is_valid());
//!
//! let multi = RequestDescriptor::from(vec![
//!     RequestConfig::new("/users").param("page", 2),
//!     RequestConfig::new("/teams").method(Method::Post),
//! ]);
//! assert_eq!(multi.configs().len(), 2);
//!
//! // A descriptor without a url never reaches the network.
//! assert!(!RequestDescriptor::from("").is_valid());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::KeyError;
use crate::key::DependencyKey;

/// HTTP method of a [`RequestConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[allow(missing_docs)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Returns the canonical upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single HTTP request description.
///
/// Optional parts are omitted from the serialized form when unset, so
/// `RequestConfig::new("/a")` serializes to `{"url":"/a"}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RequestConfig {
    /// HTTP method, `GET` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    /// Target url, absolute or relative to the client's base url.
    #[serde(default)]
    pub url: String,
    /// Query string parameters.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    /// JSON request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    /// Request headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl RequestConfig {
    /// Creates a config for `url` with every other part unset.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the HTTP method.
    pub fn method(self, method: Method) -> Self {
        Self {
            method: Some(method),
            ..self
        }
    }

    /// Adds a query parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds a request header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the JSON request body.
    pub fn body(self, body: impl Into<Value>) -> Self {
        Self {
            body: Some(body.into()),
            ..self
        }
    }

    /// Returns the effective method.
    pub fn effective_method(&self) -> Method {
        self.method.unwrap_or_default()
    }
}

/// A data dependency: one request or an ordered list of requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestDescriptor {
    /// A single request.
    Single(RequestConfig),
    /// A composite dependency made of several requests.
    Multi(Vec<RequestConfig>),
}

impl RequestDescriptor {
    /// Whether this descriptor may be fetched at all.
    ///
    /// A single config needs a non-empty url. A list must be non-empty and
    /// every element needs a non-empty url.
    pub fn is_valid(&self) -> bool {
        match self {
            RequestDescriptor::Single(config) => !config.url.is_empty(),
            RequestDescriptor::Multi(configs) => {
                !configs.is_empty() && configs.iter().all(|config| !config.url.is_empty())
            }
        }
    }

    /// Whether this is a composite dependency.
    pub fn is_multi(&self) -> bool {
        matches!(self, RequestDescriptor::Multi(_))
    }

    /// Returns the underlying configs in declaration order.
    pub fn configs(&self) -> &[RequestConfig] {
        match self {
            RequestDescriptor::Single(config) => std::slice::from_ref(config),
            RequestDescriptor::Multi(configs) => configs,
        }
    }

    /// Derives the dependency key of this descriptor.
    pub fn key(&self) -> Result<DependencyKey, KeyError> {
        DependencyKey::derive(self)
    }

    /// Reconstructs a descriptor from its dependency key.
    pub fn from_key(key: &DependencyKey) -> Result<Self, KeyError> {
        serde_json::from_str(key.as_str()).map_err(KeyError::Parse)
    }
}

impl From<RequestConfig> for RequestDescriptor {
    fn from(config: RequestConfig) -> Self {
        RequestDescriptor::Single(config)
    }
}

impl From<Vec<RequestConfig>> for RequestDescriptor {
    fn from(configs: Vec<RequestConfig>) -> Self {
        RequestDescriptor::Multi(configs)
    }
}

impl From<&str> for RequestDescriptor {
    fn from(url: &str) -> Self {
        RequestDescriptor::Single(RequestConfig::new(url))
    }
}

impl From<String> for RequestDescriptor {
    fn from(url: String) -> Self {
        RequestDescriptor::Single(RequestConfig::new(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validity() {
        assert!(RequestDescriptor::from("/a").is_valid());
        assert!(!RequestDescriptor::from(RequestConfig::default()).is_valid());
        assert!(!RequestDescriptor::Multi(vec![]).is_valid());
        assert!(
            !RequestDescriptor::from(vec![RequestConfig::new("/a"), RequestConfig::new("")])
                .is_valid()
        );
        assert!(
            RequestDescriptor::from(vec![RequestConfig::new("/a"), RequestConfig::new("/b")])
                .is_valid()
        );
    }

    #[test]
    fn test_minimal_serialization() {
        let value = serde_json::to_value(RequestDescriptor::from("/a")).unwrap();
        assert_eq!(value, json!({"url": "/a"}));
    }

    #[test]
    fn test_untagged_deserialization() {
        let single: RequestDescriptor = serde_json::from_value(json!({"url": "/a"})).unwrap();
        assert!(!single.is_multi());

        let multi: RequestDescriptor =
            serde_json::from_value(json!([{"url": "/a"}, {"url": "/b", "method": "POST"}]))
                .unwrap();
        assert!(multi.is_multi());
        assert_eq!(multi.configs()[1].effective_method(), Method::Post);
    }
}
