//! Response and error envelopes.
//!
//! Envelopes are the storable form of what the HTTP collaborator returned.
//! They hold status, headers and the decoded body only. Transport handles
//! (the underlying request, connection or client configuration) are never
//! part of an envelope, so every envelope can be serialized into a
//! hydration payload as is.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A settled HTTP response stripped down to plain data.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// HTTP status code.
    pub status: u16,
    /// Reason phrase of the status.
    #[serde(default, rename = "statusText")]
    pub status_text: String,
    /// Response headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Decoded response body.
    #[serde(default)]
    pub data: Value,
}

impl ResponseEnvelope {
    /// Creates a `200 OK` envelope carrying `data`.
    pub fn ok(data: impl Into<Value>) -> Self {
        Self::with_status(200, data)
    }

    /// Creates an envelope with the given status and body.
    pub fn with_status(status: u16, data: impl Into<Value>) -> Self {
        Self {
            status,
            status_text: String::new(),
            headers: BTreeMap::new(),
            data: data.into(),
        }
    }

    /// Whether the status is in the `2xx` range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The response of a dependency: one envelope per request of the descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse {
    /// Response of a single-request descriptor.
    Single(ResponseEnvelope),
    /// Responses of a composite descriptor, in declaration order.
    Multi(Vec<ResponseEnvelope>),
}

impl ApiResponse {
    /// Projects the body data out of the response.
    ///
    /// A composite response projects to an array of the bodies.
    pub fn data(&self) -> Value {
        match self {
            ApiResponse::Single(response) => response.data.clone(),
            ApiResponse::Multi(responses) => {
                Value::Array(responses.iter().map(|r| r.data.clone()).collect())
            }
        }
    }
}

/// A structured request failure.
///
/// `response` is set when the failure is an HTTP-level error that carried a
/// response; such failures are cached like successes. A failure without a
/// response only ever reaches request state, never the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Human readable description.
    pub message: String,
    /// The error response, if the server produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseEnvelope>,
}

impl ErrorEnvelope {
    /// Creates a structured failure from an error response.
    pub fn from_response(response: ResponseEnvelope) -> Self {
        Self {
            message: format!("Request failed with status code {}", response.status),
            response: Some(response),
        }
    }

    /// Creates a failure that carries no response.
    pub fn without_response(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    /// Whether the failure carries usable response data.
    pub fn is_structured(&self) -> bool {
        self.response.as_ref().is_some_and(|r| !r.data.is_null())
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorEnvelope {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_projection() {
        let response = ApiResponse::Single(ResponseEnvelope::ok(json!({"foo": 1})));
        assert_eq!(response.data(), json!({"foo": 1}));
    }

    #[test]
    fn test_multi_projection_keeps_order() {
        let response = ApiResponse::Multi(vec![
            ResponseEnvelope::ok(json!(1)),
            ResponseEnvelope::ok(json!(2)),
        ]);
        assert_eq!(response.data(), json!([1, 2]));
    }

    #[test]
    fn test_error_structure() {
        let error = ErrorEnvelope::from_response(ResponseEnvelope::with_status(
            500,
            json!({"msg": "x"}),
        ));
        assert!(error.is_structured());
        assert_eq!(error.message, "Request failed with status code 500");
        assert!(!ErrorEnvelope::without_response("connection reset").is_structured());
    }
}
