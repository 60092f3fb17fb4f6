//! Cache entries.

use serde::{Deserialize, Serialize};

use crate::response::{ApiResponse, ErrorEnvelope};

/// The settled outcome of a dependency as kept in a [`CacheStore`].
///
/// Exactly one of `response` and `error` is set once the dependency has
/// settled. An entry with neither set means the outcome is not known yet and
/// is treated like a cache miss.
///
/// [`CacheStore`]: crate::CacheStore
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Successful response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ApiResponse>,
    /// Structured failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl CacheEntry {
    /// Entry for a successful response.
    pub fn success(response: ApiResponse) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    /// Entry for a structured failure.
    pub fn failure(error: ErrorEnvelope) -> Self {
        Self {
            response: None,
            error: Some(error),
        }
    }

    /// Whether the entry holds an outcome.
    pub fn is_settled(&self) -> bool {
        self.response.is_some() || self.error.is_some()
    }
}

impl From<Result<ApiResponse, ErrorEnvelope>> for CacheEntry {
    fn from(result: Result<ApiResponse, ErrorEnvelope>) -> Self {
        match result {
            Ok(response) => Self::success(response),
            Err(error) => Self::failure(error),
        }
    }
}
