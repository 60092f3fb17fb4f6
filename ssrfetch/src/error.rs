//! Error types for the engine.

use ssrfetch_core::FetchError;
use thiserror::Error;

/// Error aborting a server render pass or a hydration load.
#[derive(Debug, Error)]
pub enum SsrError {
    /// A dependency failed without a structured response.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The cache dump could not be encoded into a hydration payload.
    #[error("failed to encode hydration payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// A hydration payload could not be decoded.
    #[error("malformed hydration payload: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Error loading settings from a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The YAML document is not valid settings.
    #[error("invalid YAML settings: {0}")]
    Yaml(String),

    /// The JSON document is not valid settings.
    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),
}
