//! Error types shared by the ssrfetch crates.

use std::sync::Arc;

use thiserror::Error;

use crate::response::ErrorEnvelope;

/// Error deriving or parsing a [`DependencyKey`](crate::DependencyKey).
#[derive(Debug, Error)]
pub enum KeyError {
    /// The descriptor could not be serialized.
    #[error("failed to serialize request descriptor: {0}")]
    Serialize(#[source] serde_json::Error),
    /// The key is not the serialization of a descriptor.
    #[error("dependency key is not a request descriptor: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Error produced while executing a dependency.
///
/// The split matters to every caller: [`FetchError::Http`] is a recoverable,
/// cacheable outcome, everything else aborts the current resolution step.
/// `FetchError` is `Clone` because one outcome is shared by every consumer
/// joined to the same in-flight request.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// HTTP-level failure that carried a response.
    #[error("{0}")]
    Http(ErrorEnvelope),

    /// Failure without a usable response (connection, protocol, decoding).
    #[error(transparent)]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// The session has no HTTP client configured.
    #[error("no HTTP client configured for this session")]
    NoClient,

    /// The request descriptor has no dependency key.
    #[error(transparent)]
    Key(Arc<KeyError>),
}

impl From<KeyError> for FetchError {
    fn from(error: KeyError) -> Self {
        FetchError::Key(Arc::new(error))
    }
}

impl FetchError {
    /// Wraps any error as a transport failure.
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        FetchError::Transport(Arc::new(error))
    }

    /// Returns the structured failure, if this is one.
    pub fn structured(&self) -> Option<&ErrorEnvelope> {
        match self {
            FetchError::Http(error) if error.is_structured() => Some(error),
            _ => None,
        }
    }

    /// Converts the error into an envelope suitable for request state.
    pub fn to_envelope(&self) -> ErrorEnvelope {
        match self {
            FetchError::Http(error) => error.clone(),
            other => ErrorEnvelope::without_response(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DependencyKey, RequestDescriptor};

    #[test]
    fn test_key_error_is_not_structured() {
        let error = RequestDescriptor::from_key(&DependencyKey::from("not json")).unwrap_err();
        let error = FetchError::from(error);
        assert!(matches!(error, FetchError::Key(_)));
        assert!(error.structured().is_none());
        assert!(error.to_envelope().response.is_none());
    }
}
