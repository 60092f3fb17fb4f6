//! HTTP client collaborator.
//!
//! The engine never talks to the network itself. It hands every
//! [`RequestConfig`] to an [`HttpClient`] and only cares about the outcome:
//! a [`ResponseEnvelope`], a structured failure carrying one, or a failure
//! without any response.
//!
//! # Examples
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use ssrfetch_core::{ClientError, HttpClient, RequestConfig, ResponseEnvelope};
//!
//! struct Static;
//!
//! #[async_trait]
//! impl HttpClient for Static {
//!     async fn call(&self, config: &RequestConfig) -> Result<ResponseEnvelope, ClientError> {
//!         Ok(ResponseEnvelope::ok(serde_json::json!({ "url": config.url })))
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use thiserror::Error;

use crate::descriptor::{RequestConfig, RequestDescriptor};
use crate::error::FetchError;
use crate::response::{ApiResponse, ErrorEnvelope, ResponseEnvelope};

/// Failure reported by an [`HttpClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with an error response.
    #[error("Request failed with status code {}", .0.status)]
    Response(ResponseEnvelope),

    /// No response was received.
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

impl ClientError {
    /// Wraps any error as a transport failure.
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        ClientError::Transport(error.into())
    }
}

impl From<ClientError> for FetchError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::Response(response) => {
                FetchError::Http(ErrorEnvelope::from_response(response))
            }
            ClientError::Transport(error) => FetchError::Transport(Arc::from(error)),
        }
    }
}

/// Executes a single request.
///
/// This trait is the only seam between the engine and the network; any
/// timeout or retry belongs to the implementation.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Executes `config` and returns its response.
    async fn call(&self, config: &RequestConfig) -> Result<ResponseEnvelope, ClientError>;
}

#[async_trait]
impl<T> HttpClient for Arc<T>
where
    T: HttpClient + ?Sized,
{
    async fn call(&self, config: &RequestConfig) -> Result<ResponseEnvelope, ClientError> {
        self.as_ref().call(config).await
    }
}

#[async_trait]
impl HttpClient for Box<dyn HttpClient> {
    async fn call(&self, config: &RequestConfig) -> Result<ResponseEnvelope, ClientError> {
        self.as_ref().call(config).await
    }
}

/// Executes every request of `descriptor` concurrently.
///
/// A single descriptor yields [`ApiResponse::Single`], a composite one
/// [`ApiResponse::Multi`] in declaration order. The first failure fails the
/// whole dependency.
pub async fn execute<C>(client: &C, descriptor: &RequestDescriptor) -> Result<ApiResponse, FetchError>
where
    C: HttpClient + ?Sized,
{
    match descriptor {
        RequestDescriptor::Single(config) => Ok(ApiResponse::Single(client.call(config).await?)),
        RequestDescriptor::Multi(configs) => {
            let responses = try_join_all(configs.iter().map(|config| client.call(config))).await?;
            Ok(ApiResponse::Multi(responses))
        }
    }
}
