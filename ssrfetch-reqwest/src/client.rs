//! Request and response mapping.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method as HttpMethod, Url};
use serde_json::Value;
use ssrfetch_core::{ClientError, HttpClient, Method, RequestConfig, ResponseEnvelope};
use tracing::trace;

/// HTTP client executing dependencies with [`reqwest`].
#[derive(Debug, Clone, Default)]
pub struct ReqwestClient {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ReqwestClient {
    /// Creates a client with default `reqwest` settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a configured `reqwest` client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: None,
        }
    }

    /// Prefix for relative request urls.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn url(&self, config: &RequestConfig) -> Result<Url, ClientError> {
        let mut url = match (&self.base_url, Url::parse(&config.url)) {
            (_, Ok(url)) => url,
            (Some(base), Err(_)) => Url::parse(&format!(
                "{}/{}",
                base.trim_end_matches('/'),
                config.url.trim_start_matches('/')
            ))
            .map_err(ClientError::transport)?,
            (None, Err(error)) => return Err(ClientError::transport(error)),
        };

        if !config.params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (name, value) in &config.params {
                match value {
                    Value::Null => {}
                    Value::String(value) => {
                        query.append_pair(name, value);
                    }
                    Value::Array(values) => {
                        for value in values {
                            query.append_pair(name, &query_value(value));
                        }
                    }
                    other => {
                        query.append_pair(name, &query_value(other));
                    }
                }
            }
        }
        Ok(url)
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(value) => value.clone(),
        other => other.to_string(),
    }
}

fn method(method: Method) -> HttpMethod {
    match method {
        Method::Get => HttpMethod::GET,
        Method::Post => HttpMethod::POST,
        Method::Put => HttpMethod::PUT,
        Method::Patch => HttpMethod::PATCH,
        Method::Delete => HttpMethod::DELETE,
        Method::Head => HttpMethod::HEAD,
        Method::Options => HttpMethod::OPTIONS,
    }
}

fn headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

/// Decodes a body as JSON, falling back to text.
fn data(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn call(&self, config: &RequestConfig) -> Result<ResponseEnvelope, ClientError> {
        let url = self.url(config)?;
        let method = method(config.effective_method());
        trace!(%method, %url, "request");

        let mut request = self.client.request(method, url);
        for (name, value) in &config.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &config.body {
            let body = serde_json::to_vec(body).map_err(ClientError::transport)?;
            if !config
                .headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
            {
                request = request.header(CONTENT_TYPE, "application/json");
            }
            request = request.body(body);
        }

        let response = request.send().await.map_err(ClientError::transport)?;
        let status = response.status();
        let headers = headers(response.headers());
        let body = response.bytes().await.map_err(ClientError::transport)?;

        let envelope = ResponseEnvelope {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            data: data(&body),
        };
        if status.is_success() {
            Ok(envelope)
        } else {
            Err(ClientError::Response(envelope))
        }
    }
}
