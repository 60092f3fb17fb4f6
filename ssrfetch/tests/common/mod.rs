#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use ssrfetch::{ClientError, CustomSettings, HttpClient, RequestConfig, ResponseEnvelope, Session};

#[derive(Debug, Clone)]
pub enum Route {
    Ok(Value),
    Status(u16, Value),
    Down,
}

/// HTTP client answering from a route table and counting calls per url.
#[derive(Clone, Debug, Default)]
pub struct MockClient {
    routes: Arc<Mutex<HashMap<String, Route>>>,
    calls: Arc<Mutex<Vec<String>>>,
    total: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps before answering, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn route(self, url: &str, route: Route) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), route);
        self
    }

    pub fn ok(self, url: &str, data: Value) -> Self {
        self.route(url, Route::Ok(data))
    }

    pub fn call_count(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn call(&self, config: &RequestConfig) -> Result<ResponseEnvelope, ClientError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(config.url.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let route = self.routes.lock().unwrap().get(&config.url).cloned();
        match route {
            Some(Route::Ok(data)) => Ok(ResponseEnvelope::ok(data)),
            Some(Route::Status(status, data)) => {
                Err(ClientError::Response(ResponseEnvelope::with_status(status, data)))
            }
            Some(Route::Down) => Err(ClientError::transport(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            None => Err(ClientError::Response(ResponseEnvelope::with_status(
                404,
                serde_json::json!({ "url": config.url }),
            ))),
        }
    }
}

pub fn client_session(client: &MockClient) -> Session {
    Session::builder()
        .settings(CustomSettings::default().client(client.clone()))
        .ssr(false)
        .build()
}

pub fn server_session(client: &MockClient, settings: CustomSettings) -> Session {
    Session::builder()
        .settings(settings.client(client.clone()))
        .ssr(true)
        .build()
}
