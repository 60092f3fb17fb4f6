//! [`HttpClient`](ssrfetch_core::HttpClient) implementation over [`reqwest`].
//!
//! ```rust,ignore
//! use ssrfetch::{CustomSettings, Session};
//! use ssrfetch_reqwest::ReqwestClient;
//!
//! let client = ReqwestClient::new().base_url("https://api.example.com");
//! let session = Session::configure(CustomSettings::default().client(client));
//! ```
//!
//! Responses outside the `2xx` range are structured failures carrying the
//! whole response. Connection, timeout and body errors are transport
//! failures.

mod client;

pub use client::ReqwestClient;

/// Re-export of the underlying client type for configuration.
pub use reqwest::Client;
