#![warn(missing_docs)]
//! # ssrfetch-core
//!
//! Core types and traits for the ssrfetch request-state synchronization
//! engine.
//!
//! This crate holds the protocol-agnostic pieces that the engine
//! (`ssrfetch`), the storage backends (`ssrfetch-moka`) and the HTTP client
//! integrations (`ssrfetch-reqwest`) agree on:
//!
//! - **Describe** a data dependency ([`RequestDescriptor`], [`RequestConfig`])
//! - **Identify** it canonically ([`DependencyKey`])
//! - **Store** its settled outcome ([`CacheEntry`], [`CacheStore`])
//! - **Execute** it against an HTTP collaborator ([`HttpClient`], [`execute`])
//!
//! Everything stored in a [`CacheStore`] is plain serde data, because cache
//! contents cross the server/client boundary during hydration.

pub mod client;
pub mod descriptor;
pub mod entry;
pub mod error;
pub mod key;
pub mod response;
pub mod store;

pub use client::{ClientError, HttpClient, execute};
pub use descriptor::{Method, RequestConfig, RequestDescriptor};
pub use entry::CacheEntry;
pub use error::{FetchError, KeyError};
pub use key::DependencyKey;
pub use response::{ApiResponse, ErrorEnvelope, ResponseEnvelope};
pub use store::{CacheStore, DumpEntry};
