//! Blocking REST client for a Confluence Cloud site.
//!
//! # Overview
//! `Client` resolves paths against `https://{site}.atlassian.net`, sends one
//! JSON request per call with HTTP Basic credentials, and checks the status
//! against a fixed per-verb expectation (200 for GET/POST/PUT, 204 for
//! DELETE). Unexpected statuses become an `ApiError` whose text combines the
//! request context with Confluence's error payload. `Client::url` builds
//! credential-free links for display.
//!
//! # Design
//! - Request building and status checking are pure; `transport` is the only
//!   module doing I/O.
//! - Credentials travel in an `Authorization` header added by the transport,
//!   never inside a URL.
//! - No retries, no pagination, no shared mutable state.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{ApiError, ApiErrorDetail, Error, ErrorData, ErrorResponse, Result};
pub use http::{HttpRequest, HttpResponse, Method};
pub use transport::REQUEST_TIMEOUT;
pub use types::{Content, ContentBody, Links, SpaceRef, Storage, Version};
