//! Plain-data HTTP types and the per-verb success table.
//!
//! # Design
//! The client builds an `HttpRequest` and parses an `HttpResponse` without
//! touching the network; only `transport` performs I/O between the two. This
//! keeps URL resolution, header rules and status classification testable
//! without a server.

use std::fmt;

use url::Url;

/// HTTP verbs the Confluence client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Status code considered successful for each verb.
const EXPECTED_STATUS: [(Method, u16); 4] = [
    (Method::Post, 200),
    (Method::Put, 200),
    (Method::Get, 200),
    (Method::Delete, 204),
];

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// The single status code that counts as success for this verb.
    pub fn expected_status(self) -> u16 {
        EXPECTED_STATUS
            .iter()
            .find(|(method, _)| *method == self)
            .map(|(_, status)| *status)
            .unwrap_or_default()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request described as plain data.
///
/// `url` is already resolved against the site base and never carries
/// credentials; the transport attaches those when it sends the request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// A fully read response. The body is kept as raw bytes; error pages are
/// not guaranteed to be UTF-8.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// `"404 Not Found"` style status line.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            self.status.to_string()
        } else {
            format!("{} {}", self.status, self.reason)
        }
    }
}
